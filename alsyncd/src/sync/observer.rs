use std::sync::Mutex;

/// Logging capability injected into the engine; scoped to one
/// reconciliation run instead of living in a process-global logger.
pub trait SyncObserver: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Stderr reporter used by the binary.
pub struct StderrObserver;

impl SyncObserver for StderrObserver {
    fn info(&self, message: &str) {
        eprintln!("[alsyncd] {message}");
    }

    fn warn(&self, message: &str) {
        eprintln!("[alsyncd] warning: {message}");
    }

    fn error(&self, message: &str) {
        eprintln!("[alsyncd] error: {message}");
    }
}

/// Captures messages in memory; test helper.
#[derive(Default)]
pub struct RecordingObserver {
    entries: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().expect("observer lock poisoned").clone()
    }

    fn push(&self, level: &str, message: &str) {
        self.entries
            .lock()
            .expect("observer lock poisoned")
            .push(format!("{level}: {message}"));
    }
}

impl SyncObserver for RecordingObserver {
    fn info(&self, message: &str) {
        self.push("info", message);
    }

    fn warn(&self, message: &str) {
        self.push("warn", message);
    }

    fn error(&self, message: &str) {
        self.push("error", message);
    }
}
