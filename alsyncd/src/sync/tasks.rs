use super::observer::SyncObserver;

/// Delimiter artifact the service embeds in copy-task descriptor names.
const NAME_DELIMITER: &str = "](";

/// Snapshot of the copy tasks the remote service has not finished yet.
/// Loaded once per pass and consulted read-only during traversal.
#[derive(Default)]
pub struct TaskDeduplicator {
    descriptors: Vec<String>,
}

impl TaskDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<I>(&mut self, raw_names: I, observer: &dyn SyncObserver)
    where
        I: IntoIterator<Item = String>,
    {
        self.descriptors = raw_names
            .into_iter()
            .filter_map(|name| {
                let stripped = name.replace(NAME_DELIMITER, "");
                if stripped.is_empty() {
                    observer.warn(&format!("skipping malformed task descriptor: {name:?}"));
                    None
                } else {
                    Some(stripped)
                }
            })
            .collect();
    }

    pub fn clear(&mut self) {
        self.descriptors.clear();
    }

    /// Approximate membership test: one descriptor must contain the source
    /// directory, the destination directory, and the full source path as
    /// substrings. Descriptors are opaque strings, so a descriptor for an
    /// unrelated pair can match by accident.
    pub fn is_in_flight(&self, src_dir: &str, dst_dir: &str, src_path: &str) -> bool {
        self.descriptors.iter().any(|descriptor| {
            descriptor.contains(src_dir)
                && descriptor.contains(dst_dir)
                && descriptor.contains(src_path)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::observer::RecordingObserver;

    fn loaded(raw: &[&str]) -> TaskDeduplicator {
        let mut tasks = TaskDeduplicator::new();
        tasks.load(
            raw.iter().map(|s| s.to_string()),
            &RecordingObserver::default(),
        );
        tasks
    }

    #[test]
    fn strips_the_delimiter_artifact() {
        let tasks = loaded(&["copy [/src](/A.txt) to [/dst]("]);
        assert!(tasks.is_in_flight("/src", "/dst", "/src/A.txt"));
    }

    #[test]
    fn requires_all_three_fragments() {
        let tasks = loaded(&["copy [/src](/A.txt) to [/dst]("]);
        assert!(!tasks.is_in_flight("/src", "/elsewhere", "/src/A.txt"));
        assert!(!tasks.is_in_flight("/src", "/dst", "/src/B.txt"));
    }

    #[test]
    fn substring_matching_can_false_positive_across_pairs() {
        // A descriptor for /data/src -> /data/dst also contains "/src",
        // "/dst" and "/src/A.txt" as substrings. Known approximation.
        let tasks = loaded(&["copy [/data/src](/A.txt) to [/data/dst]("]);
        assert!(tasks.is_in_flight("/src", "/dst", "/src/A.txt"));
    }

    #[test]
    fn malformed_descriptors_are_skipped_with_a_warning() {
        let observer = RecordingObserver::default();
        let mut tasks = TaskDeduplicator::new();
        tasks.load(vec!["](".to_string()], &observer);
        assert!(!tasks.is_in_flight("", "", ""));
        assert!(observer.entries().iter().any(|e| e.starts_with("warn")));
    }
}
