/// Joins a remote directory and an entry name, collapsing duplicate
/// separators. Remote paths are POSIX-like ("/photos/2024").
pub fn join_path(dir: &str, name: &str) -> String {
    format!("{dir}/{name}").replace("//", "/")
}

/// Splits a remote path into (parent directory, leaf name). Returns `None`
/// for the filesystem root or a path without a separator.
pub fn split_parent(path: &str) -> Option<(String, String)> {
    let (dir, name) = path.rsplit_once('/')?;
    if name.is_empty() {
        return None;
    }
    let dir = if dir.is_empty() { "/" } else { dir };
    Some((dir.to_string(), name.to_string()))
}
