use std::collections::HashSet;

/// Destination names with no source counterpart. An empty source name set
/// means the whole source branch is gone, so everything in the destination
/// is extra.
pub fn extra_names<'a, I>(source_names: &HashSet<String>, destination_names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    destination_names
        .into_iter()
        .filter(|name| source_names.is_empty() || !source_names.contains(*name))
        .map(|name| name.to_string())
        .collect()
}

/// Quarantine directory for a destination directory: the longest storage
/// mount that prefixes it gains a `trash` sibling segment, keeping the
/// remainder of the path. `None` when no mount covers the directory.
pub fn quarantine_dir(dst_dir: &str, mounts: &[String]) -> Option<String> {
    mounts
        .iter()
        .filter(|mount| !mount.is_empty() && dst_dir.starts_with(mount.as_str()))
        .max_by_key(|mount| mount.len())
        .map(|mount| {
            let remainder = &dst_dir[mount.len()..];
            format!("{}/trash{remainder}", mount.trim_end_matches('/'))
        })
}
