use regex::Regex;

/// Path exclusion plus file-name allow list. Exclusion prunes whole
/// subtrees; the allow list is a pass filter for file names (a file must
/// match at least one pattern, and no patterns means everything passes).
pub struct ExclusionFilter {
    exclude: Vec<String>,
    allow: Vec<Regex>,
}

impl ExclusionFilter {
    pub fn new(exclude: Vec<String>, allow: Vec<Regex>) -> Self {
        let exclude = exclude
            .into_iter()
            .map(|entry| entry.trim().trim_end_matches('/').to_string())
            .filter(|entry| !entry.is_empty())
            .collect();
        Self { exclude, allow }
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude
            .iter()
            .any(|entry| path == entry || path.starts_with(&format!("{entry}/")))
    }

    pub fn allows_name(&self, name: &str) -> bool {
        if self.allow.is_empty() {
            return true;
        }
        self.allow.iter().any(|pattern| pattern.is_match(name))
    }
}
