/// Adds `https://` when the input has no http(s) scheme. Blank input is `None`.
pub fn normalize_url(input: &str) -> Option<String> {
    let url = input.trim();
    if url.is_empty() {
        return None;
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        Some(url.to_string())
    } else {
        Some(format!("https://{}", url))
    }
}

/// Back/forward history for the address bar.
#[derive(Debug, Default)]
pub struct Navigator {
    entries: Vec<String>,
    cursor: Option<usize>,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Visits `url`, dropping any forward history. Returns the URL to open.
    pub fn go(&mut self, input: &str) -> Option<String> {
        let url = normalize_url(input)?;
        let keep = self.cursor.map_or(0, |c| c + 1);
        self.entries.truncate(keep);
        if self.entries.last() != Some(&url) {
            self.entries.push(url.clone());
        }
        self.cursor = Some(self.entries.len() - 1);
        Some(url)
    }

    pub fn back(&mut self) -> Option<String> {
        let cursor = self.cursor?.checked_sub(1)?;
        self.cursor = Some(cursor);
        self.current().map(str::to_string)
    }

    pub fn forward(&mut self) -> Option<String> {
        let cursor = self.cursor? + 1;
        if cursor >= self.entries.len() {
            return None;
        }
        self.cursor = Some(cursor);
        self.current().map(str::to_string)
    }

    pub fn current(&self) -> Option<&str> {
        self.cursor.and_then(|c| self.entries.get(c)).map(String::as_str)
    }

    pub fn can_go_back(&self) -> bool {
        self.cursor.is_some_and(|c| c > 0)
    }

    pub fn can_go_forward(&self) -> bool {
        self.cursor.is_some_and(|c| c + 1 < self.entries.len())
    }

    /// Visited URLs, oldest first.
    pub fn history(&self) -> &[String] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_scheme() {
        assert_eq!(normalize_url("  "), None);
        assert_eq!(normalize_url("example.com").as_deref(), Some("https://example.com"));
        assert_eq!(normalize_url(" http://a.b ").as_deref(), Some("http://a.b"));
        assert_eq!(normalize_url("https://a.b/c?d").as_deref(), Some("https://a.b/c?d"));
    }

    #[test]
    fn back_and_forward_walk_history() {
        let mut nav = Navigator::new();
        assert_eq!(nav.back(), None);
        assert_eq!(nav.forward(), None);

        nav.go("one.test");
        nav.go("two.test");
        nav.go("three.test");
        assert!(nav.can_go_back());
        assert!(!nav.can_go_forward());

        assert_eq!(nav.back().as_deref(), Some("https://two.test"));
        assert_eq!(nav.back().as_deref(), Some("https://one.test"));
        assert_eq!(nav.back(), None);
        assert_eq!(nav.current(), Some("https://one.test"));

        assert_eq!(nav.forward().as_deref(), Some("https://two.test"));
        assert!(nav.can_go_forward());
    }

    #[test]
    fn new_visit_drops_forward_entries() {
        let mut nav = Navigator::new();
        nav.go("a.test");
        nav.go("b.test");
        nav.back();
        nav.go("c.test");

        assert_eq!(nav.history(), ["https://a.test", "https://c.test"]);
        assert!(!nav.can_go_forward());
    }

    #[test]
    fn repeated_visit_is_not_duplicated() {
        let mut nav = Navigator::new();
        nav.go("a.test");
        assert_eq!(nav.go("https://a.test").as_deref(), Some("https://a.test"));
        assert_eq!(nav.history().len(), 1);
        assert_eq!(nav.go(""), None);
    }
}
