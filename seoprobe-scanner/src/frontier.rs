use std::collections::{HashSet, VecDeque};

/// Traversal state of one crawl job.
///
/// `known` holds every URL ever queued, so it always equals
/// visited + pending + the URL currently being processed.
#[derive(Debug, Default)]
pub struct Frontier {
    pending: VecDeque<String>,
    known: HashSet<String>,
    visited: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(seed: impl Into<String>) -> Self {
        let mut frontier = Self::new();
        frontier.push(seed.into());
        frontier
    }

    /// Queue a URL unless it is already known. Returns whether it was added.
    pub fn push(&mut self, url: String) -> bool {
        if !self.known.insert(url.clone()) {
            return false;
        }
        self.pending.push_back(url);
        true
    }

    pub fn pop(&mut self) -> Option<String> {
        self.pending.pop_front()
    }

    pub fn mark_visited(&mut self, url: &str) {
        self.known.insert(url.to_string());
        self.visited.insert(url.to_string());
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    /// Visited or queued.
    pub fn contains(&self, url: &str) -> bool {
        self.known.contains(url)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn visited_len(&self) -> usize {
        self.visited.len()
    }

    pub fn known_len(&self) -> usize {
        self.known.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_is_first_out() {
        let mut frontier = Frontier::with_seed("https://site.com/");
        frontier.push("https://site.com/a".to_string());
        assert_eq!(frontier.pop().as_deref(), Some("https://site.com/"));
        assert_eq!(frontier.pop().as_deref(), Some("https://site.com/a"));
        assert!(frontier.pop().is_none());
    }

    #[test]
    fn test_push_rejects_known_urls() {
        let mut frontier = Frontier::with_seed("https://site.com/");
        assert!(!frontier.push("https://site.com/".to_string()));

        let url = frontier.pop().unwrap();
        // still known while in flight
        assert!(!frontier.push(url.clone()));
        frontier.mark_visited(&url);
        assert!(!frontier.push(url));
        assert!(frontier.is_empty());
    }

    #[test]
    fn test_counts_track_known_urls() {
        let mut frontier = Frontier::with_seed("https://site.com/");
        let seed = frontier.pop().unwrap();
        frontier.push("https://site.com/a".to_string());
        frontier.push("https://site.com/b".to_string());
        frontier.mark_visited(&seed);

        assert_eq!(frontier.visited_len(), 1);
        assert_eq!(frontier.known_len(), 3);
        assert!(frontier.is_visited(&seed));
        assert!(frontier.contains("https://site.com/b"));
    }
}
