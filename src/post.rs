//! Defines the [`Post`] listing record and the [`Registry`] that collects
//! posts during a build and hands them to the listing template newest-first.

/// One entry in the listing page, derived from a rendered Markdown document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Post {
    /// Milliseconds since the Unix epoch. Only used for ordering.
    pub timestamp: i64,

    /// The human-readable date shown in the listing (e.g. `Mon Apr 16 2021`).
    pub display_date: String,

    /// The rendered page's path relative to the output root, using `/`
    /// separators (e.g. `notes/first.html`).
    pub link: String,

    /// The post title. May be empty.
    pub title: String,
}

/// Collects [`Post`]s as documents are rendered. Posts that share a
/// timestamp are all kept.
#[derive(Debug, Default)]
pub struct Registry {
    posts: Vec<Post>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    pub fn insert(&mut self, post: Post) {
        self.posts.push(post);
    }

    /// The number of posts the listing will hold.
    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Consumes the registry and returns its posts ordered newest first.
    /// The sort is stable, so posts with equal timestamps keep their
    /// insertion order.
    pub fn finalize(self) -> Vec<Post> {
        let mut posts = self.posts;
        posts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        posts
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn post(timestamp: i64, title: &str) -> Post {
        Post {
            timestamp,
            display_date: String::new(),
            link: format!("{}.html", title),
            title: title.to_owned(),
        }
    }

    fn titles(posts: &[Post]) -> Vec<&str> {
        posts.iter().map(|p| p.title.as_str()).collect()
    }

    #[test]
    fn test_finalize_newest_first() {
        let mut registry = Registry::new();
        registry.insert(post(5, "five"));
        registry.insert(post(1, "one"));
        registry.insert(post(3, "three"));
        assert_eq!(3, registry.len());

        let posts = registry.finalize();
        assert_eq!(
            vec![5, 3, 1],
            posts.iter().map(|p| p.timestamp).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_finalize_keeps_colliding_timestamps() {
        let mut registry = Registry::new();
        registry.insert(post(7, "a"));
        registry.insert(post(9, "newest"));
        registry.insert(post(7, "b"));

        assert_eq!(vec!["newest", "a", "b"], titles(&registry.finalize()));
    }

    #[test]
    fn test_finalize_empty() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        assert!(registry.finalize().is_empty());
    }
}
