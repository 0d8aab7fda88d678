//! IMAP command tag generator.
//!
//! Tags match commands with their completions.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::Tag;

/// Issues zero-padded decimal tags: `00001`, `00002`, ...
///
/// Numbers wider than five digits are printed in full.
#[derive(Debug, Default)]
pub struct TagGenerator {
    counter: AtomicU64,
}

impl TagGenerator {
    /// Creates a generator whose first tag is `00001`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }

    /// Generates the next tag.
    #[must_use]
    pub fn next(&self) -> Tag {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        Tag::new(format!("{n:05}"))
    }

    /// Number of tags issued so far.
    #[must_use]
    pub fn issued(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }

    /// Restarts numbering at `00001`.
    pub fn reset(&self) {
        self.counter.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn starts_at_one() {
        let generator = TagGenerator::new();
        assert_eq!(generator.next().as_str(), "00001");
        assert_eq!(generator.next().as_str(), "00002");
        assert_eq!(generator.issued(), 2);
    }

    #[test]
    fn reset_restarts_numbering() {
        let generator = TagGenerator::new();
        let _ = generator.next();
        let _ = generator.next();
        generator.reset();
        assert_eq!(generator.next().as_str(), "00001");
    }

    #[test]
    fn wide_numbers_are_not_truncated() {
        let generator = TagGenerator::new();
        generator.counter.store(99999, Ordering::Relaxed);
        assert_eq!(generator.next().as_str(), "100000");
    }

    proptest! {
        #[test]
        fn tags_are_one_to_n(n in 1usize..500) {
            let generator = TagGenerator::new();
            let tags: Vec<u64> = (0..n)
                .map(|_| generator.next().as_str().parse().unwrap())
                .collect();
            let expected: Vec<u64> = (1..=n as u64).collect();
            prop_assert_eq!(tags, expected);
        }
    }
}
