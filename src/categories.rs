// 🏷️ Category Index - presentable categories and filtered views of the store
//
// Stateless projection: recomputed on every call, never cached, so quotes
// added locally or by a sync show up immediately.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

use crate::quote::Quote;
use crate::store::QuoteStore;

/// Pseudo-category that selects every quote
pub const ALL_CATEGORIES: &str = "all";

pub struct CategoryIndex;

impl CategoryIndex {
    /// `["all"]` followed by each distinct category in first-seen order.
    pub fn categories(store: &QuoteStore) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut categories = vec![ALL_CATEGORIES.to_string()];

        for quote in store.list() {
            if seen.insert(quote.category.as_str()) {
                categories.push(quote.category.clone());
            }
        }

        categories
    }

    /// Quotes whose category equals `category` exactly; everything for "all".
    pub fn filter<'a>(store: &'a QuoteStore, category: &str) -> Vec<&'a Quote> {
        if category == ALL_CATEGORIES {
            return store.list().iter().collect();
        }

        store
            .list()
            .iter()
            .filter(|q| q.category == category)
            .collect()
    }

    /// Uniformly chosen quote from the filtered view, `None` if it is empty.
    pub fn random<'a, R: Rng + ?Sized>(
        store: &'a QuoteStore,
        category: &str,
        rng: &mut R,
    ) -> Option<&'a Quote> {
        Self::filter(store, category).choose(rng).copied()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryGateway;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn store_with(quotes: &[(&str, &str)]) -> QuoteStore {
        let mut store = QuoteStore::empty(Box::new(MemoryGateway::new()));
        for (text, category) in quotes {
            store.add(text, category).unwrap();
        }
        store
    }

    #[test]
    fn test_categories_start_with_all_in_first_seen_order() {
        let store = QuoteStore::in_memory();

        assert_eq!(
            CategoryIndex::categories(&store),
            vec!["all", "Motivation", "Inspiration", "Wisdom"]
        );
    }

    #[test]
    fn test_categories_of_empty_store() {
        let store = store_with(&[]);
        assert_eq!(CategoryIndex::categories(&store), vec!["all"]);
    }

    #[test]
    fn test_categories_are_case_sensitive_and_not_cached() {
        let mut store = store_with(&[("a", "Tech"), ("b", "tech"), ("c", "Tech")]);
        assert_eq!(CategoryIndex::categories(&store), vec!["all", "Tech", "tech"]);

        store.add("d", "Life").unwrap();
        assert_eq!(
            CategoryIndex::categories(&store),
            vec!["all", "Tech", "tech", "Life"],
            "New category visible on the next call"
        );
    }

    #[test]
    fn test_filter_all_returns_full_list() {
        let store = QuoteStore::in_memory();
        let all: Vec<Quote> = CategoryIndex::filter(&store, ALL_CATEGORIES)
            .into_iter()
            .cloned()
            .collect();

        assert_eq!(all, store.list());
    }

    #[test]
    fn test_filter_exact_match_only() {
        let store = store_with(&[("a", "Tech"), ("b", "tech"), ("c", "Tech"), ("d", "Tech ")]);

        let ids: Vec<u64> = CategoryIndex::filter(&store, "Tech")
            .iter()
            .map(|q| q.id)
            .collect();

        // "Tech " was trimmed on add, so it matches too
        assert_eq!(ids, vec![1, 3, 4]);
        assert!(CategoryIndex::filter(&store, "Nope").is_empty());
    }

    #[test]
    fn test_random_stays_inside_filter() {
        let store = QuoteStore::in_memory();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            let quote = CategoryIndex::random(&store, "Motivation", &mut rng).unwrap();
            assert_eq!(quote.category, "Motivation");
        }
    }

    #[test]
    fn test_random_on_empty_category_is_none() {
        let store = QuoteStore::in_memory();
        let mut rng = StdRng::seed_from_u64(7);

        assert!(CategoryIndex::random(&store, "Server", &mut rng).is_none());
    }
}
