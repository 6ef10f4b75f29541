// 💬 Quote - the single record kept by the store
//
// Identity is the integer `id`; `text` and `category` are values that a
// reconciliation pass may overwrite in place.

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

// ============================================================================
// QUOTE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Unique within a store, assigned as max(existing) + 1
    pub id: u64,

    /// The quotation body (never empty once stored)
    pub text: String,

    /// Free-form label, compared case-sensitively
    pub category: String,
}

impl Quote {
    pub fn new(id: u64, text: impl Into<String>, category: impl Into<String>) -> Self {
        Quote {
            id,
            text: text.into(),
            category: category.into(),
        }
    }

    /// Display form used by the CLI and TUI: "text" — category
    pub fn display_line(&self) -> String {
        format!("\"{}\" — {}", self.text, self.category)
    }
}

// ============================================================================
// NEW QUOTE (no id yet)
// ============================================================================

/// A quote as typed by a user or read from an import file.
///
/// Any `id` present in imported JSON is ignored; the store assigns one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuote {
    pub text: String,
    pub category: String,
}

impl NewQuote {
    pub fn new(text: impl Into<String>, category: impl Into<String>) -> Self {
        NewQuote {
            text: text.into(),
            category: category.into(),
        }
    }

    /// Trim both fields and reject empties.
    pub fn validated(&self) -> Result<NewQuote, ValidationError> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyField { field: "text" });
        }

        let category = self.category.trim();
        if category.is_empty() {
            return Err(ValidationError::EmptyField { field: "category" });
        }

        Ok(NewQuote::new(text, category))
    }

    pub fn with_id(self, id: u64) -> Quote {
        Quote {
            id,
            text: self.text,
            category: self.category,
        }
    }
}

// ============================================================================
// SEED SET
// ============================================================================

/// Built-in quotes used when nothing has been persisted yet.
pub fn seed_quotes() -> Vec<Quote> {
    vec![
        Quote::new(
            1,
            "The best way to get started is to quit talking and begin doing.",
            "Motivation",
        ),
        Quote::new(
            2,
            "Don't let yesterday take up too much of today.",
            "Inspiration",
        ),
        Quote::new(
            3,
            "Success is not final, failure is not fatal: it is the courage to continue that counts.",
            "Wisdom",
        ),
        Quote::new(4, "Believe you can and you're halfway there.", "Motivation"),
    ]
}

/// Next id under the "max + 1, or 1 when empty" policy.
pub fn next_id(quotes: &[Quote]) -> u64 {
    quotes.iter().map(|q| q.id).max().map_or(1, |max| max + 1)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_set_has_four_sequential_ids() {
        let seed = seed_quotes();

        assert_eq!(seed.len(), 4);
        let ids: Vec<u64> = seed.iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert!(seed.iter().all(|q| !q.text.is_empty() && !q.category.is_empty()));
    }

    #[test]
    fn test_next_id() {
        assert_eq!(next_id(&[]), 1);
        assert_eq!(next_id(&seed_quotes()), 5);

        // Gaps are not reused
        let gapped = vec![Quote::new(3, "a", "x"), Quote::new(17, "b", "y")];
        assert_eq!(next_id(&gapped), 18);
    }

    #[test]
    fn test_new_quote_validation_trims() {
        let input = NewQuote::new("  Hello  ", "\tGreeting ");
        let valid = input.validated().unwrap();

        assert_eq!(valid.text, "Hello");
        assert_eq!(valid.category, "Greeting");
    }

    #[test]
    fn test_new_quote_validation_rejects_blank_fields() {
        assert_eq!(
            NewQuote::new("   ", "X").validated(),
            Err(ValidationError::EmptyField { field: "text" })
        );
        assert_eq!(
            NewQuote::new("X", "").validated(),
            Err(ValidationError::EmptyField { field: "category" })
        );
    }

    #[test]
    fn test_import_shape_ignores_id() {
        let parsed: NewQuote =
            serde_json::from_str(r#"{"id": 99, "text": "A", "category": "B"}"#).unwrap();
        assert_eq!(parsed, NewQuote::new("A", "B"));
    }

    #[test]
    fn test_display_line() {
        let quote = Quote::new(1, "Hello", "Greeting");
        assert_eq!(quote.display_line(), "\"Hello\" — Greeting");
    }
}
