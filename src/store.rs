// 📚 Quote Store - the authoritative in-memory list of quotes
//
// Owns the id policy (max + 1, or 1 when empty) and is the only place the
// list is mutated. Every mutating call serializes the whole list through the
// persistence gateway; gateway failures are logged and the store keeps
// working in memory.

use log::{debug, info, warn};

use crate::errors::ValidationError;
use crate::persistence::{MemoryGateway, PersistenceGateway};
use crate::quote::{next_id, seed_quotes, NewQuote, Quote};

pub struct QuoteStore {
    quotes: Vec<Quote>,
    gateway: Box<dyn PersistenceGateway>,
}

impl QuoteStore {
    /// Load persisted quotes, falling back to the seed set on first run.
    pub fn initialize(gateway: Box<dyn PersistenceGateway>) -> Self {
        let quotes = match gateway.load() {
            Some(quotes) => {
                debug!("Loaded {} persisted quotes", quotes.len());
                quotes
            }
            None => {
                info!("No persisted quotes found, starting from seed set");
                seed_quotes()
            }
        };

        QuoteStore { quotes, gateway }
    }

    /// Seeded store backed by a throwaway memory gateway.
    pub fn in_memory() -> Self {
        Self::initialize(Box::new(MemoryGateway::new()))
    }

    /// Store that starts empty, regardless of what the gateway holds.
    pub fn empty(gateway: Box<dyn PersistenceGateway>) -> Self {
        QuoteStore {
            quotes: Vec::new(),
            gateway,
        }
    }

    // ========================================================================
    // READS
    // ========================================================================

    pub fn list(&self) -> &[Quote] {
        &self.quotes
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn find_by_id(&self, id: u64) -> Option<&Quote> {
        self.quotes.iter().find(|q| q.id == id)
    }

    pub fn next_id(&self) -> u64 {
        next_id(&self.quotes)
    }

    // ========================================================================
    // MUTATIONS (each persists before returning)
    // ========================================================================

    /// Validate, trim, assign the next id and append.
    ///
    /// The returned quote is what callers push to the remote source.
    pub fn add(&mut self, text: &str, category: &str) -> Result<Quote, ValidationError> {
        let input = NewQuote::new(text, category).validated()?;
        let quote = input.with_id(self.next_id());

        self.quotes.push(quote.clone());
        self.persist();

        debug!("Added quote {} in category {:?}", quote.id, quote.category);
        Ok(quote)
    }

    /// Overwrite text and category of the quote with `id`.
    ///
    /// Returns false (and changes nothing) when no such quote exists; the
    /// caller should insert instead.
    pub fn replace(&mut self, id: u64, text: &str, category: &str) -> bool {
        let replaced = self.apply_replace(id, text, category);
        if replaced {
            self.persist();
        }
        replaced
    }

    /// Append a quote that already carries its id (remote arrivals).
    pub fn insert_external(&mut self, quote: Quote) -> Result<(), ValidationError> {
        self.apply_insert(quote)?;
        self.persist();
        Ok(())
    }

    /// Validate every input, then append them with consecutive fresh ids and
    /// persist once. One invalid input rejects the whole batch.
    pub fn append_all(&mut self, inputs: Vec<NewQuote>) -> Result<Vec<Quote>, ValidationError> {
        let inputs = inputs
            .iter()
            .map(NewQuote::validated)
            .collect::<Result<Vec<_>, _>>()?;

        let first_id = self.next_id();
        let added: Vec<Quote> = inputs
            .into_iter()
            .zip(first_id..)
            .map(|(input, id)| input.with_id(id))
            .collect();

        if !added.is_empty() {
            self.quotes.extend(added.iter().cloned());
            self.persist();
        }

        Ok(added)
    }

    // ========================================================================
    // BATCH PRIMITIVES (no persistence; the caller persists once)
    // ========================================================================

    pub(crate) fn apply_replace(&mut self, id: u64, text: &str, category: &str) -> bool {
        match self.quotes.iter_mut().find(|q| q.id == id) {
            Some(existing) => {
                existing.text = text.to_string();
                existing.category = category.to_string();
                true
            }
            None => false,
        }
    }

    pub(crate) fn apply_insert(&mut self, quote: Quote) -> Result<(), ValidationError> {
        if self.find_by_id(quote.id).is_some() {
            return Err(ValidationError::DuplicateId(quote.id));
        }
        self.quotes.push(quote);
        Ok(())
    }

    /// Write the full list through the gateway. Failures are logged, not raised.
    pub fn persist(&mut self) -> bool {
        match self.gateway.save(&self.quotes) {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "Failed to persist {} quotes, continuing in memory: {}",
                    self.quotes.len(),
                    e
                );
                false
            }
        }
    }

    // ========================================================================
    // LAST VIEWED
    // ========================================================================

    pub fn last_viewed(&self) -> Option<Quote> {
        self.gateway.load_last_viewed()
    }

    pub fn remember_last_viewed(&mut self, quote: &Quote) {
        if let Err(e) = self.gateway.save_last_viewed(quote) {
            warn!("Failed to remember last viewed quote: {}", e);
        }
    }
}

impl std::fmt::Debug for QuoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuoteStore")
            .field("quotes", &self.quotes)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// TESTS
// ============================================================================
