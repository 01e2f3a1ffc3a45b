//! Injectable unique-identifier generation.
//!
//! Validation fills missing service names from a process-wide identifier
//! source. The source is a capability passed into `validate`, not a
//! global: production wiring supplies the UUID-backed generator, tests
//! substitute a fixed or sequenced one so output is deterministic.

use std::collections::VecDeque;
use std::sync::Mutex;

/// A source of unique string identifiers.
pub trait IdGenerator {
    /// Returns the next identifier.
    fn next_id(&self) -> String;
}

/// Production generator backed by random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Test generator that always returns the same identifier.
#[derive(Debug, Clone)]
pub struct FixedIdGenerator {
    id: String,
}

impl FixedIdGenerator {
    /// Creates a generator fixed to `id`.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl IdGenerator for FixedIdGenerator {
    fn next_id(&self) -> String {
        self.id.clone()
    }
}

/// Test generator that yields a fixed sequence, then falls back to UUIDs
/// once the sequence is exhausted.
#[derive(Debug)]
pub struct SequenceIdGenerator {
    ids: Mutex<VecDeque<String>>,
}

impl SequenceIdGenerator {
    /// Creates a generator that yields `ids` in order.
    #[must_use]
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: Mutex::new(ids.into_iter().map(Into::into).collect()),
        }
    }
}

impl IdGenerator for SequenceIdGenerator {
    fn next_id(&self) -> String {
        let next = match self.ids.lock() {
            Ok(mut ids) => ids.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        };
        next.unwrap_or_else(|| UuidGenerator.next_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_generator_yields_unique_ids() {
        let generator = UuidGenerator;
        assert_ne!(generator.next_id(), generator.next_id());
    }

    #[test]
    fn fixed_generator_always_yields_the_same_id() {
        let generator = FixedIdGenerator::new("2e9c3538-b9d3-4f47-8a23-2a19315b370b");
        assert_eq!(generator.next_id(), "2e9c3538-b9d3-4f47-8a23-2a19315b370b");
        assert_eq!(generator.next_id(), "2e9c3538-b9d3-4f47-8a23-2a19315b370b");
    }

    #[test]
    fn sequence_generator_yields_in_order() {
        let generator = SequenceIdGenerator::new(["one", "two"]);
        assert_eq!(generator.next_id(), "one");
        assert_eq!(generator.next_id(), "two");
        // Exhausted: falls back to a fresh UUID.
        assert_eq!(generator.next_id().len(), 36);
    }
}
