//! Connection id generation.
//!
//! Ids discriminate sessions between the same pair of endpoints. They are random,
//! not guaranteed unique.

use rand::Rng;

/// Produces 32-bit connection ids.
pub trait IdGenerator: Send + Sync {
    /// Returns the next id.
    fn next_id(&self) -> u32;
}

/// Draws ids from the thread-local cryptographically secure generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn next_id(&self) -> u32 {
        rand::rng().random()
    }
}

impl<F> IdGenerator for F
where
    F: Fn() -> u32 + Send + Sync,
{
    fn next_id(&self) -> u32 {
        self()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn test_closure_generator() {
        let counter = AtomicU32::new(7);
        let ids = move || counter.fetch_add(1, Ordering::Relaxed);
        assert_eq!(ids.next_id(), 7);
        assert_eq!(ids.next_id(), 8);
    }

    #[test]
    fn test_random_generator_varies() {
        let ids = RandomIdGenerator;
        let first = ids.next_id();
        // Sixteen identical draws in a row would mean a broken generator.
        assert!((0..16).any(|_| ids.next_id() != first));
    }
}
