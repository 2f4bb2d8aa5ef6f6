use crate::Generator;
use std::sync::atomic::{AtomicU64, Ordering};

/// A deterministic generator using a sequential counter.
///
/// Produces codes like "wh0000", "wh0001", etc. Meant for tests and for
/// exercising collision handling, where predictable output matters more
/// than unguessable ids.
#[derive(Debug)]
pub struct SeqGenerator {
    counter: AtomicU64,
    prefix: String,
    width: usize,
}

impl Clone for SeqGenerator {
    fn clone(&self) -> Self {
        Self {
            counter: AtomicU64::new(self.counter.load(Ordering::SeqCst)),
            prefix: self.prefix.clone(),
            width: self.width,
        }
    }
}

impl SeqGenerator {
    /// Creates a generator whose codes are `prefix` followed by a counter
    /// zero-padded to `width` digits.
    pub fn with_prefix(prefix: impl Into<String>, width: usize) -> Self {
        Self::with_offset(prefix, width, 0)
    }

    /// Creates a generator starting from a specific counter value.
    pub fn with_offset(prefix: impl Into<String>, width: usize, offset: u64) -> Self {
        Self {
            counter: AtomicU64::new(offset),
            prefix: prefix.into(),
            width,
        }
    }

    /// A generator that always yields the same code. Collisions guaranteed.
    pub fn constant(code: impl Into<String>) -> ConstantGenerator {
        ConstantGenerator(code.into())
    }
}

impl Generator for SeqGenerator {
    fn generate(&self) -> String {
        let count = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}{:0width$}", self.prefix, count, width = self.width)
    }
}

#[derive(Debug, Clone)]
pub struct ConstantGenerator(String);

impl Generator for ConstantGenerator {
    fn generate(&self) -> String {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_generator_produces_sequential_codes() {
        let generator = SeqGenerator::with_prefix("wh", 4);

        assert_eq!(generator.generate(), "wh0000");
        assert_eq!(generator.generate(), "wh0001");
        assert_eq!(generator.generate(), "wh0002");
    }

    #[test]
    fn seq_generator_with_offset() {
        let generator = SeqGenerator::with_offset("f", 7, 1000);

        assert_eq!(generator.generate(), "f0001000");
        assert_eq!(generator.generate(), "f0001001");
    }

    #[test]
    fn generator_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SeqGenerator>();
    }

    #[test]
    fn clone_preserves_counter_state() {
        let generator = SeqGenerator::with_prefix("wh", 4);
        generator.generate();
        generator.generate();

        let cloned = generator.clone();

        assert_eq!(generator.generate(), "wh0002");
        assert_eq!(cloned.generate(), "wh0002");
    }

    #[test]
    fn constant_generator_repeats() {
        let generator = SeqGenerator::constant("abc123");
        assert_eq!(generator.generate(), generator.generate());
    }
}
