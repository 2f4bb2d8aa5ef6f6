pub mod random;
pub mod seq;

pub use random::RandomGenerator;
pub use seq::{ConstantGenerator, SeqGenerator};

/// Trait for generating random identifiers (short codes, file ids,
/// stored file names).
///
/// Implementations are pure generators that don't interact with storage;
/// callers check the candidate against their collection and retry on
/// collision.
pub trait Generator: Send + Sync + 'static {
    /// Produces the next candidate identifier.
    fn generate(&self) -> String;
}
