use crate::Generator;

/// `[0-9A-Za-z]`, so generated ids are safe in URL paths and file names.
pub const ALPHANUMERIC: [char; 62] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
    'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'A', 'B',
    'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U',
    'V', 'W', 'X', 'Y', 'Z',
];

/// Random alphanumeric identifiers of a fixed length.
#[derive(Debug, Clone, Copy)]
pub struct RandomGenerator {
    length: usize,
}

impl RandomGenerator {
    pub fn new(length: usize) -> Self {
        Self { length }
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl Generator for RandomGenerator {
    fn generate(&self) -> String {
        nanoid::format(nanoid::rngs::default, &ALPHANUMERIC, self.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_requested_length() {
        for len in [6, 8, 12] {
            let id = RandomGenerator::new(len).generate();
            assert_eq!(id.len(), len);
            assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn odd_lengths_are_honoured() {
        let generator = RandomGenerator::new(21);
        assert_eq!(generator.length(), 21);
        assert_eq!(generator.generate().len(), 21);
        assert_eq!(RandomGenerator::new(1).generate().len(), 1);
    }

    #[test]
    fn consecutive_ids_differ() {
        let generator = RandomGenerator::new(12);
        assert_ne!(generator.generate(), generator.generate());
    }
}
