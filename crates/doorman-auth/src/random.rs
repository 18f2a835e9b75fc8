//! Cryptographically secure token generation.
//!
//! Confirmation and reset tokens are opaque alphanumeric strings; their
//! only properties are unguessability and equality.

use rand::distr::{Alphanumeric, SampleString};

/// Default length of confirmation/reset tokens.
pub const DEFAULT_TOKEN_LENGTH: usize = 64;

/// Generates a random alphanumeric string (a-z, A-Z, 0-9).
///
/// Uses the thread-local generator, which is cryptographically secure.
/// At the default length of 64 the result carries ~380 bits of entropy.
#[must_use]
pub fn random_alphanumeric(len: usize) -> String {
    let mut rng = rand::rng();
    Alphanumeric.sample_string(&mut rng, len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn produces_correct_length() {
        assert_eq!(random_alphanumeric(16).len(), 16);
        assert_eq!(random_alphanumeric(DEFAULT_TOKEN_LENGTH).len(), 64);
    }

    #[test]
    fn only_contains_alphanumeric_chars() {
        let s = random_alphanumeric(1000);
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn tokens_are_unique() {
        let tokens: HashSet<String> = (0..1000)
            .map(|_| random_alphanumeric(DEFAULT_TOKEN_LENGTH))
            .collect();
        assert_eq!(tokens.len(), 1000);
    }
}
