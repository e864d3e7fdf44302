//! Join codes: short shareable tokens that let players join a game without
//! an invitation.

use rand::Rng;
use thiserror::Error;

/// Number of characters in a join code
pub const JOIN_CODE_LENGTH: usize = 6;

/// Characters a join code is drawn from
pub const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Default number of candidates tried before giving up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Join code errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinCodeError {
    /// Every candidate collided with an active game's code
    #[error("Could not generate a unique join code after {attempts} attempts, please try again")]
    CodeGenerationExhausted { attempts: u32 },

    /// User input is not a well-formed join code
    #[error("Invalid join code: {0}")]
    InvalidFormat(String),
}

/// Draw one random join code from `rng`
pub fn random_join_code<R: Rng>(rng: &mut R) -> String {
    (0..JOIN_CODE_LENGTH)
        .map(|_| {
            let idx = rng.random_range(0..JOIN_CODE_ALPHABET.len());
            char::from(JOIN_CODE_ALPHABET[idx])
        })
        .collect()
}

/// Trim and uppercase user input, then check it is a well-formed code
///
/// # Errors
///
/// * `JoinCodeError::InvalidFormat` - Wrong length or characters outside the alphabet
pub fn normalize_join_code(input: &str) -> Result<String, JoinCodeError> {
    let code = input.trim().to_ascii_uppercase();

    if code.len() != JOIN_CODE_LENGTH || !code.bytes().all(|b| JOIN_CODE_ALPHABET.contains(&b)) {
        return Err(JoinCodeError::InvalidFormat(input.trim().to_string()));
    }

    Ok(code)
}

/// Generates join codes and retries on collision, up to a fixed bound
pub struct JoinCodeGenerator<R: Rng> {
    rng: R,
    max_attempts: u32,
}

impl JoinCodeGenerator<rand::rngs::ThreadRng> {
    /// Create a generator backed by the thread-local RNG
    pub fn new() -> Self {
        Self::with_rng(rand::rng())
    }
}

impl Default for JoinCodeGenerator<rand::rngs::ThreadRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> JoinCodeGenerator<R> {
    /// Create a generator backed by `rng`
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Change the retry bound (at least one attempt is always made)
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Draw a single code without checking for collisions
    pub fn generate(&mut self) -> String {
        random_join_code(&mut self.rng)
    }

    /// Draw codes until `is_taken` rejects none of them
    ///
    /// # Arguments
    ///
    /// * `is_taken` - Returns true if a code already belongs to an active game
    ///
    /// # Errors
    ///
    /// * `JoinCodeError::CodeGenerationExhausted` - Every attempt collided
    pub fn generate_unique<F>(&mut self, mut is_taken: F) -> Result<String, JoinCodeError>
    where
        F: FnMut(&str) -> bool,
    {
        for attempt in 1..=self.max_attempts {
            let code = self.generate();
            if !is_taken(&code) {
                return Ok(code);
            }
            log::debug!("Join code collision on attempt {attempt}");
        }

        Err(JoinCodeError::CodeGenerationExhausted {
            attempts: self.max_attempts,
        })
    }

    /// Like [`generate_unique`](Self::generate_unique), for lookups that hit
    /// the database
    ///
    /// A failing lookup aborts generation with its own error.
    pub async fn generate_unique_async<F, Fut, E>(&mut self, mut is_taken: F) -> Result<String, E>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<bool, E>>,
        E: From<JoinCodeError>,
    {
        for attempt in 1..=self.max_attempts {
            let code = self.generate();
            if !is_taken(code.clone()).await? {
                return Ok(code);
            }
            log::debug!("Join code collision on attempt {attempt}");
        }

        Err(JoinCodeError::CodeGenerationExhausted {
            attempts: self.max_attempts,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    #[test]
    fn test_code_shape() {
        let mut generator = JoinCodeGenerator::new();
        for _ in 0..100 {
            let code = generator.generate();
            assert_eq!(code.len(), JOIN_CODE_LENGTH);
            assert!(code.bytes().all(|b| JOIN_CODE_ALPHABET.contains(&b)));
            assert_eq!(code, code.to_ascii_uppercase());
        }
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let mut a = JoinCodeGenerator::with_rng(StdRng::seed_from_u64(7));
        let mut b = JoinCodeGenerator::with_rng(StdRng::seed_from_u64(7));
        assert_eq!(a.generate(), b.generate());
    }

    #[test]
    fn test_generate_unique_skips_taken_codes() {
        let mut generator = JoinCodeGenerator::with_rng(StdRng::seed_from_u64(42));
        let first = JoinCodeGenerator::with_rng(StdRng::seed_from_u64(42)).generate();

        let taken: HashSet<String> = HashSet::from([first.clone()]);
        let code = generator.generate_unique(|c| taken.contains(c)).unwrap();
        assert_ne!(code, first);
    }

    #[test]
    fn test_generate_unique_exhausts_after_bound() {
        let mut generator = JoinCodeGenerator::new();
        let mut calls = 0;

        let err = generator
            .generate_unique(|_| {
                calls += 1;
                true
            })
            .unwrap_err();

        assert_eq!(err, JoinCodeError::CodeGenerationExhausted { attempts: 5 });
        assert_eq!(calls, 5);
    }

    #[tokio::test]
    async fn test_async_lookup_error_aborts() {
        let mut generator = JoinCodeGenerator::with_rng(StdRng::seed_from_u64(1));
        let mut calls = 0;

        let err = generator
            .generate_unique_async(|_| {
                calls += 1;
                async { Err::<bool, JoinCodeError>(JoinCodeError::InvalidFormat("db".into())) }
            })
            .await
            .unwrap_err();

        assert_eq!(err, JoinCodeError::InvalidFormat("db".into()));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_async_exhausts_after_bound() {
        let mut generator =
            JoinCodeGenerator::with_rng(StdRng::seed_from_u64(1)).with_max_attempts(3);
        let mut seen = Vec::new();

        let err = generator
            .generate_unique_async(|code| {
                seen.push(code);
                async { Ok::<_, JoinCodeError>(true) }
            })
            .await
            .unwrap_err();

        assert_eq!(err, JoinCodeError::CodeGenerationExhausted { attempts: 3 });
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_max_attempts_has_floor_of_one() {
        let generator = JoinCodeGenerator::new().with_max_attempts(0);
        assert_eq!(generator.max_attempts(), 1);
    }

    #[test]
    fn test_normalize_join_code() {
        assert_eq!(normalize_join_code("  ab12cd ").unwrap(), "AB12CD");
        assert_eq!(normalize_join_code("XYZ789").unwrap(), "XYZ789");

        assert!(normalize_join_code("ABC").is_err());
        assert!(normalize_join_code("ABCDEFG").is_err());
        assert!(normalize_join_code("AB-12C").is_err());
        assert!(normalize_join_code("ÄB12CD").is_err());
    }
}
