//! Short key generation.
//!
//! Two strategies share one entry point: [`KeyGeneratorKind::generate`].
//! Phonetic keys alternate consonants and vowels so they can be read aloud;
//! random keys draw from the full alphanumeric alphabet for maximum density.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const CONSONANTS: &[u8] = b"bcdfghjklmnpqrstvwxyz";
const VOWELS: &[u8] = b"aeiou";
const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Key generation strategy, selected once from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyGeneratorKind {
    /// Pronounceable consonant/vowel alternation, lower-case only.
    #[default]
    Phonetic,
    /// Uniform draw from `A-Z a-z 0-9`.
    Random,
}

impl KeyGeneratorKind {
    /// Generate a key of `length` characters using the thread-local RNG.
    ///
    /// # Returns
    /// A candidate key; uniqueness is the caller's concern.
    pub fn generate(&self, length: usize) -> String {
        self.generate_with(&mut rand::thread_rng(), length)
    }

    /// Generate a key of `length` characters from an explicit RNG.
    ///
    /// # Arguments
    /// - `rng`: Entropy source.
    /// - `length`: Number of characters in the key.
    ///
    /// # Returns
    /// A candidate key.
    pub fn generate_with<R: Rng + ?Sized>(&self, rng: &mut R, length: usize) -> String {
        match self {
            Self::Phonetic => phonetic_key(rng, length),
            Self::Random => random_key(rng, length),
        }
    }

    /// Characters a key produced by this strategy may contain.
    pub fn alphabet(&self) -> &'static [u8] {
        match self {
            Self::Phonetic => b"abcdefghijklmnopqrstuvwxyz",
            Self::Random => ALPHANUMERIC,
        }
    }

    /// Number of distinct keys of `length` this strategy can produce.
    ///
    /// Saturates at `u128::MAX`.
    pub fn key_space(&self, length: usize) -> u128 {
        match self {
            Self::Phonetic => {
                let long_half = length.div_ceil(2);
                let short_half = length / 2;
                let consonant_first = pow(CONSONANTS.len(), long_half)
                    .saturating_mul(pow(VOWELS.len(), short_half));
                let vowel_first = pow(VOWELS.len(), long_half)
                    .saturating_mul(pow(CONSONANTS.len(), short_half));
                if length == 0 {
                    1
                } else {
                    consonant_first.saturating_add(vowel_first)
                }
            }
            Self::Random => pow(ALPHANUMERIC.len(), length),
        }
    }

    /// Whether `key` could have been produced by this strategy.
    pub fn accepts(&self, key: &str) -> bool {
        let alphabet = self.alphabet();
        key.bytes().all(|byte| alphabet.contains(&byte))
    }

    /// Configuration spelling of this strategy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Phonetic => "phonetic",
            Self::Random => "random",
        }
    }
}

impl fmt::Display for KeyGeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyGeneratorKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "phonetic" => Ok(Self::Phonetic),
            "random" => Ok(Self::Random),
            other => Err(format!("unknown key generator type '{}'", other)),
        }
    }
}

/// A strategy bound to the key length it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyGenerator {
    pub kind: KeyGeneratorKind,
    pub length: usize,
}

impl KeyGenerator {
    /// Bind `kind` to `length`.
    pub fn new(kind: KeyGeneratorKind, length: usize) -> Self {
        Self { kind, length }
    }

    /// Generate one candidate key of the configured length.
    pub fn generate(&self) -> String {
        self.kind.generate(self.length)
    }

    /// Number of distinct candidates at the configured length.
    pub fn key_space(&self) -> u128 {
        self.kind.key_space(self.length)
    }
}

fn pow(base: usize, exp: usize) -> u128 {
    let exp = u32::try_from(exp).unwrap_or(u32::MAX);
    (base as u128).checked_pow(exp).unwrap_or(u128::MAX)
}

fn random_key<R: Rng + ?Sized>(rng: &mut R, length: usize) -> String {
    (0..length)
        .map(|_| ALPHANUMERIC[rng.gen_range(0..ALPHANUMERIC.len())] as char)
        .collect()
}

fn phonetic_key<R: Rng + ?Sized>(rng: &mut R, length: usize) -> String {
    let mut consonant = rng.gen_bool(0.5);
    let mut key = String::with_capacity(length);
    for _ in 0..length {
        let pool = if consonant { CONSONANTS } else { VOWELS };
        key.push(pool[rng.gen_range(0..pool.len())] as char);
        consonant = !consonant;
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn keys_have_requested_length_and_alphabet() {
        let mut rng = StdRng::seed_from_u64(7);
        for kind in [KeyGeneratorKind::Phonetic, KeyGeneratorKind::Random] {
            for length in [1, 3, 7, 10, 32] {
                for _ in 0..200 {
                    let key = kind.generate_with(&mut rng, length);
                    assert_eq!(key.len(), length, "{} key {:?}", kind, key);
                    assert!(kind.accepts(&key), "{} key {:?}", kind, key);
                }
            }
        }
    }

    #[test]
    fn phonetic_keys_alternate_consonants_and_vowels() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            let key = KeyGeneratorKind::Phonetic.generate_with(&mut rng, 9);
            let classes: Vec<bool> = key.bytes().map(|b| VOWELS.contains(&b)).collect();
            for pair in classes.windows(2) {
                assert_ne!(pair[0], pair[1], "key {:?} repeats a letter class", key);
            }
        }
    }

    #[test]
    fn random_keys_use_mixed_case_and_digits() {
        let mut rng = StdRng::seed_from_u64(3);
        let joined: String = (0..200)
            .map(|_| KeyGeneratorKind::Random.generate_with(&mut rng, 10))
            .collect();
        assert!(joined.bytes().any(|b| b.is_ascii_uppercase()));
        assert!(joined.bytes().any(|b| b.is_ascii_lowercase()));
        assert!(joined.bytes().any(|b| b.is_ascii_digit()));
    }

    #[test]
    fn zero_length_yields_empty_key() {
        assert_eq!(KeyGeneratorKind::Random.generate(0), "");
        assert_eq!(KeyGeneratorKind::Phonetic.generate(0), "");
    }

    #[test]
    fn key_space_matches_alphabet_math() {
        assert_eq!(KeyGeneratorKind::Random.key_space(2), 62 * 62);
        // c-v-c or v-c-v
        assert_eq!(
            KeyGeneratorKind::Phonetic.key_space(3),
            21 * 5 * 21 + 5 * 21 * 5
        );
        assert_eq!(KeyGeneratorKind::Random.key_space(64), u128::MAX);
    }

    #[test]
    fn short_phonetic_space_is_fully_reachable() {
        let mut rng = StdRng::seed_from_u64(5);
        let seen: HashSet<String> = (0..5_000)
            .map(|_| KeyGeneratorKind::Phonetic.generate_with(&mut rng, 1))
            .collect();
        assert_eq!(seen.len() as u128, KeyGeneratorKind::Phonetic.key_space(1));
    }

    #[test]
    fn kind_parses_from_config_strings() {
        assert_eq!(
            "Phonetic".parse::<KeyGeneratorKind>(),
            Ok(KeyGeneratorKind::Phonetic)
        );
        assert_eq!(
            " random ".parse::<KeyGeneratorKind>(),
            Ok(KeyGeneratorKind::Random)
        );
        assert!("dictionary".parse::<KeyGeneratorKind>().is_err());
        let parsed: KeyGeneratorKind = serde_json::from_str("\"random\"").expect("json");
        assert_eq!(parsed, KeyGeneratorKind::Random);
    }
}
