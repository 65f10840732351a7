use std::fmt;

use rand::{
    Rng,
    distr::{Distribution, StandardUniform},
};
use rand_pcg::Pcg32;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Seed for a reproducible stream of tile spawns.
///
/// 128 bits, written as 32 hexadecimal characters (big-endian) when
/// serialized or displayed. Two games created with the same seed and fed the
/// same moves produce identical boards.
///
/// # Example
///
/// ```
/// use arena2048_engine::{Game, SpawnSeed};
/// use rand::Rng as _;
///
/// let seed: SpawnSeed = rand::rng().random();
/// let a = Game::with_seed(seed);
/// let b = Game::with_seed(seed);
/// assert_eq!(a.state(), b.state());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnSeed([u8; 16]);

impl SpawnSeed {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(value.to_be_bytes())
    }

    /// Creates the random stream for this seed.
    #[must_use]
    pub fn rng(&self) -> Pcg32 {
        <Pcg32 as rand::SeedableRng>::from_seed(self.0)
    }

    /// Parses a 32-character hexadecimal string.
    pub fn from_hex(hex_str: &str) -> Result<Self, String> {
        if hex_str.len() != 32 {
            return Err(format!(
                "invalid hex: expected 32 characters, got {}",
                hex_str.len()
            ));
        }
        let num = u128::from_str_radix(hex_str, 16)
            .map_err(|e| format!("invalid hex: {hex_str} ({e})"))?;
        Ok(Self::from_u128(num))
    }
}

impl fmt::Display for SpawnSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", u128::from_be_bytes(self.0))
    }
}

impl std::str::FromStr for SpawnSeed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for SpawnSeed {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SpawnSeed {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex_str = String::deserialize(deserializer)?;
        Self::from_hex(&hex_str).map_err(serde::de::Error::custom)
    }
}

impl Distribution<SpawnSeed> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> SpawnSeed {
        let mut seed = [0; 16];
        rng.fill(&mut seed);
        SpawnSeed(seed)
    }
}
