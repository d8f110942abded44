use super::ball_event::BallEvent;
use serde::{Deserialize, Serialize};
use sha2::digest::Update;
use sha2::{Digest, Sha256};
use std::fmt::{Debug, Display, Write};

#[derive(Clone, Default, Eq, PartialEq, Hash)]
pub struct BallEventHash(pub [u8; 32]);

impl BallEventHash {
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(66);
        out.push_str("0x");
        for byte in self.0.iter() {
            let _ = write!(out, "{:02x}", byte);
        }
        out
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        if s.len() != 64 {
            return None;
        }
        let mut hash = [0u8; 32];
        for (i, chunk) in hash.iter_mut().enumerate() {
            *chunk = u8::from_str_radix(s.get(i * 2..i * 2 + 2)?, 16).ok()?;
        }
        Some(BallEventHash(hash))
    }
}

impl Display for BallEventHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Debug for BallEventHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BallEventHash({})", self.to_hex())
    }
}

impl From<[u8; 32]> for BallEventHash {
    fn from(hash: [u8; 32]) -> Self {
        BallEventHash(hash)
    }
}

impl Serialize for BallEventHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for BallEventHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        BallEventHash::from_hex(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid ball event hash: {}", s)))
    }
}

/// Fingerprint a delivery by its position in the match and everything that was scored on it.
/// Big-endian integer encoding keeps the hash stable across platforms.
pub fn generate_ball_event_hash(inning_sequence: u32, event: &BallEvent) -> BallEventHash {
    let mut hasher = Sha256::new();

    Update::update(&mut hasher, &event.match_id.as_u64().to_be_bytes());
    Update::update(&mut hasher, &inning_sequence.to_be_bytes());
    Update::update(&mut hasher, &event.delivery.to_be_bytes());
    Update::update(&mut hasher, &event.team_id.as_u64().to_be_bytes());
    Update::update(&mut hasher, &event.bowler_id.as_u64().to_be_bytes());
    Update::update(&mut hasher, &event.striker_id.as_u64().to_be_bytes());
    Update::update(&mut hasher, &event.non_striker_id.as_u64().to_be_bytes());
    Update::update(&mut hasher, &event.runs_off_bat.to_be_bytes());
    Update::update(&mut hasher, &[event.extras.tag()]);
    Update::update(&mut hasher, &event.extra_runs.to_be_bytes());
    if let Some(wicket) = &event.wicket {
        Update::update(&mut hasher, &wicket.dismissed_id.as_u64().to_be_bytes());
        Update::update(&mut hasher, &[wicket.kind.tag()]);
    }

    let hash_slice: [u8; 32] = hasher.finalize().into();
    BallEventHash(hash_slice)
}
