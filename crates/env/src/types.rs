use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Opaque byte payload: call input, return data, revert payload, event
/// topic or data, storage value.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn new() -> Self {
        Bytes(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(raw: Vec<u8>) -> Self {
        Bytes(raw)
    }
}

impl From<&[u8]> for Bytes {
    fn from(raw: &[u8]) -> Self {
        Bytes(raw.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for Bytes {
    fn from(raw: [u8; N]) -> Self {
        Bytes(raw.to_vec())
    }
}

impl fmt::Debug for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

pub const IDENTITY_LEN: usize = 20;

/// Opaque 20-byte unit identity.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity([u8; IDENTITY_LEN]);

impl Identity {
    pub fn from_bytes(raw: [u8; IDENTITY_LEN]) -> Self {
        Identity(raw)
    }

    /// Derive a stable identity from a seed string. The same seed always
    /// yields the same identity, which makes repeated provisioning at
    /// that identity overwrite-safe.
    pub fn from_seed(seed: &str) -> Self {
        let digest = Sha256::digest(seed.as_bytes());
        let mut raw = [0u8; IDENTITY_LEN];
        raw.copy_from_slice(&digest[..IDENTITY_LEN]);
        Identity(raw)
    }

    pub fn as_bytes(&self) -> &[u8; IDENTITY_LEN] {
        &self.0
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Leading 4-byte discriminator of a payload.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selector(pub [u8; 4]);

impl Selector {
    /// Extract the selector from a payload. `None` when the payload is
    /// shorter than four bytes.
    pub fn of(payload: &Bytes) -> Option<Selector> {
        let raw = payload.as_slice();
        if raw.len() < 4 {
            return None;
        }
        let mut sel = [0u8; 4];
        sel.copy_from_slice(&raw[..4]);
        Some(Selector(sel))
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:02x}{:02x}{:02x}{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

/// A side-effect event as produced by unit logic. Opaque beyond origin
/// filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub origin: Identity,
    pub topics: Vec<Bytes>,
    pub data: Bytes,
}

/// Opaque checkpoint handle. Issued by the environment on snapshot
/// creation and consumed by a successful rollback; never constructed
/// outside the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotId(pub(crate) u64);

impl SnapshotId {
    /// For environment implementations only: mint an identifier. Code
    /// driving an environment receives ids, it never makes them.
    pub fn issue(raw: u64) -> Self {
        SnapshotId(raw)
    }
}

/// Result of one dispatched call. On failure `output` carries the
/// revert payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallOutcome {
    pub success: bool,
    pub output: Bytes,
}

impl CallOutcome {
    pub fn ok(output: Bytes) -> Self {
        CallOutcome {
            success: true,
            output,
        }
    }

    pub fn reverted(payload: Bytes) -> Self {
        CallOutcome {
            success: false,
            output: payload,
        }
    }
}

/// Key of a mock-table entry. `value: None` matches any accompanying
/// value amount.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MockKey {
    pub target: Identity,
    pub value: Option<u128>,
    pub data: Bytes,
}
