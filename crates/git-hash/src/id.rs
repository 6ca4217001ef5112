use std::fmt;
use std::str::FromStr;

use crate::hex;
use crate::HashError;

/// Identity of a commit as assigned by the backend.
///
/// Carries the raw digest inline; SHA-1 and SHA-256 repositories are both
/// supported, the variant is picked from the hex length.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommitId {
    Sha1([u8; 20]),
    Sha256([u8; 32]),
}

impl CommitId {
    /// The all-zeros SHA-1 id. Never names a real commit.
    pub const NULL: Self = Self::Sha1([0u8; 20]);

    /// Parse a full 40 or 64 character hex id.
    pub fn from_hex(hex: &str) -> Result<Self, HashError> {
        match hex.len() {
            40 => {
                let mut bytes = [0u8; 20];
                hex::decode_into(hex, &mut bytes)?;
                Ok(Self::Sha1(bytes))
            }
            64 => {
                let mut bytes = [0u8; 32];
                hex::decode_into(hex, &mut bytes)?;
                Ok(Self::Sha256(bytes))
            }
            actual => Err(HashError::InvalidHexLength { actual }),
        }
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Sha1(b) => b,
            Self::Sha256(b) => b,
        }
    }

    pub fn is_null(&self) -> bool {
        self.as_bytes().iter().all(|&b| b == 0)
    }

    /// Full lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    /// Abbreviated hex (8 chars), as shown in commit labels.
    pub fn short(&self) -> String {
        hex::encode(&self.as_bytes()[..4])
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommitId({})", self.short())
    }
}

impl FromStr for CommitId {
    type Err = HashError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}
