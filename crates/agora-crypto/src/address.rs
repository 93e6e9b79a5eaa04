use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use sha3::{Digest, Keccak256};

/// A 20-byte Ethereum account address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Derive the address of an uncompressed SEC1 public key
    /// (65 bytes, leading `0x04`): the last 20 bytes of its Keccak-256 hash.
    pub fn from_uncompressed_key(key: &[u8]) -> Result<Self> {
        if key.len() != 65 || key[0] != 0x04 {
            return Err(anyhow!("Expected a 65-byte uncompressed public key"));
        }

        let hash = Keccak256::digest(&key[1..]);
        let mut out = [0u8; 20];
        out.copy_from_slice(&hash[12..]);
        Ok(Self(out))
    }

    /// Lowercase `0x`-prefixed hex form.
    pub fn to_lower_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// EIP-55 mixed-case checksum form.
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = Keccak256::digest(lower.as_bytes());

        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = if i % 2 == 0 { hash[i / 2] >> 4 } else { hash[i / 2] & 0x0f };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }

    /// Case-insensitive comparison against a user-supplied address string.
    pub fn matches(&self, claimed: &str) -> bool {
        let claimed = claimed.trim();
        let claimed = claimed
            .strip_prefix("0x")
            .or_else(|| claimed.strip_prefix("0X"))
            .unwrap_or(claimed);
        claimed.eq_ignore_ascii_case(&hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl FromStr for Address {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
        let bytes = hex::decode(digits)?;
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|_| anyhow!("Invalid address length"))?;
        Ok(Self(bytes))
    }
}
