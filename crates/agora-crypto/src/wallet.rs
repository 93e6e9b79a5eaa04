use anyhow::{Result, anyhow};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use sha3::{Digest, Keccak256};

use crate::address::Address;

/// The message every client signs to prove wallet ownership.
pub const AUTH_MESSAGE: &str = "Sign this message to verify your wallet ownership";

const PERSONAL_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n";

/// Keccak-256 of the payload that `personal_sign` / `eth_sign` actually sign:
/// the EIP-191 prefix, the decimal byte length, then the message itself.
pub fn hash_personal_message(message: &str) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(PERSONAL_PREFIX);
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(message.as_bytes());
    hasher.finalize().into()
}

/// Recover the address that produced `signature` over `message`.
///
/// The signature is 65 bytes of hex (`r || s || v`), with or without a `0x`
/// prefix. Both the legacy `v` of 27/28 and the raw parity of 0/1 are accepted.
pub fn recover_address(message: &str, signature: &str) -> Result<Address> {
    let (sig, recovery_id) = parse_signature(signature)?;
    let prehash = hash_personal_message(message);

    let key = VerifyingKey::recover_from_prehash(&prehash, &sig, recovery_id)
        .map_err(|e| anyhow!("Signature recovery failed: {}", e))?;

    Address::from_uncompressed_key(key.to_encoded_point(false).as_bytes())
}

/// True iff `signature` over `message` recovers to `claimed`, compared
/// case-insensitively. Any malformed input yields false.
pub fn verify_wallet(message: &str, signature: &str, claimed: &str) -> bool {
    match recover_address(message, signature) {
        Ok(recovered) => recovered.matches(claimed),
        Err(_) => false,
    }
}

fn parse_signature(signature: &str) -> Result<(Signature, RecoveryId)> {
    let digits = signature.trim();
    let digits = digits.strip_prefix("0x").unwrap_or(digits);
    let bytes = hex::decode(digits)?;
    if bytes.len() != 65 {
        return Err(anyhow!("Signature must be 65 bytes, got {}", bytes.len()));
    }

    let v = match bytes[64] {
        27 | 28 => bytes[64] - 27,
        0 | 1 => bytes[64],
        other => return Err(anyhow!("Invalid recovery byte: {}", other)),
    };
    let recovery_id = RecoveryId::from_byte(v).ok_or_else(|| anyhow!("Invalid recovery id"))?;
    let sig = Signature::from_slice(&bytes[..64])?;

    // k256 only verifies low-S signatures; flip parity along with S.
    match sig.normalize_s() {
        Some(normalized) => Ok((
            normalized,
            RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced()),
        )),
        None => Ok((sig, recovery_id)),
    }
}
