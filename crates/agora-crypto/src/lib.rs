//! Agora Crypto Library
//!
//! Wallet ownership proofs: a client signs a fixed message with its Ethereum
//! key (`personal_sign`) and the server recovers the signer's address.
//!
//! There is no nonce or expiry, so a captured signature stays valid forever.

pub mod address;
pub mod wallet;

pub use address::Address;
pub use wallet::{AUTH_MESSAGE, hash_personal_message, recover_address, verify_wallet};
