//! Sealed Orders Crypto Prelude
//!
//! The purpose of this module is to alleviate imports of the types and functions required to
//! seal, open and sequence orders.
//!
pub use super::{
	beacon::{compute_round_on_g1, BeaconInfo, RoundNumber},
	bn254::{decode_g1, decode_g2, decode_hex, encode_g1, encode_g2, CryptoError},
	poseidon::{build_hash_chain, chain_head, next_link, verify_link, Hash},
	tlock::{TimelockCipher, TimelockCiphertext},
	verifier::{BeaconVerifier, SignatureVerifier},
};
