/*
 * Copyright 2025 by Ideal Labs, LLC
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! BN254 group helpers shared by the timelock scheme and the beacon verifier.
//!
//! Points travel in the "EVM" encoding: big-endian, uncompressed, 32 bytes per base field
//! coordinate. G2 coordinates are written `x0 || x1 || y0 || y1` where `x = x0 + x1 * u`.

use ark_bn254::{Bn254, Fq, Fq2, G1Affine, G2Affine};
use ark_ec::{pairing::Pairing, AffineRepr};
use ark_ff::{BigInteger, PrimeField};
use ark_std::{ops::Neg, Zero};

/// Length of a big-endian base field element.
pub const FIELD_BYTES: usize = 32;
/// Length of an uncompressed G1 point.
pub const G1_BYTES: usize = 2 * FIELD_BYTES;
/// Length of an uncompressed G2 point.
pub const G2_BYTES: usize = 4 * FIELD_BYTES;

/// Errors that can be encountered while performing BN254 crypto operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
	/// The data could not be decoded to a valid element of G1.
	#[error("the data is not a valid G1 point")]
	DeserializeG1Failure,
	/// The data could not be decoded to a valid element of G2.
	#[error("the data is not a valid G2 point")]
	DeserializeG2Failure,
	/// A hex string could not be decoded.
	#[error("invalid hex encoding")]
	InvalidHex,
	/// The try-and-increment map ran out of candidates.
	#[error("hash to curve exhausted its candidate budget")]
	HashToCurveExhausted,
	/// The signature does not verify against the beacon public key.
	#[error("invalid beacon signature")]
	InvalidBeaconSignature,
	/// The symmetric layer rejected the ciphertext (wrong key or corrupt payload).
	#[error("symmetric decryption failed")]
	SymmetricDecryptFailed,
	/// The ciphertext is malformed or internally inconsistent.
	#[error("invalid ciphertext: {0}")]
	InvalidCiphertext(String),
	/// The beacon parameters are unusable.
	#[error("invalid beacon info: {0}")]
	InvalidBeaconInfo(String),
	/// The field-native hash could not be evaluated.
	#[error("poseidon hash failed")]
	PoseidonFailure,
	/// The chunk shares do not fit the accounting type.
	#[error("share total overflows")]
	SharesOverflow,
	/// A group or field element could not be serialized.
	#[error("serialization failed")]
	SerializeFailure,
}

/// Verifies `e(a, q) == e(r, s)` with a single multi miller loop.
///
/// Instead of computing two pairings and comparing them, we compute the miller loop of
/// `(-a, q), (r, s)` and take the final exponentiation, which is the identity iff the two
/// pairings agree.
#[inline]
pub(crate) fn fast_pairing_opt(a: G1Affine, q: G2Affine, r: G1Affine, s: G2Affine) -> bool {
	let looped = Bn254::multi_miller_loop([a.neg(), r], [q, s]);
	Bn254::final_exponentiation(looped).map(|exp| exp.is_zero()).unwrap_or(false)
}

/// Computes the 0 point in the G1 group
pub fn zero_on_g1() -> G1Affine {
	G1Affine::zero()
}

/// Big-endian bytes of a base field element.
pub fn fq_to_bytes(value: &Fq) -> [u8; FIELD_BYTES] {
	let bytes = value.into_bigint().to_bytes_be();
	let mut out = [0u8; FIELD_BYTES];
	out[FIELD_BYTES - bytes.len()..].copy_from_slice(&bytes);
	out
}

/// Reads a canonical big-endian base field element. Values at or above the modulus are
/// rejected rather than reduced.
pub fn fq_from_bytes(bytes: &[u8; FIELD_BYTES]) -> Option<Fq> {
	let value = Fq::from_be_bytes_mod_order(bytes);
	(fq_to_bytes(&value) == *bytes).then_some(value)
}

/// Builds a G1 point from affine coordinates, checking it lies on the curve.
/// The point at infinity is rejected.
pub fn g1_from_coords(
	x: &[u8; FIELD_BYTES],
	y: &[u8; FIELD_BYTES],
) -> Result<G1Affine, CryptoError> {
	let x = fq_from_bytes(x).ok_or(CryptoError::DeserializeG1Failure)?;
	let y = fq_from_bytes(y).ok_or(CryptoError::DeserializeG1Failure)?;
	let point = G1Affine::new_unchecked(x, y);
	if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
		return Err(CryptoError::DeserializeG1Failure);
	}
	Ok(point)
}

/// Builds a G2 point from affine coordinates, checking curve and subgroup membership.
pub fn g2_from_coords(
	x0: &[u8; FIELD_BYTES],
	x1: &[u8; FIELD_BYTES],
	y0: &[u8; FIELD_BYTES],
	y1: &[u8; FIELD_BYTES],
) -> Result<G2Affine, CryptoError> {
	let field = |b| fq_from_bytes(b).ok_or(CryptoError::DeserializeG2Failure);
	let x = Fq2::new(field(x0)?, field(x1)?);
	let y = Fq2::new(field(y0)?, field(y1)?);
	let point = G2Affine::new_unchecked(x, y);
	if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
		return Err(CryptoError::DeserializeG2Failure);
	}
	Ok(point)
}

/// Affine coordinates of a (non-identity) G1 point as `(x, y)`.
pub fn g1_coords(point: &G1Affine) -> ([u8; FIELD_BYTES], [u8; FIELD_BYTES]) {
	(fq_to_bytes(&point.x), fq_to_bytes(&point.y))
}

/// Affine coordinates of a (non-identity) G2 point as `(x0, x1, y0, y1)`.
pub fn g2_coords(point: &G2Affine) -> [[u8; FIELD_BYTES]; 4] {
	[
		fq_to_bytes(&point.x.c0),
		fq_to_bytes(&point.x.c1),
		fq_to_bytes(&point.y.c0),
		fq_to_bytes(&point.y.c1),
	]
}

/// Attempts to decode an uncompressed `x || y` byte array to a point on G1
pub fn decode_g1(bytes: &[u8]) -> Result<G1Affine, CryptoError> {
	if bytes.len() != G1_BYTES {
		return Err(CryptoError::DeserializeG1Failure);
	}
	let (x, y) = bytes.split_at(FIELD_BYTES);
	g1_from_coords(&to_word(x), &to_word(y))
}

/// Attempts to decode an uncompressed `x0 || x1 || y0 || y1` byte array to a point on G2
pub fn decode_g2(bytes: &[u8]) -> Result<G2Affine, CryptoError> {
	if bytes.len() != G2_BYTES {
		return Err(CryptoError::DeserializeG2Failure);
	}
	let words: Vec<[u8; FIELD_BYTES]> = bytes.chunks_exact(FIELD_BYTES).map(to_word).collect();
	g2_from_coords(&words[0], &words[1], &words[2], &words[3])
}

/// Uncompressed encoding of a G1 point.
pub fn encode_g1(point: &G1Affine) -> Vec<u8> {
	let (x, y) = g1_coords(point);
	[x, y].concat()
}

/// Uncompressed encoding of a G2 point.
pub fn encode_g2(point: &G2Affine) -> Vec<u8> {
	g2_coords(point).concat()
}

/// Decodes a (optionally `0x` prefixed) hex string into bytes.
pub fn decode_hex(value: &str) -> Result<Vec<u8>, CryptoError> {
	let trimmed = value.strip_prefix("0x").unwrap_or(value);
	hex::decode(trimmed).map_err(|_| CryptoError::InvalidHex)
}

fn to_word(bytes: &[u8]) -> [u8; FIELD_BYTES] {
	let mut word = [0u8; FIELD_BYTES];
	word.copy_from_slice(bytes);
	word
}
