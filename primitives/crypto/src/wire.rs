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

//! The JSON wire format of a timelock ciphertext.
//!
//! ```json
//! {
//!   "aes": { "iv": "0x..16 bytes..", "ciphertext": "0x.." },
//!   "round": 1234,
//!   "timelock": {
//!     "H":  { "x": "0x..", "y": "0x.." },
//!     "V":  { "x": "0x..", "y": "0x.." },
//!     "C1": { "x0": "0x..", "x1": "0x..", "y0": "0x..", "y1": "0x.." }
//!   }
//! }
//! ```
//!
//! Unknown fields are rejected at every level. An optional `"v"` version tag is accepted; only
//! version 1 exists and it is never emitted, so serialized ciphertexts stay byte compatible with
//! untagged producers. Every point is validated before the ciphertext is handed to any
//! cryptographic routine.

use crate::{
	bn254::{
		decode_hex, g1_coords, g1_from_coords, g2_coords, g2_from_coords, CryptoError, FIELD_BYTES,
	},
	tlock::{TimelockCiphertext, IV_LEN},
};
use serde::{Deserialize, Serialize};

/// The only wire version understood by this crate.
pub const WIRE_VERSION: u8 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireCiphertext {
	#[serde(rename = "v", default, skip_serializing_if = "Option::is_none")]
	pub version: Option<u8>,
	pub aes: WireAes,
	pub round: u64,
	pub timelock: WireTimelock,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireAes {
	pub iv: String,
	pub ciphertext: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireTimelock {
	#[serde(rename = "H")]
	pub h: WireG1,
	#[serde(rename = "V")]
	pub v: WireG1,
	#[serde(rename = "C1")]
	pub c1: WireG2,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireG1 {
	pub x: String,
	pub y: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireG2 {
	pub x0: String,
	pub x1: String,
	pub y0: String,
	pub y1: String,
}

fn to_hex(bytes: &[u8]) -> String {
	format!("0x{}", hex::encode(bytes))
}

fn invalid(reason: &str) -> CryptoError {
	CryptoError::InvalidCiphertext(reason.into())
}

/// Parses a coordinate, left padding short encodings (e.g. from big integer formatters).
fn coordinate(value: &str, name: &str) -> Result<[u8; FIELD_BYTES], CryptoError> {
	let trimmed = value.strip_prefix("0x").unwrap_or(value);
	let padded = if trimmed.len() % 2 == 1 { format!("0{trimmed}") } else { trimmed.to_string() };
	let bytes = decode_hex(&padded).map_err(|_| invalid(&format!("{name} is not hex")))?;
	if bytes.is_empty() || bytes.len() > FIELD_BYTES {
		return Err(invalid(&format!("{name} has an invalid length")));
	}
	let mut word = [0u8; FIELD_BYTES];
	word[FIELD_BYTES - bytes.len()..].copy_from_slice(&bytes);
	Ok(word)
}

impl From<TimelockCiphertext> for WireCiphertext {
	fn from(ct: TimelockCiphertext) -> Self {
		let (hx, hy) = g1_coords(&ct.h);
		let (vx, vy) = g1_coords(&ct.v);
		let [x0, x1, y0, y1] = g2_coords(&ct.c1);
		WireCiphertext {
			version: None,
			aes: WireAes { iv: to_hex(&ct.iv), ciphertext: to_hex(&ct.cipher_bytes) },
			round: ct.round,
			timelock: WireTimelock {
				h: WireG1 { x: to_hex(&hx), y: to_hex(&hy) },
				v: WireG1 { x: to_hex(&vx), y: to_hex(&vy) },
				c1: WireG2 { x0: to_hex(&x0), x1: to_hex(&x1), y0: to_hex(&y0), y1: to_hex(&y1) },
			},
		}
	}
}

impl TryFrom<WireCiphertext> for TimelockCiphertext {
	type Error = CryptoError;

	fn try_from(wire: WireCiphertext) -> Result<Self, Self::Error> {
		if let Some(version) = wire.version {
			if version != WIRE_VERSION {
				return Err(invalid(&format!("unsupported version {version}")));
			}
		}

		let iv: [u8; IV_LEN] = decode_hex(&wire.aes.iv)
			.map_err(|_| invalid("iv is not hex"))?
			.try_into()
			.map_err(|_| invalid("iv must be 16 bytes"))?;
		let cipher_bytes =
			decode_hex(&wire.aes.ciphertext).map_err(|_| invalid("ciphertext is not hex"))?;
		if cipher_bytes.is_empty() || cipher_bytes.len() % IV_LEN != 0 {
			return Err(invalid("ciphertext is not a whole number of blocks"));
		}

		let t = &wire.timelock;
		let h = g1_from_coords(&coordinate(&t.h.x, "H.x")?, &coordinate(&t.h.y, "H.y")?)
			.map_err(|_| invalid("H is not a G1 point"))?;
		let v = g1_from_coords(&coordinate(&t.v.x, "V.x")?, &coordinate(&t.v.y, "V.y")?)
			.map_err(|_| invalid("V is not a G1 point"))?;
		let c1 = g2_from_coords(
			&coordinate(&t.c1.x0, "C1.x0")?,
			&coordinate(&t.c1.x1, "C1.x1")?,
			&coordinate(&t.c1.y0, "C1.y0")?,
			&coordinate(&t.c1.y1, "C1.y1")?,
		)
		.map_err(|_| invalid("C1 is not a G2 point"))?;

		Ok(TimelockCiphertext { round: wire.round, iv, cipher_bytes, h, v, c1 })
	}
}

impl Serialize for TimelockCiphertext {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		WireCiphertext::from(self.clone()).serialize(serializer)
	}
}

impl<'de> Deserialize<'de> for TimelockCiphertext {
	fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let wire = WireCiphertext::deserialize(deserializer)?;
		TimelockCiphertext::try_from(wire).map_err(serde::de::Error::custom)
	}
}

impl TimelockCiphertext {
	/// The JSON wire encoding.
	pub fn to_bytes(&self) -> Result<Vec<u8>, CryptoError> {
		serde_json::to_vec(self).map_err(|_| CryptoError::SerializeFailure)
	}

	/// Parses and validates the JSON wire encoding.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
		serde_json::from_slice(bytes).map_err(|e| CryptoError::InvalidCiphertext(e.to_string()))
	}

	/// Reads only the unlock round from an encoded ciphertext, without validating points.
	pub fn peek_round(bytes: &[u8]) -> Result<u64, CryptoError> {
		let wire: WireCiphertext = serde_json::from_slice(bytes)
			.map_err(|e| CryptoError::InvalidCiphertext(e.to_string()))?;
		Ok(wire.round)
	}
}
