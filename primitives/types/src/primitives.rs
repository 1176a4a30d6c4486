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

//! Fixed width byte types.
//!
//! Hashes and addresses are `alloy-primitives` fixed byte arrays. They serialize as `0x`
//! prefixed hex and parse from it through `FromStr`.

pub use alloy_primitives::{Address, B256};

/// Identifies a registered order.
pub type OrderId = B256;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hashes_use_prefixed_hex_in_json() {
		let hash = B256::repeat_byte(0xab);
		let json = serde_json::to_string(&hash).unwrap();
		assert_eq!(json, format!("\"0x{}\"", "ab".repeat(32)));
		assert_eq!(serde_json::from_str::<B256>(&json).unwrap(), hash);
	}

	#[test]
	fn addresses_parse_with_or_without_prefix() {
		let expected = Address::repeat_byte(0x11);
		let hex = "11".repeat(20);
		assert_eq!(format!("0x{hex}").parse::<Address>().unwrap(), expected);
		assert_eq!(hex.parse::<Address>().unwrap(), expected);
		let json = serde_json::to_string(&expected).unwrap();
		assert_eq!(serde_json::from_str::<Address>(&json).unwrap(), expected);
	}

	#[test]
	fn rejects_wrong_length() {
		assert!("0x1234".parse::<B256>().is_err());
		assert!(serde_json::from_str::<B256>("\"0xzz\"").is_err());
		assert!(serde_json::from_str::<Address>(&format!("\"0x{}\"", "00".repeat(21))).is_err());
	}
}
