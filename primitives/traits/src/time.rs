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

//! Wall clock access.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A source of the current unix time.
pub trait UnixTime {
	fn now(&self) -> Duration;

	fn now_secs(&self) -> u64 {
		self.now().as_secs()
	}
}

/// The operating system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl UnixTime for SystemClock {
	fn now(&self) -> Duration {
		SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default()
	}
}
