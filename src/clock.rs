// Copyright 2023 The SeamDB Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::time::{Duration, SystemTime};

/// Milliseconds since unix epoch.
pub fn now_millis() -> u64 {
    let elapsed = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or(Duration::ZERO);
    elapsed.as_millis() as u64
}

/// Whether `since` is at least `timeout` before `now`, both in milliseconds.
pub fn elapsed_at_least(since: u64, now: u64, timeout: Duration) -> bool {
    now.saturating_sub(since) >= timeout.as_millis() as u64
}

#[cfg(test)]
mod tests {
    use assertor::*;

    use super::*;

    #[test]
    fn test_now_millis() {
        let t0 = now_millis();
        let t1 = now_millis();
        assert_that!(t0).is_greater_than(0);
        assert_that!(t1).is_at_least(t0);
    }

    #[test]
    fn test_elapsed_at_least() {
        assert_that!(elapsed_at_least(100, 100, Duration::ZERO)).is_true();
        assert_that!(elapsed_at_least(100, 150, Duration::from_millis(50))).is_true();
        assert_that!(elapsed_at_least(100, 149, Duration::from_millis(50))).is_false();
        assert_that!(elapsed_at_least(200, 100, Duration::from_millis(1))).is_false();
    }
}
