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

//! Key value vocabulary of scans.

mod extent;
mod location;
pub mod whole_row;

use std::cmp::Ordering;

use bytes::Bytes;

pub use self::extent::{KeyExtent, TableId};
pub use self::location::TabletLocation;

pub type Value = Bytes;

/// Cell coordinate in a sorted table.
///
/// Keys sort by row, column family, column qualifier and column visibility ascending, then by timestamp descending
/// so that newer versions come first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Key {
    pub row: Bytes,
    pub column_family: Bytes,
    pub column_qualifier: Bytes,
    pub column_visibility: Bytes,
    pub timestamp: i64,
}

impl Key {
    pub fn new(row: impl Into<Bytes>) -> Self {
        Self { row: row.into(), timestamp: i64::MAX, ..Default::default() }
    }

    pub fn with_column(mut self, family: impl Into<Bytes>, qualifier: impl Into<Bytes>) -> Self {
        self.column_family = family.into();
        self.column_qualifier = qualifier.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.row
            .cmp(&other.row)
            .then_with(|| self.column_family.cmp(&other.column_family))
            .then_with(|| self.column_qualifier.cmp(&other.column_qualifier))
            .then_with(|| self.column_visibility.cmp(&other.column_visibility))
            .then_with(|| other.timestamp.cmp(&self.timestamp))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyValue {
    pub key: Key,
    pub value: Value,
}

impl KeyValue {
    pub fn new(key: Key, value: impl Into<Value>) -> Self {
        Self { key, value: value.into() }
    }
}

/// Key range with per end inclusiveness, `None` for unbounded end.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Range {
    pub start: Option<Key>,
    pub start_inclusive: bool,
    pub stop: Option<Key>,
    pub stop_inclusive: bool,
}

impl Range {
    /// Rows from `start` to `stop`, both inclusive.
    pub fn rows(start: impl Into<Bytes>, stop: impl Into<Bytes>) -> Self {
        Self { start: Some(Key::new(start)), start_inclusive: true, stop: Some(Key::new(stop)), stop_inclusive: true }
    }

    pub fn contains_row(&self, row: &[u8]) -> bool {
        let after_start = match &self.start {
            None => true,
            Some(key) if self.start_inclusive => row >= key.row.as_ref(),
            Some(key) => row > key.row.as_ref(),
        };
        let before_stop = match &self.stop {
            None => true,
            Some(key) if self.stop_inclusive => row <= key.row.as_ref(),
            Some(key) => row < key.row.as_ref(),
        };
        after_start && before_stop
    }
}

/// Column to fetch, all qualifiers of family if `qualifier` is `None`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Column {
    pub family: Bytes,
    pub qualifier: Option<Bytes>,
}

impl Column {
    pub fn family(family: &'static [u8]) -> Self {
        Self { family: Bytes::from_static(family), qualifier: None }
    }

    pub fn qualified(family: &'static [u8], qualifier: &'static [u8]) -> Self {
        Self { family: Bytes::from_static(family), qualifier: Some(Bytes::from_static(qualifier)) }
    }

    pub fn matches(&self, key: &Key) -> bool {
        self.family == key.column_family && self.qualifier.as_ref().map_or(true, |q| *q == key.column_qualifier)
    }
}

/// Server side iterator setting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IterInfo {
    pub priority: u32,
    pub class_name: String,
    pub name: String,
}

impl IterInfo {
    pub fn new(name: impl Into<String>, class_name: impl Into<String>, priority: u32) -> Self {
        Self { priority, class_name: class_name.into(), name: name.into() }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use assertor::*;

    use super::*;

    #[test]
    fn test_key_order() {
        let k1 = Key::new("r1").with_column("loc", "s1");
        let k2 = Key::new("r1").with_column("~tab", "~pr");
        let k3 = Key::new("r2").with_column("future", "s1");
        assert_that!(k1).is_less_than(k2.clone());
        assert_that!(k2).is_less_than(k3);
    }

    #[test]
    fn test_key_newer_first() {
        let old = Key::new("r1").with_column("loc", "s1").with_timestamp(5);
        let new = Key::new("r1").with_column("loc", "s1").with_timestamp(9);
        assert_that!(new).is_less_than(old);
    }

    #[test]
    fn test_key_map_groups_rows() {
        let mut map = BTreeMap::new();
        map.insert(Key::new("r2").with_column("loc", "s"), 1);
        map.insert(Key::new("r1").with_column("~tab", "~pr"), 2);
        map.insert(Key::new("r1").with_column("loc", "s"), 3);
        let values: Vec<_> = map.into_values().collect();
        assert_that!(values).is_equal_to(vec![3, 2, 1]);
    }

    #[test]
    fn test_range_rows() {
        let range = Range::rows("b", "d");
        assert_that!(range.contains_row(b"a")).is_false();
        assert_that!(range.contains_row(b"b")).is_true();
        assert_that!(range.contains_row(b"c")).is_true();
        assert_that!(range.contains_row(b"d")).is_true();
        assert_that!(range.contains_row(b"d\0")).is_false();
    }

    #[test]
    fn test_range_exclusive_and_unbounded() {
        let range = Range { start: Some(Key::new("b")), start_inclusive: false, stop: None, stop_inclusive: false };
        assert_that!(range.contains_row(b"b")).is_false();
        assert_that!(range.contains_row(b"zzz")).is_true();
    }

    #[test]
    fn test_column_matches() {
        let key = Key::new("r").with_column("~tab", "~pr");
        assert_that!(Column::family(b"~tab").matches(&key)).is_true();
        assert_that!(Column::qualified(b"~tab", b"~pr").matches(&key)).is_true();
        assert_that!(Column::qualified(b"~tab", b"time").matches(&key)).is_false();
        assert_that!(Column::family(b"loc").matches(&key)).is_false();
    }
}
