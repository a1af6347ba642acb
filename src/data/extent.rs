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

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use anyhow::Result;
use bytes::Bytes;
use compact_str::CompactString;

use crate::keys;

pub type TableId = CompactString;

/// Row range `(prev_end_row, end_row]` of a tablet in a table, `None` for unbounded end.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeyExtent {
    pub table: TableId,
    pub end_row: Option<Bytes>,
    pub prev_end_row: Option<Bytes>,
}

impl KeyExtent {
    pub fn new(table: impl Into<TableId>, end_row: Option<Bytes>, prev_end_row: Option<Bytes>) -> Self {
        Self { table: table.into(), end_row, prev_end_row }
    }

    /// Extent covering the whole table.
    pub fn whole_table(table: impl Into<TableId>) -> Self {
        Self::new(table, None, None)
    }

    /// Builds extent from metadata row and its encoded `~tab:~pr` value.
    pub fn from_metadata(row: &[u8], prev_row_value: &[u8]) -> Result<Self> {
        let (table, end_row) = keys::split_metadata_row(row)?;
        let prev_end_row = keys::decode_prev_row(prev_row_value)?;
        Ok(Self {
            table: table.into(),
            end_row: end_row.map(Bytes::copy_from_slice),
            prev_end_row: prev_end_row.map(Bytes::copy_from_slice),
        })
    }

    pub fn metadata_row(&self) -> Vec<u8> {
        keys::metadata_row(&self.table, self.end_row.as_deref())
    }

    pub fn contains(&self, row: &[u8]) -> bool {
        let after_prev = self.prev_end_row.as_ref().map_or(true, |prev| row > prev.as_ref());
        let before_end = self.end_row.as_ref().map_or(true, |end| row <= end.as_ref());
        after_prev && before_end
    }

    /// Whether this extent reaches `row`, that is no row after this extent is at or before `row`.
    pub fn reaches(&self, row: &[u8]) -> bool {
        self.end_row.as_ref().map_or(true, |end| end.as_ref() >= row)
    }
}

impl PartialOrd for KeyExtent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KeyExtent {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_end = match (&self.end_row, &other.end_row) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => a.cmp(b),
        };
        self.table.cmp(&other.table).then(by_end).then_with(|| self.prev_end_row.cmp(&other.prev_end_row))
    }
}

impl Display for KeyExtent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.table)?;
        match &self.end_row {
            None => f.write_str("<")?,
            Some(end) => write!(f, ";{}", end.escape_ascii())?,
        }
        match &self.prev_end_row {
            None => f.write_str("<"),
            Some(prev) => write!(f, ";{}", prev.escape_ascii()),
        }
    }
}

#[cfg(test)]
mod tests {
    use assertor::*;

    use super::*;

    fn bytes(s: &'static str) -> Bytes {
        Bytes::from_static(s.as_bytes())
    }

    fn extent(end: Option<&'static str>, prev: Option<&'static str>) -> KeyExtent {
        KeyExtent::new("2a", end.map(bytes), prev.map(bytes))
    }

    #[test]
    fn test_extent_from_metadata() {
        let extent = KeyExtent::from_metadata(b"2a;m", b"\x01f").unwrap();
        assert_that!(extent).is_equal_to(self::extent(Some("m"), Some("f")));

        let extent = KeyExtent::from_metadata(b"2a<", &[0]).unwrap();
        assert_that!(extent).is_equal_to(KeyExtent::whole_table("2a"));
        assert_that!(extent.metadata_row()).is_equal_to(b"2a<".to_vec());
    }

    #[test]
    fn test_extent_from_metadata_invalid() {
        assert_that!(KeyExtent::from_metadata(b"2a", &[0]).is_err()).is_true();
        assert_that!(KeyExtent::from_metadata(b"2a;m", &[]).is_err()).is_true();
    }

    #[test]
    fn test_extent_contains() {
        let extent = extent(Some("m"), Some("f"));
        assert_that!(extent.contains(b"f")).is_false();
        assert_that!(extent.contains(b"g")).is_true();
        assert_that!(extent.contains(b"m")).is_true();
        assert_that!(extent.contains(b"m\0")).is_false();

        let first = self::extent(Some("f"), None);
        assert_that!(first.contains(b"")).is_true();
        let last = self::extent(None, Some("m"));
        assert_that!(last.contains(b"zzz")).is_true();
    }

    #[test]
    fn test_extent_reaches() {
        assert_that!(extent(Some("m"), None).reaches(b"m")).is_true();
        assert_that!(extent(Some("m"), None).reaches(b"n")).is_false();
        assert_that!(extent(None, Some("m")).reaches(b"zzz")).is_true();
    }

    #[test]
    fn test_extent_order() {
        let mut extents = vec![extent(None, Some("m")), extent(Some("m"), Some("f")), extent(Some("f"), None)];
        extents.sort();
        let ends: Vec<_> = extents.iter().map(|e| e.end_row.clone()).collect();
        assert_that!(ends).is_equal_to(vec![Some(bytes("f")), Some(bytes("m")), None]);
    }

    #[test]
    fn test_extent_display() {
        assert_that!(extent(Some("m"), Some("f")).to_string()).is_equal_to("2a;m;f".to_string());
        assert_that!(KeyExtent::whole_table("2a").to_string()).is_equal_to("2a<<".to_string());
    }
}
