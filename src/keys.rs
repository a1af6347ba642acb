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

//! Metadata table layout shared with tablet servers.

use anyhow::{bail, Result};
use bytes::Bytes;

/// Table holding the locations of metadata tablets.
pub const ROOT_TABLE_ID: &str = "+r";
/// Table holding the locations of user tablets.
pub const METADATA_TABLE_ID: &str = "!0";

pub const CURRENT_LOCATION_COLUMN_FAMILY: &[u8] = b"loc";
pub const FUTURE_LOCATION_COLUMN_FAMILY: &[u8] = b"future";
pub const TABLET_COLUMN_FAMILY: &[u8] = b"~tab";
pub const PREV_ROW_COLUMN_QUALIFIER: &[u8] = b"~pr";

const END_ROW_SEPARATOR: u8 = b';';
const LAST_TABLET_MARKER: u8 = b'<';

pub fn is_location_family(family: &[u8]) -> bool {
    family == CURRENT_LOCATION_COLUMN_FAMILY || family == FUTURE_LOCATION_COLUMN_FAMILY
}

pub fn is_prev_row_column(family: &[u8], qualifier: &[u8]) -> bool {
    family == TABLET_COLUMN_FAMILY && qualifier == PREV_ROW_COLUMN_QUALIFIER
}

/// Metadata row of tablet ending at `end_row` in `table`, `table<` for the last tablet.
pub fn metadata_row(table: &str, end_row: Option<&[u8]>) -> Vec<u8> {
    let n = table.len() + 1 + end_row.map(|row| row.len()).unwrap_or(0);
    let mut row = Vec::with_capacity(n);
    row.extend(table.as_bytes());
    match end_row {
        None => row.push(LAST_TABLET_MARKER),
        Some(end_row) => {
            row.push(END_ROW_SEPARATOR);
            row.extend(end_row);
        },
    }
    row
}

/// Splits metadata row into table id and end row.
pub fn split_metadata_row(row: &[u8]) -> Result<(&str, Option<&[u8]>)> {
    let (table, end_row) = match row.iter().position(|b| *b == END_ROW_SEPARATOR) {
        Some(i) => (&row[..i], Some(&row[i + 1..])),
        None => match row.iter().position(|b| *b == LAST_TABLET_MARKER) {
            Some(i) if i + 1 == row.len() => (&row[..i], None),
            _ => bail!("metadata row {:?} has no end row", Bytes::copy_from_slice(row)),
        },
    };
    if table.is_empty() {
        bail!("metadata row {:?} has no table", Bytes::copy_from_slice(row))
    }
    let Ok(table) = std::str::from_utf8(table) else {
        bail!("metadata row {:?} has non utf8 table", Bytes::copy_from_slice(row))
    };
    Ok((table, end_row))
}

/// Encodes previous end row as stored in `~tab:~pr`.
pub fn encode_prev_row(prev_row: Option<&[u8]>) -> Vec<u8> {
    match prev_row {
        None => vec![0],
        Some(row) => {
            let mut value = Vec::with_capacity(row.len() + 1);
            value.push(1);
            value.extend(row);
            value
        },
    }
}

pub fn decode_prev_row(value: &[u8]) -> Result<Option<&[u8]>> {
    match value.split_first() {
        Some((0, [])) => Ok(None),
        Some((1, row)) => Ok(Some(row)),
        _ => bail!("invalid prev row value {:?}", Bytes::copy_from_slice(value)),
    }
}
