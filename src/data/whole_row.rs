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

//! Codec of rows aggregated by the server side whole row iterator.
//!
//! Each row travels as one key value whose key carries the row and whose value packs every cell of the row as:
//! cell count (i32), then per cell family, qualifier and visibility (each i32 length prefixed), timestamp (i64) and
//! value (i32 length prefixed). All integers are big endian.

use std::collections::BTreeMap;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{Key, KeyValue, Value};
use crate::error::{ClientError, Result};

pub const ITERATOR_NAME: &str = "WRI";
pub const ITERATOR_CLASS: &str = "org.apache.accumulo.core.iterators.user.WholeRowIterator";

fn read_bytes(buf: &mut Bytes, what: &str) -> Result<Bytes> {
    if buf.remaining() < 4 {
        return Err(ClientError::decode(format!("whole row truncated at {what} length")));
    }
    let n = buf.get_i32();
    if n < 0 || n as usize > buf.remaining() {
        return Err(ClientError::decode(format!("whole row has invalid {what} length {n}")));
    }
    Ok(buf.split_to(n as usize))
}

/// Decodes one whole row value into its cells.
pub fn decode_row(row: &Bytes, value: &Bytes) -> Result<Vec<(Key, Value)>> {
    let mut buf = value.clone();
    if buf.remaining() < 4 {
        return Err(ClientError::decode("whole row truncated at cell count"));
    }
    let n = buf.get_i32();
    if n < 0 {
        return Err(ClientError::decode(format!("whole row has negative cell count {n}")));
    }
    let mut cells = Vec::with_capacity((n as usize).min(1024));
    for _ in 0..n {
        let column_family = read_bytes(&mut buf, "column family")?;
        let column_qualifier = read_bytes(&mut buf, "column qualifier")?;
        let column_visibility = read_bytes(&mut buf, "column visibility")?;
        if buf.remaining() < 8 {
            return Err(ClientError::decode("whole row truncated at timestamp"));
        }
        let timestamp = buf.get_i64();
        let value = read_bytes(&mut buf, "value")?;
        let key = Key { row: row.clone(), column_family, column_qualifier, column_visibility, timestamp };
        cells.push((key, value));
    }
    if buf.has_remaining() {
        return Err(ClientError::decode(format!("whole row has {} trailing bytes", buf.remaining())));
    }
    Ok(cells)
}

/// Decodes scanned whole rows into cells ordered by key.
pub fn decode_results(results: &[KeyValue], cells: &mut BTreeMap<Key, Value>) -> Result<()> {
    for result in results {
        for (key, value) in decode_row(&result.key.row, &result.value)? {
            cells.insert(key, value);
        }
    }
    Ok(())
}

fn put_bytes(buf: &mut BytesMut, bytes: &[u8]) {
    buf.put_i32(bytes.len() as i32);
    buf.put_slice(bytes);
}

/// Encodes cells of one row as the whole row iterator does.
pub fn encode_row<'a>(cells: impl IntoIterator<Item = (&'a Key, &'a Value)>) -> Value {
    let cells: Vec<_> = cells.into_iter().collect();
    let mut buf = BytesMut::new();
    buf.put_i32(cells.len() as i32);
    for (key, value) in cells {
        put_bytes(&mut buf, &key.column_family);
        put_bytes(&mut buf, &key.column_qualifier);
        put_bytes(&mut buf, &key.column_visibility);
        buf.put_i64(key.timestamp);
        put_bytes(&mut buf, value);
    }
    buf.freeze()
}
