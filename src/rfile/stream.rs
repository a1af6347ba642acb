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

use bytes::{Buf, BufMut};

use crate::error::{ClientError, Result};

/// Order of magnitude bytes in variable length longs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ByteOrder {
    #[default]
    Big,
    Little,
}

impl ByteOrder {
    fn put_magnitude(self, buf: &mut impl BufMut, bytes: &[u8]) {
        match self {
            ByteOrder::Big => buf.put_slice(bytes),
            ByteOrder::Little => bytes.iter().rev().for_each(|b| buf.put_u8(*b)),
        }
    }

    fn take_magnitude(self, bytes: &mut [u8]) {
        match self {
            ByteOrder::Big => {},
            ByteOrder::Little => bytes.reverse(),
        }
    }
}

/// Writes hadoop variable length longs with tracked position.
pub struct RegionWriter<B> {
    buf: B,
    order: ByteOrder,
    position: u64,
}

impl<B: BufMut> RegionWriter<B> {
    pub fn new(buf: B, order: ByteOrder) -> Self {
        Self { buf, order, position: 0 }
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn into_inner(self) -> B {
        self.buf
    }

    /// Writes `value` in one to nine bytes and returns position after it.
    ///
    /// Values in `[-112, 127]` take one byte. Others take a length byte followed by magnitude bytes, where negative
    /// values store their complement.
    pub fn write_encoded_long(&mut self, value: i64) -> u64 {
        if (-112..=127).contains(&value) {
            self.buf.put_i8(value as i8);
            self.position += 1;
            return self.position;
        }
        let (magnitude, base) = match value < 0 {
            true => (!value as u64, -120i8),
            false => (value as u64, -112i8),
        };
        let n = 8 - (magnitude.leading_zeros() / 8) as usize;
        self.buf.put_i8(base - n as i8);
        self.order.put_magnitude(&mut self.buf, &magnitude.to_be_bytes()[8 - n..]);
        self.position += 1 + n as u64;
        self.position
    }
}

/// Reads what [RegionWriter] writes.
pub struct RegionReader<B> {
    buf: B,
    order: ByteOrder,
    position: u64,
}

impl<B: Buf> RegionReader<B> {
    pub fn new(buf: B, order: ByteOrder) -> Self {
        Self { buf, order, position: 0 }
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn read_encoded_long(&mut self) -> Result<i64> {
        if !self.buf.has_remaining() {
            return Err(ClientError::decode(format!("encoded long truncated at position {}", self.position)));
        }
        let first = self.buf.get_i8();
        if first >= -112 {
            self.position += 1;
            return Ok(first.into());
        }
        let (negative, n) = match first < -120 {
            true => (true, (-120 - first) as usize),
            false => (false, (-112 - first) as usize),
        };
        if self.buf.remaining() < n {
            return Err(ClientError::decode(format!(
                "encoded long at position {} expects {n} bytes, got {}",
                self.position,
                self.buf.remaining()
            )));
        }
        let mut bytes = [0u8; 8];
        self.buf.copy_to_slice(&mut bytes[8 - n..]);
        self.order.take_magnitude(&mut bytes[8 - n..]);
        self.position += 1 + n as u64;
        let magnitude = i64::from_be_bytes(bytes);
        Ok(if negative { !magnitude } else { magnitude })
    }
}
