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

use super::{RegionReader, RegionWriter};
use crate::error::Result;

/// Location and sizes of one block in a block compressed file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockRegion {
    pub offset: i64,
    pub compressed_size: i64,
    pub raw_size: i64,
}

impl BlockRegion {
    pub fn new(offset: i64, compressed_size: i64, raw_size: i64) -> Self {
        Self { offset, compressed_size, raw_size }
    }

    pub fn read<B: Buf>(reader: &mut RegionReader<B>) -> Result<Self> {
        let offset = reader.read_encoded_long()?;
        let compressed_size = reader.read_encoded_long()?;
        let raw_size = reader.read_encoded_long()?;
        Ok(Self { offset, compressed_size, raw_size })
    }

    /// Writes this region and returns position after it.
    pub fn write<B: BufMut>(&self, writer: &mut RegionWriter<B>) -> u64 {
        writer.write_encoded_long(self.offset);
        writer.write_encoded_long(self.compressed_size);
        writer.write_encoded_long(self.raw_size)
    }
}

#[cfg(test)]
mod tests {
    use assertor::*;
    use test_case::test_case;

    use super::*;
    use crate::rfile::ByteOrder;

    #[test_case(ByteOrder::Big)]
    #[test_case(ByteOrder::Little)]
    fn test_block_region(order: ByteOrder) {
        let regions = [BlockRegion::new(0, 100, 120), BlockRegion::new(100, 70_000, 1 << 40)];
        let mut writer = RegionWriter::new(Vec::new(), order);
        let first = regions[0].write(&mut writer);
        assert_that!(first).is_equal_to(3);
        let end = regions[1].write(&mut writer);
        let encoded = writer.into_inner();
        assert_that!(end).is_equal_to(encoded.len() as u64);

        let mut reader = RegionReader::new(encoded.as_slice(), order);
        assert_that!(BlockRegion::read(&mut reader).unwrap()).is_equal_to(regions[0]);
        assert_that!(reader.position()).is_equal_to(first);
        assert_that!(BlockRegion::read(&mut reader).unwrap()).is_equal_to(regions[1]);
        assert_that!(reader.position()).is_equal_to(end);
    }

    #[test]
    fn test_block_region_byte_order() {
        let region = BlockRegion::new(300, 70_000, 70_001);
        let mut big = RegionWriter::new(Vec::new(), ByteOrder::Big);
        let mut little = RegionWriter::new(Vec::new(), ByteOrder::Little);
        assert_that!(region.write(&mut big)).is_equal_to(region.write(&mut little));
        assert_that!(big.into_inner()).is_not_equal_to(little.into_inner());
    }

    #[test]
    fn test_block_region_truncated() {
        let mut writer = RegionWriter::new(Vec::new(), ByteOrder::Big);
        BlockRegion::new(300, 70_000, 70_001).write(&mut writer);
        let mut encoded = writer.into_inner();
        encoded.pop();
        let mut reader = RegionReader::new(encoded.as_slice(), ByteOrder::Big);
        assert_that!(BlockRegion::read(&mut reader).is_err()).is_true();
    }
}
