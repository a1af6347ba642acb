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

use bytes::Bytes;
use compact_str::CompactString;

use crate::data::{Column, IterInfo, KeyExtent, KeyValue, Range};
use crate::error::Result;

/// Opaque credentials forwarded to tablet servers.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub principal: CompactString,
    pub token: Bytes,
    pub instance_id: CompactString,
}

impl Credentials {
    pub fn new(
        principal: impl Into<CompactString>,
        token: impl Into<Bytes>,
        instance_id: impl Into<CompactString>,
    ) -> Self {
        Self { principal: principal.into(), token: token.into(), instance_id: instance_id.into() }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("principal", &self.principal)
            .field("instance_id", &self.instance_id)
            .finish_non_exhaustive()
    }
}

/// Visibility labels a scan may read, empty for system access.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Authorizations(pub Vec<Bytes>);

impl Authorizations {
    pub fn empty() -> Self {
        Self::default()
    }
}

pub type ScanId = i64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanRequest {
    pub credentials: Credentials,
    pub authorizations: Authorizations,
    pub extent: KeyExtent,
    pub range: Range,
    pub columns: Vec<Column>,
    pub iterators: Vec<IterInfo>,
    pub batch_size: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanBatch {
    pub scan_id: ScanId,
    pub results: Vec<KeyValue>,
    /// Whether server has more results for [TabletScanService::continue_scan].
    pub more: bool,
}

/// Scan calls of tablet server rpc.
pub trait TabletScanService {
    fn start_scan(&mut self, request: ScanRequest) -> Result<ScanBatch>;

    fn continue_scan(&mut self, scan_id: ScanId) -> Result<ScanBatch>;

    fn close_scan(&mut self, scan_id: ScanId) -> Result<()>;
}
