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

//! Connections to tablet servers and their pooling.

#[cfg(test)]
pub(crate) mod fake;
mod pool;
mod scan;
mod transport;

pub use self::pool::{
    CachedTransport,
    PoolOptions,
    TransportPool,
    ERROR_THRESHOLD,
    IDLE_TIMEOUT,
    MAX_CONNECT_ATTEMPTS,
};
pub use self::scan::{Authorizations, Credentials, ScanBatch, ScanId, ScanRequest, TabletScanService};
pub use self::transport::{ConnectionFactory, TcpConnector, TcpTransport, Transport};
