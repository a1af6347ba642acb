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

use std::fmt::{Display, Formatter};

use super::KeyExtent;
use crate::endpoint::ServerConnection;
use crate::error::{ClientError, Result};

/// Tablet and the server session currently serving it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TabletLocation {
    pub extent: KeyExtent,
    /// `host:port` of tablet server.
    pub server: String,
    pub session: String,
}

impl TabletLocation {
    pub fn new(extent: KeyExtent, server: impl Into<String>, session: impl Into<String>) -> Self {
        Self { extent, server: server.into(), session: session.into() }
    }

    pub fn server_connection(&self) -> Result<ServerConnection> {
        self.server.parse().map_err(|err| {
            ClientError::invalid_argument(format!("tablet {} has invalid server {}: {err}", self.extent, self.server))
        })
    }
}

impl Display for TabletLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}[{}]", self.extent, self.server, self.session)
    }
}
