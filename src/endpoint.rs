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

//! Server identities used to key connections.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use anyhow::{anyhow, bail, Error, Result};
use compact_str::CompactString;
use uriparse::Host;

/// Network identity of a tablet server.
///
/// It has shape `host:port` and orders by host then port.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServerConnection {
    host: CompactString,
    port: u16,
}

impl ServerConnection {
    pub fn new(host: impl Into<CompactString>, port: u16) -> Self {
        Self { host: host.into(), port }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Parses comma separated servers, e.g. `host1:9997,host2:9997`.
    pub fn parse_list(address: &str) -> Result<Vec<ServerConnection>> {
        if address.is_empty() {
            bail!("empty server list")
        }
        address.split(',').map(ServerConnection::from_str).collect()
    }
}

impl FromStr for ServerConnection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let Some((host, port)) = s.rsplit_once(':') else {
            return Err(anyhow!("server {s} has no port"));
        };
        if host.is_empty() {
            return Err(anyhow!("server {s} has no host"));
        }
        if Host::try_from(host).is_err() {
            return Err(anyhow!("server {s} has invalid host"));
        }
        let host = match host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
            Some(ipv6) => ipv6,
            None if host.contains(':') => return Err(anyhow!("server {s} has unbracketed ipv6 host")),
            None => host,
        };
        let port = port.parse::<u16>().map_err(|_| anyhow!("server {s} has invalid port"))?;
        Ok(Self { host: host.into(), port })
    }
}

impl Display for ServerConnection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use assertor::*;
    use test_case::test_case;

    use super::*;

    #[test_case("host1:9997", "host1", 9997)]
    #[test_case("127.0.0.1:1", "127.0.0.1", 1)]
    #[test_case("[::1]:9997", "::1", 9997; "ipv6")]
    fn test_server_parse(s: &str, host: &str, port: u16) {
        let server: ServerConnection = s.parse().unwrap();
        assert_that!(server.host()).is_equal_to(host);
        assert_that!(server.port()).is_equal_to(port);
        assert_that!(server.to_string()).is_equal_to(s.to_string());
    }

    #[test_case("host1"; "no port")]
    #[test_case(":9997"; "no host")]
    #[test_case("host1:port"; "invalid port")]
    #[test_case("host1:70000"; "port overflow")]
    #[test_case("::1:9997"; "unbracketed ipv6")]
    fn test_server_parse_invalid(s: &str) {
        assert_that!(s.parse::<ServerConnection>().is_err()).is_true();
    }

    #[test]
    fn test_server_order() {
        let servers: BTreeSet<_> = ServerConnection::parse_list("b:1,a:2,a:1,b:1").unwrap().into_iter().collect();
        let servers: Vec<_> = servers.into_iter().map(|s| s.to_string()).collect();
        assert_that!(servers).is_equal_to(vec!["a:1".to_string(), "a:2".to_string(), "b:1".to_string()]);
    }

    #[test]
    fn test_server_parse_list_empty() {
        assert_that!(ServerConnection::parse_list("").is_err()).is_true();
        assert_that!(ServerConnection::parse_list("host1:1,").is_err()).is_true();
    }
}
