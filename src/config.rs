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

//! Client configuration in uri form, e.g. `tablet://host1:9997,host2:9997?max_attempts=5&idle_timeout_ms=60000`.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Error, Result};
use compact_str::CompactString;
use hashlink::LinkedHashMap;
use uriparse::{Query, Scheme};

use crate::endpoint::ServerConnection;
use crate::interconnect::{PoolOptions, TcpConnector, TransportPool};

pub const SCHEME: &str = "tablet";

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

const CONNECT_TIMEOUT_MS: &str = "connect_timeout_ms";
const ERROR_THRESHOLD: &str = "error_threshold";
const MAX_ATTEMPTS: &str = "max_attempts";
const IDLE_TIMEOUT_MS: &str = "idle_timeout_ms";

/// Candidate servers together with pool and connection settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    pub servers: Vec<ServerConnection>,
    pub pool: PoolOptions,
    pub connect_timeout: Duration,
}

impl ClientConfig {
    pub fn new(servers: Vec<ServerConnection>) -> Self {
        Self { servers, pool: PoolOptions::default(), connect_timeout: DEFAULT_CONNECT_TIMEOUT }
    }

    pub fn parse(uri: &str) -> Result<Self> {
        uri.parse()
    }

    pub fn connector(&self) -> TcpConnector {
        TcpConnector::new(self.connect_timeout)
    }

    pub fn new_pool(&self) -> TransportPool<TcpConnector> {
        TransportPool::with_options(self.connector(), self.pool.clone())
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            CONNECT_TIMEOUT_MS => self.connect_timeout = Duration::from_millis(parse_value(key, value)?),
            ERROR_THRESHOLD => self.pool.error_threshold = parse_value(key, value)?,
            MAX_ATTEMPTS => match parse_value(key, value)? {
                0 => bail!("{key} must be positive"),
                n => self.pool.max_attempts = n,
            },
            IDLE_TIMEOUT_MS => self.pool.idle_timeout = Duration::from_millis(parse_value(key, value)?),
            _ => bail!("unknown parameter {key}"),
        }
        Ok(())
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display, {
    value.parse().map_err(|err| anyhow!("invalid {key} {value}: {err}"))
}

fn split_param(s: &str) -> Option<(&str, &str)> {
    match s.split_once('=') {
        None | Some(("", _)) | Some((_, "")) => None,
        Some((_, value)) if value.contains('=') => None,
        Some(pair) => Some(pair),
    }
}

fn parse_params(s: &str) -> Option<LinkedHashMap<CompactString, CompactString>> {
    if Query::try_from(s).is_err() {
        return None;
    }
    let mut params = LinkedHashMap::new();
    for param in s.split('&') {
        let (key, value) = split_param(param)?;
        if params.insert(CompactString::new(key), CompactString::new(value)).is_some() {
            return None;
        }
    }
    Some(params)
}

impl FromStr for ClientConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let Some((scheme, trailing)) = s.split_once("://") else {
            return Err(anyhow!("invalid client uri: {s}"));
        };
        match Scheme::try_from(scheme) {
            Ok(_) if scheme == SCHEME => {},
            Ok(_) => return Err(anyhow!("unsupported scheme in client uri: {s}")),
            Err(_) => return Err(anyhow!("invalid scheme in client uri: {s}")),
        }
        let (address, params) = match trailing.split_once('?') {
            None => (trailing, None),
            Some((address, params)) => (address, Some(params)),
        };
        let address = address.strip_suffix('/').unwrap_or(address);
        if address.is_empty() {
            return Err(anyhow!("no servers in client uri: {s}"));
        }
        if address.contains('/') {
            return Err(anyhow!("unsupported path in client uri: {s}"));
        }
        let servers =
            ServerConnection::parse_list(address).map_err(|err| anyhow!("invalid servers in client uri {s}: {err}"))?;
        let params = match params {
            None => Default::default(),
            Some("") => return Err(anyhow!("empty params in client uri: {s}")),
            Some(params) => parse_params(params).ok_or_else(|| anyhow!("invalid params in client uri: {s}"))?,
        };
        let mut config = ClientConfig::new(servers);
        for (key, value) in params.iter() {
            config.apply(key, value).map_err(|err| anyhow!("{err} in client uri: {s}"))?;
        }
        Ok(config)
    }
}
