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

use std::io::ErrorKind;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use ignore_result::Ignore;
use tracing::debug;

use crate::endpoint::ServerConnection;
use crate::error::{ClientError, Result};

/// Live connection to a server.
pub trait Transport: Send + 'static {
    fn close(&mut self) -> Result<()>;
}

/// Opens connections to servers.
pub trait ConnectionFactory: Send + Sync {
    type Connection: Transport;

    fn open(&self, server: &ServerConnection) -> Result<Self::Connection>;
}

/// Opens plain tcp connections.
#[derive(Clone, Debug)]
pub struct TcpConnector {
    connect_timeout: Duration,
    io_timeout: Option<Duration>,
}

impl TcpConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout, io_timeout: None }
    }

    pub fn with_io_timeout(self, timeout: Duration) -> Self {
        Self { io_timeout: Some(timeout), ..self }
    }
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}

impl ConnectionFactory for TcpConnector {
    type Connection = TcpTransport;

    fn open(&self, server: &ServerConnection) -> Result<TcpTransport> {
        let addrs = (server.host(), server.port())
            .to_socket_addrs()
            .map_err(|err| ClientError::not_connectable(server, err))?;
        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(self.io_timeout).map_err(|err| ClientError::not_connectable(server, err))?;
                    stream.set_write_timeout(self.io_timeout).map_err(|err| ClientError::not_connectable(server, err))?;
                    stream.set_nodelay(true).ignore();
                    debug!("connected to {server} via {addr}");
                    return Ok(TcpTransport { server: server.clone(), stream });
                },
                Err(err) => last_err = Some(err),
            }
        }
        let message = match last_err {
            None => "no address resolved".to_string(),
            Some(err) => err.to_string(),
        };
        Err(ClientError::not_connectable(server, message))
    }
}

#[derive(Debug)]
pub struct TcpTransport {
    server: ServerConnection,
    stream: TcpStream,
}

impl TcpTransport {
    pub fn server(&self) -> &ServerConnection {
        &self.server
    }

    pub fn stream(&mut self) -> &mut TcpStream {
        &mut self.stream
    }
}

impl Transport for TcpTransport {
    fn close(&mut self) -> Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            Err(err) if err.kind() != ErrorKind::NotConnected => Err(ClientError::transport_failure(&self.server, err)),
            _ => Ok(()),
        }
    }
}
