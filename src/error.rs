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

use std::borrow::Cow;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("server {server} not connectable: {message}")]
    ServerNotConnectable { server: String, message: String },
    #[error("transport to {server} failed: {message}")]
    TransportFailure { server: String, message: String },
    #[error("no server connectable after {attempts} attempts: {message}")]
    NoServerConnectable { attempts: usize, message: String },
    #[error("transport pool closed")]
    PoolClosed,
    #[error("protocol decode: {message}")]
    ProtocolDecode { message: Cow<'static, str> },
    #[error("invalid argument: {message}")]
    InvalidArgument { message: Cow<'static, str> },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ClientError {
    pub fn not_connectable(server: impl ToString, message: impl ToString) -> Self {
        Self::ServerNotConnectable { server: server.to_string(), message: message.to_string() }
    }

    pub fn transport_failure(server: impl ToString, message: impl ToString) -> Self {
        Self::TransportFailure { server: server.to_string(), message: message.to_string() }
    }

    pub fn decode(message: impl Into<Cow<'static, str>>) -> Self {
        Self::ProtocolDecode { message: message.into() }
    }

    pub fn invalid_argument(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidArgument { message: message.into() }
    }

    /// Connection errors are retriable against another server.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ServerNotConnectable { .. } | Self::TransportFailure { .. } | Self::NoServerConnectable { .. }
        )
    }

    /// Transport that hit this error is not reusable, either broken or out of sync with its peer.
    pub fn invalidates_transport(&self) -> bool {
        self.is_connection_error() || matches!(self, Self::ProtocolDecode { .. })
    }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use assertor::*;

    use super::*;

    #[test]
    fn test_connection_errors() {
        assert_that!(ClientError::not_connectable("host1:9997", "refused").is_connection_error()).is_true();
        assert_that!(ClientError::transport_failure("host1:9997", "reset").is_connection_error()).is_true();
        assert_that!(ClientError::NoServerConnectable { attempts: 10, message: "".into() }.is_connection_error())
            .is_true();
        assert_that!(ClientError::PoolClosed.is_connection_error()).is_false();
        assert_that!(ClientError::decode("short row").is_connection_error()).is_false();
    }

    #[test]
    fn test_transport_invalidating_errors() {
        assert_that!(ClientError::transport_failure("host1:9997", "reset").invalidates_transport()).is_true();
        assert_that!(ClientError::decode("short row").invalidates_transport()).is_true();
        assert_that!(ClientError::invalid_argument("bad row").invalidates_transport()).is_false();
        assert_that!(ClientError::PoolClosed.invalidates_transport()).is_false();
    }

    #[test]
    fn test_error_display() {
        let err = ClientError::not_connectable("host1:9997", "connection refused");
        assert_that!(err.to_string()).is_equal_to("server host1:9997 not connectable: connection refused".to_string());
    }
}
