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

//! Client side tablet location and transport pooling.
//!
//! Tablet locations live as rows in metadata tables, so locating a user tablet walks from the root tablet through
//! metadata tablets. [client::MetadataTabletLocator] performs one step of that walk and
//! [interconnect::TransportPool] caches connections to the servers it discovers.

pub mod client;
pub mod clock;
pub mod config;
pub mod data;
pub mod endpoint;
mod error;
pub mod interconnect;
pub mod keys;
pub mod rfile;

pub use self::error::{ClientError, Result};
