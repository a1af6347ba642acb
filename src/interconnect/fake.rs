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

//! In memory tablet servers for tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use hashbrown::HashMap;
use ignore_result::Ignore;

use super::{ConnectionFactory, ScanBatch, ScanId, ScanRequest, TabletScanService, Transport};
use crate::data::{whole_row, Key, KeyValue, Value};
use crate::endpoint::ServerConnection;
use crate::error::{ClientError, Result};

#[derive(Default)]
struct FakeClusterState {
    cells: HashMap<ServerConnection, BTreeMap<Key, Value>>,
    unreachable: BTreeSet<ServerConnection>,
    broken: BTreeSet<ServerConnection>,
    corrupted: BTreeSet<ServerConnection>,
    open_attempts: usize,
    opened: HashMap<ServerConnection, usize>,
    closed: usize,
    scans: Vec<(ServerConnection, ScanRequest)>,
    closed_scans: usize,
}

/// Tablet servers serving cells from memory.
#[derive(Clone, Default)]
pub struct FakeCluster {
    state: Arc<Mutex<FakeClusterState>>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeClusterState> {
        self.state.lock().unwrap()
    }

    pub fn put(&self, server: &ServerConnection, key: Key, value: impl Into<Value>) {
        self.lock().cells.entry(server.clone()).or_default().insert(key, value.into());
    }

    pub fn set_unreachable(&self, server: &ServerConnection) {
        self.lock().unreachable.insert(server.clone());
    }

    /// Scans against `server` fail after connected.
    pub fn set_broken(&self, server: &ServerConnection) {
        self.lock().broken.insert(server.clone());
    }

    /// Whole rows from `server` come truncated by one byte.
    pub fn set_corrupted(&self, server: &ServerConnection) {
        self.lock().corrupted.insert(server.clone());
    }

    pub fn open_attempts(&self) -> usize {
        self.lock().open_attempts
    }

    pub fn opened(&self) -> usize {
        self.lock().opened.values().sum()
    }

    pub fn opened_to(&self, server: &ServerConnection) -> usize {
        self.lock().opened.get(server).copied().unwrap_or(0)
    }

    pub fn closed(&self) -> usize {
        self.lock().closed
    }

    pub fn scans(&self) -> Vec<(ServerConnection, ScanRequest)> {
        self.lock().scans.clone()
    }

    pub fn closed_scans(&self) -> usize {
        self.lock().closed_scans
    }
}

impl ConnectionFactory for FakeCluster {
    type Connection = FakeConnection;

    fn open(&self, server: &ServerConnection) -> Result<FakeConnection> {
        let mut state = self.lock();
        state.open_attempts += 1;
        if state.unreachable.contains(server) {
            return Err(ClientError::not_connectable(server, "connection refused"));
        }
        *state.opened.entry(server.clone()).or_default() += 1;
        Ok(FakeConnection { server: server.clone(), cluster: self.clone(), pending: Vec::new(), closed: false })
    }
}

pub struct FakeConnection {
    server: ServerConnection,
    cluster: FakeCluster,
    pending: Vec<KeyValue>,
    closed: bool,
}

const FAKE_SCAN_ID: ScanId = 7;

impl FakeConnection {
    fn next_batch(&mut self, batch_size: usize) -> ScanBatch {
        let n = batch_size.max(1).min(self.pending.len());
        let results: Vec<_> = self.pending.drain(..n).collect();
        ScanBatch { scan_id: FAKE_SCAN_ID, results, more: !self.pending.is_empty() }
    }

    fn check_broken(&self) -> Result<()> {
        match self.cluster.lock().broken.contains(&self.server) {
            true => Err(ClientError::transport_failure(&self.server, "connection reset")),
            false => Ok(()),
        }
    }
}

impl Transport for FakeConnection {
    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.cluster.lock().closed += 1;
        }
        Ok(())
    }
}

impl Drop for FakeConnection {
    fn drop(&mut self) {
        self.close().ignore();
    }
}

impl TabletScanService for FakeConnection {
    fn start_scan(&mut self, request: ScanRequest) -> Result<ScanBatch> {
        self.check_broken()?;
        let mut state = self.cluster.lock();
        state.scans.push((self.server.clone(), request.clone()));
        let mut rows: BTreeMap<_, Vec<(Key, Value)>> = BTreeMap::new();
        for (key, value) in state.cells.get(&self.server).into_iter().flatten() {
            if !request.range.contains_row(&key.row) || !request.extent.contains(&key.row) {
                continue;
            }
            if !request.columns.is_empty() && !request.columns.iter().any(|column| column.matches(key)) {
                continue;
            }
            rows.entry(key.row.clone()).or_default().push((key.clone(), value.clone()));
        }
        let corrupted = state.corrupted.contains(&self.server);
        drop(state);
        let aggregate_rows = request.iterators.iter().any(|iter| iter.class_name == whole_row::ITERATOR_CLASS);
        self.pending = match aggregate_rows {
            true => rows
                .into_iter()
                .map(|(row, cells)| {
                    let value = whole_row::encode_row(cells.iter().map(|(k, v)| (k, v)));
                    let value = match corrupted {
                        true => value.slice(..value.len() - 1),
                        false => value,
                    };
                    KeyValue::new(Key::new(row), value)
                })
                .collect(),
            false => rows
                .into_values()
                .flatten()
                .map(|(key, value)| KeyValue::new(key, value))
                .collect(),
        };
        // Small batches exercise continuation.
        Ok(self.next_batch(request.batch_size.min(2)))
    }

    fn continue_scan(&mut self, scan_id: ScanId) -> Result<ScanBatch> {
        self.check_broken()?;
        assert_eq!(scan_id, FAKE_SCAN_ID);
        Ok(self.next_batch(2))
    }

    fn close_scan(&mut self, scan_id: ScanId) -> Result<()> {
        assert_eq!(scan_id, FAKE_SCAN_ID);
        self.cluster.lock().closed_scans += 1;
        Ok(())
    }
}
