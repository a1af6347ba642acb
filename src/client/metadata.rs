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

use std::collections::BTreeMap;

use bytes::Bytes;
use tracing::debug;

use crate::data::{whole_row, Column, IterInfo, Key, KeyExtent, Range, TabletLocation, Value};
use crate::error::Result;
use crate::interconnect::{Authorizations, ConnectionFactory, Credentials, ScanRequest, TabletScanService, Transport};
use crate::keys;

/// Number of whole rows requested per scan batch.
pub const SCAN_BATCH_SIZE: usize = 1000;

pub const WHOLE_ROW_ITERATOR_PRIORITY: u32 = 10000;

/// Reads tablet locations out of metadata tablets.
///
/// Each lookup talks to the server of source metadata tablet through a dedicated connection, it is closed once the
/// lookup completes whether or not it succeeds.
pub struct MetaDataLocationObtainer<F> {
    factory: F,
}

impl<F> MetaDataLocationObtainer<F>
where
    F: ConnectionFactory,
    F::Connection: TabletScanService,
{
    pub fn new(factory: F) -> Self {
        Self { factory }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    fn scan_request(credentials: &Credentials, source: &TabletLocation, row: &[u8], stop_row: &[u8]) -> ScanRequest {
        ScanRequest {
            credentials: credentials.clone(),
            authorizations: Authorizations::empty(),
            extent: source.extent.clone(),
            range: Range::rows(Bytes::copy_from_slice(row), Bytes::copy_from_slice(stop_row)),
            columns: vec![
                Column::family(keys::CURRENT_LOCATION_COLUMN_FAMILY),
                Column::family(keys::FUTURE_LOCATION_COLUMN_FAMILY),
                Column::qualified(keys::TABLET_COLUMN_FAMILY, keys::PREV_ROW_COLUMN_QUALIFIER),
            ],
            iterators: vec![IterInfo::new(
                whole_row::ITERATOR_NAME,
                whole_row::ITERATOR_CLASS,
                WHOLE_ROW_ITERATOR_PRIORITY,
            )],
            batch_size: SCAN_BATCH_SIZE,
        }
    }

    /// Scans metadata rows `[row, stop_row]` hosted by `source` for tablet locations.
    ///
    /// Metadata rows without a location or prev row are skipped.
    pub fn find_tablet(
        &self,
        credentials: &Credentials,
        source: &TabletLocation,
        row: &[u8],
        stop_row: &[u8],
    ) -> Result<Vec<TabletLocation>> {
        let server = source.server_connection()?;
        let request = Self::scan_request(credentials, source, row, stop_row);
        let connection = self.factory.open(&server)?;
        let mut connection = scopeguard::guard(connection, |mut connection| {
            if let Err(err) = connection.close() {
                debug!("fail to close connection to {server}: {err}");
            }
        });
        let cells = scan_whole_rows(&mut *connection, request)?;
        let locations = decode_locations(&cells);
        debug!(
            "found {} tablets in {source} for rows {}..={}",
            locations.len(),
            row.escape_ascii(),
            stop_row.escape_ascii()
        );
        Ok(locations)
    }
}

fn scan_whole_rows<S: TabletScanService>(service: &mut S, request: ScanRequest) -> Result<BTreeMap<Key, Value>> {
    let mut batch = service.start_scan(request)?;
    let scan_id = batch.scan_id;
    let mut service = scopeguard::guard(service, |service| {
        if let Err(err) = service.close_scan(scan_id) {
            debug!("fail to close scan {scan_id}: {err}");
        }
    });
    let mut cells = BTreeMap::new();
    loop {
        whole_row::decode_results(&batch.results, &mut cells)?;
        if !batch.more {
            break;
        }
        batch = service.continue_scan(scan_id)?;
    }
    Ok(cells)
}

/// Location columns of one metadata row, later cells overwrite earlier ones.
#[derive(Default)]
struct MetadataRow<'a> {
    location: Option<(&'a Bytes, &'a Value)>,
    prev_row: Option<&'a Value>,
}

impl<'a> MetadataRow<'a> {
    fn update(&mut self, key: &'a Key, value: &'a Value) {
        if keys::is_location_family(&key.column_family) {
            self.location = Some((&key.column_qualifier, value));
        } else if keys::is_prev_row_column(&key.column_family, &key.column_qualifier) {
            self.prev_row = Some(value);
        }
    }

    fn into_location(self, row: &[u8]) -> Option<TabletLocation> {
        let (Some((session, location)), Some(prev_row)) = (self.location, self.prev_row) else {
            debug!("skip metadata row {} without location or prev row", row.escape_ascii());
            return None;
        };
        if location.is_empty() {
            debug!("skip metadata row {} with empty location", row.escape_ascii());
            return None;
        }
        match KeyExtent::from_metadata(row, prev_row) {
            Ok(extent) => Some(TabletLocation::new(
                extent,
                String::from_utf8_lossy(location),
                String::from_utf8_lossy(session),
            )),
            Err(err) => {
                debug!("skip malformed metadata row {}: {err}", row.escape_ascii());
                None
            },
        }
    }
}

fn decode_locations(cells: &BTreeMap<Key, Value>) -> Vec<TabletLocation> {
    let mut rows: BTreeMap<&Bytes, MetadataRow<'_>> = BTreeMap::new();
    for (key, value) in cells {
        rows.entry(&key.row).or_default().update(key, value);
    }
    rows.into_iter().filter_map(|(row, metadata)| metadata.into_location(row)).collect()
}
