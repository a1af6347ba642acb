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

use std::sync::Arc;

use tracing::debug;

use super::MetaDataLocationObtainer;
use crate::data::{TableId, TabletLocation};
use crate::error::Result;
use crate::interconnect::{ConnectionFactory, Credentials, TabletScanService};
use crate::keys;

/// Locates tablets of a table.
pub trait TabletLocator: Send + Sync {
    /// Locates tablets covering rows from `start` to `end`, unbounded if `end` is `None`, in row order.
    fn locate(&self, credentials: &Credentials, start: &[u8], end: Option<&[u8]>) -> Result<Vec<TabletLocation>>;
}

/// Locator of the root table which consists of one well known tablet.
pub struct RootTabletLocator {
    location: TabletLocation,
}

impl RootTabletLocator {
    pub fn new(location: TabletLocation) -> Self {
        Self { location }
    }

    pub fn location(&self) -> &TabletLocation {
        &self.location
    }
}

impl TabletLocator for RootTabletLocator {
    fn locate(&self, _credentials: &Credentials, _start: &[u8], _end: Option<&[u8]>) -> Result<Vec<TabletLocation>> {
        Ok(vec![self.location.clone()])
    }
}

/// Locates tablets of a table by scanning metadata tablets located by its parent.
pub struct MetadataTabletLocator<F> {
    table: TableId,
    parent: Arc<dyn TabletLocator>,
    obtainer: Arc<MetaDataLocationObtainer<F>>,
}

impl<F> MetadataTabletLocator<F>
where
    F: ConnectionFactory + 'static,
    F::Connection: TabletScanService,
{
    pub fn new(
        table: impl Into<TableId>,
        parent: Arc<dyn TabletLocator>,
        obtainer: Arc<MetaDataLocationObtainer<F>>,
    ) -> Self {
        Self { table: table.into(), parent, obtainer }
    }

    /// Chains root, metadata and `table` locators.
    pub fn from_root(
        root: TabletLocation,
        table: impl Into<TableId>,
        obtainer: Arc<MetaDataLocationObtainer<F>>,
    ) -> Self {
        let root = Arc::new(RootTabletLocator::new(root));
        let metadata = Arc::new(Self::new(keys::METADATA_TABLE_ID, root, obtainer.clone()));
        Self::new(table, metadata, obtainer)
    }

    pub fn table(&self) -> &TableId {
        &self.table
    }
}

impl<F> TabletLocator for MetadataTabletLocator<F>
where
    F: ConnectionFactory + 'static,
    F::Connection: TabletScanService,
{
    fn locate(&self, credentials: &Credentials, start: &[u8], end: Option<&[u8]>) -> Result<Vec<TabletLocation>> {
        let start_row = keys::metadata_row(&self.table, Some(start));
        let stop_row = keys::metadata_row(&self.table, None);
        let sources = self.parent.locate(credentials, &start_row, Some(stop_row.as_slice()))?;
        let mut locations = Vec::new();
        for source in sources.iter() {
            for location in self.obtainer.find_tablet(credentials, source, &start_row, &stop_row)? {
                if location.extent.table != self.table {
                    debug!("skip tablet {location} of other table while locating table {}", self.table);
                    continue;
                }
                let reached = match end {
                    None => location.extent.end_row.is_none(),
                    Some(end) => location.extent.reaches(end),
                };
                locations.push(location);
                if reached {
                    return Ok(locations);
                }
            }
        }
        Ok(locations)
    }
}
