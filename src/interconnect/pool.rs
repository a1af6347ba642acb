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

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Debug, Formatter};
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use hashbrown::HashMap;
use rand::seq::SliceRandom;
use rand::Rng;
use static_assertions::assert_impl_all;
use tracing::{debug, info, warn};

use super::transport::{ConnectionFactory, TcpConnector, Transport};
use crate::clock;
use crate::endpoint::ServerConnection;
use crate::error::{ClientError, Result};

/// Errors a server may return transports with before it is considered bad.
pub const ERROR_THRESHOLD: u32 = 20;

/// Servers tried by [TransportPool::get_transporter] before giving up.
pub const MAX_CONNECT_ATTEMPTS: usize = 10;

/// Time an unreserved transport may stay idle before [TransportPool::sweep_idle] closes it.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolOptions {
    pub error_threshold: u32,
    pub max_attempts: usize,
    pub idle_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            error_threshold: ERROR_THRESHOLD,
            max_attempts: MAX_CONNECT_ATTEMPTS,
            idle_timeout: IDLE_TIMEOUT,
        }
    }
}

/// Transport reserved from [TransportPool].
///
/// It must be handed back through [TransportPool::free_transport], marked by [CachedTransport::set_error] if it
/// failed in use.
pub struct CachedTransport<T> {
    id: u64,
    key: Arc<ServerConnection>,
    transport: T,
    has_error: bool,
}

impl<T> CachedTransport<T> {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn server(&self) -> &ServerConnection {
        &self.key
    }

    pub fn cache_key(&self) -> &Arc<ServerConnection> {
        &self.key
    }

    pub fn has_error(&self) -> bool {
        self.has_error
    }

    pub fn set_error(&mut self) {
        self.has_error = true;
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

impl<T> Deref for CachedTransport<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.transport
    }
}

impl<T> DerefMut for CachedTransport<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

impl<T> Debug for CachedTransport<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedTransport")
            .field("id", &self.id)
            .field("server", &self.key)
            .field("has_error", &self.has_error)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lifecycle {
    Open,
    Closing,
    Closed,
}

/// Reserved while its transport is lent out.
struct Slot<T> {
    id: u64,
    transport: Option<T>,
    last_return_millis: u64,
}

impl<T> Slot<T> {
    fn is_reserved(&self) -> bool {
        self.transport.is_none()
    }
}

struct ServerEntry<T> {
    key: Arc<ServerConnection>,
    slots: Vec<Slot<T>>,
}

struct PoolState<T> {
    lifecycle: Lifecycle,
    next_id: u64,
    cache: BTreeMap<ServerConnection, ServerEntry<T>>,
    error_counts: HashMap<ServerConnection, u32>,
    error_times: HashMap<ServerConnection, u64>,
    bad_servers: BTreeSet<ServerConnection>,
}

impl<T> PoolState<T> {
    fn new() -> Self {
        Self {
            lifecycle: Lifecycle::Open,
            next_id: 1,
            cache: BTreeMap::new(),
            error_counts: HashMap::new(),
            error_times: HashMap::new(),
            bad_servers: BTreeSet::new(),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        match self.lifecycle {
            Lifecycle::Open => Ok(()),
            Lifecycle::Closing | Lifecycle::Closed => Err(ClientError::PoolClosed),
        }
    }

    fn reserve_cached(&mut self, server: &ServerConnection) -> Option<CachedTransport<T>> {
        let entry = self.cache.get_mut(server)?;
        let key = entry.key.clone();
        let slot = entry.slots.iter_mut().find(|slot| !slot.is_reserved())?;
        let transport = slot.transport.take()?;
        Some(CachedTransport { id: slot.id, key, transport, has_error: false })
    }

    fn add_reserved(&mut self, server: &ServerConnection, transport: T) -> CachedTransport<T> {
        let id = self.next_id;
        self.next_id += 1;
        let entry = self
            .cache
            .entry(server.clone())
            .or_insert_with(|| ServerEntry { key: Arc::new(server.clone()), slots: Vec::new() });
        entry.slots.push(Slot { id, transport: None, last_return_millis: 0 });
        CachedTransport { id, key: entry.key.clone(), transport, has_error: false }
    }

    /// Returns transport to its slot and transports to close.
    fn release(&mut self, transport: CachedTransport<T>, error_threshold: u32, now: u64) -> Vec<T> {
        let CachedTransport { id, key, transport, has_error } = transport;
        let Some(entry) = self.cache.get_mut(key.as_ref()) else {
            return vec![transport];
        };
        let Some(slot) = entry.slots.iter_mut().find(|slot| slot.id == id && slot.is_reserved()) else {
            return vec![transport];
        };
        slot.last_return_millis = now;
        slot.transport = Some(transport);
        if !has_error {
            return Vec::new();
        }

        let mut closings = Vec::new();
        entry.slots.retain_mut(|slot| match slot.transport.take() {
            None => true,
            Some(transport) => {
                closings.push(transport);
                false
            },
        });
        if entry.slots.is_empty() {
            self.cache.remove(key.as_ref());
        }

        let errors = self.error_counts.entry(key.as_ref().clone()).or_insert(0);
        *errors += 1;
        let errors = *errors;
        self.error_times.insert(key.as_ref().clone(), now);
        if errors > error_threshold && self.bad_servers.insert(key.as_ref().clone()) {
            warn!("quarantine server {key} after {errors} transport errors");
        }
        debug!("evict {} idle transports to {key} after transport {id} failed", closings.len());
        closings
    }
}

fn close_transports<T: Transport>(transports: Vec<T>) {
    for mut transport in transports {
        if let Err(err) = transport.close() {
            debug!("fail to close transport: {err}");
        }
    }
}

/// Cache of transports keyed by server.
///
/// A transport is lent out exclusively by [TransportPool::get_transporter] and must be returned through
/// [TransportPool::free_transport]. Servers returning more than [PoolOptions::error_threshold] failed transports are
/// reported by [TransportPool::bad_servers], it is up to callers to avoid them.
pub struct TransportPool<F: ConnectionFactory> {
    factory: F,
    options: PoolOptions,
    state: Mutex<PoolState<F::Connection>>,
}

assert_impl_all!(TransportPool<TcpConnector>: Send, Sync);

impl<F: ConnectionFactory> TransportPool<F> {
    pub fn new(factory: F) -> Self {
        Self::with_options(factory, PoolOptions::default())
    }

    pub fn with_options(factory: F, options: PoolOptions) -> Self {
        Self { factory, options, state: Mutex::new(PoolState::new()) }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn options(&self) -> &PoolOptions {
        &self.options
    }

    fn lock(&self) -> MutexGuard<'_, PoolState<F::Connection>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserves a transport to one of given servers.
    ///
    /// With `prefer_cached`, idle cached transports are tried first in random server order. Otherwise or if none
    /// is idle, random servers are connected until one succeeds, all failed or attempts exhausted.
    ///
    /// Returns `host:port` of chosen server together with the transport.
    pub fn get_transporter(
        &self,
        servers: &[ServerConnection],
        prefer_cached: bool,
    ) -> Result<(String, CachedTransport<F::Connection>)> {
        if prefer_cached {
            let mut state = self.lock();
            state.ensure_open()?;
            let mut candidates: Vec<&ServerConnection> = servers.iter().collect::<BTreeSet<_>>().into_iter().collect();
            candidates.shuffle(&mut rand::thread_rng());
            for server in candidates {
                if let Some(transport) = state.reserve_cached(server) {
                    debug!("reserve cached transport {} to {server}", transport.id);
                    return Ok((server.to_string(), transport));
                }
            }
        } else {
            self.lock().ensure_open()?;
        }

        let mut candidates = servers.to_vec();
        let mut attempts = 0;
        let mut last_error = None;
        while !candidates.is_empty() && attempts < self.options.max_attempts {
            let index = rand::thread_rng().gen_range(0..candidates.len());
            let server = &candidates[index];
            if prefer_cached {
                let mut state = self.lock();
                state.ensure_open()?;
                if let Some(transport) = state.reserve_cached(server) {
                    debug!("reserve cached transport {} to {server}", transport.id);
                    return Ok((server.to_string(), transport));
                }
            }
            match self.create_new_transport(server) {
                Ok(transport) => return Ok((server.to_string(), transport)),
                Err(err) if err.is_connection_error() => {
                    warn!("fail to connect {server}: {err}");
                    attempts += 1;
                    last_error = Some(err);
                    candidates.swap_remove(index);
                },
                Err(err) => return Err(err),
            }
        }
        let message = match last_error {
            None => "no candidate server".to_string(),
            Some(err) => err.to_string(),
        };
        Err(ClientError::NoServerConnectable { attempts, message })
    }

    fn create_new_transport(&self, server: &ServerConnection) -> Result<CachedTransport<F::Connection>> {
        let transport = self.factory.open(server)?;
        let mut state = self.lock();
        if let Err(err) = state.ensure_open() {
            drop(state);
            close_transports(vec![transport]);
            return Err(err);
        }
        let transport = state.add_reserved(server, transport);
        debug!("create transport {} to {server}", transport.id);
        Ok(transport)
    }

    /// Hands back transport reserved from this pool.
    ///
    /// A failed transport counts an error against its server and evicts all idle transports to that server. After
    /// [TransportPool::close_all] the transport is simply closed.
    pub fn free_transport(&self, transport: CachedTransport<F::Connection>) {
        let mut state = self.lock();
        let closings = match state.lifecycle {
            Lifecycle::Open => state.release(transport, self.options.error_threshold, clock::now_millis()),
            Lifecycle::Closing | Lifecycle::Closed => vec![transport.transport],
        };
        drop(state);
        close_transports(closings);
    }

    /// Reserves a transport for `f` and frees it afterwards, marking it failed if `f` fails with an error that
    /// [invalidates](ClientError::invalidates_transport) it.
    pub fn with_transport<R>(
        &self,
        servers: &[ServerConnection],
        prefer_cached: bool,
        f: impl FnOnce(&str, &mut F::Connection) -> Result<R>,
    ) -> Result<R> {
        let (address, transport) = self.get_transporter(servers, prefer_cached)?;
        let mut transport = scopeguard::guard(transport, |transport| self.free_transport(transport));
        let result = f(&address, transport.transport_mut());
        if result.as_ref().is_err_and(|err| err.invalidates_transport()) {
            transport.set_error();
        }
        result
    }

    /// Closes all cached transports. Transports lent out are closed when freed.
    pub fn close_all(&self) {
        let mut state = self.lock();
        if state.lifecycle != Lifecycle::Open {
            return;
        }
        state.lifecycle = Lifecycle::Closing;
        let cache = std::mem::take(&mut state.cache);
        drop(state);
        let transports: Vec<_> =
            cache.into_values().flat_map(|entry| entry.slots).filter_map(|slot| slot.transport).collect();
        info!("close transport pool with {} idle transports", transports.len());
        close_transports(transports);
        self.lock().lifecycle = Lifecycle::Closed;
    }

    /// Closes idle transports returned at least [PoolOptions::idle_timeout] ago.
    pub fn sweep_idle(&self) -> usize {
        self.sweep_idle_for(self.options.idle_timeout)
    }

    /// Closes idle transports returned at least `idle_timeout` ago.
    pub fn sweep_idle_for(&self, idle_timeout: Duration) -> usize {
        let now = clock::now_millis();
        let mut state = self.lock();
        if state.lifecycle != Lifecycle::Open {
            return 0;
        }
        let mut closings = Vec::new();
        state.cache.retain(|_, entry| {
            entry.slots.retain_mut(|slot| {
                if slot.is_reserved() || !clock::elapsed_at_least(slot.last_return_millis, now, idle_timeout) {
                    return true;
                }
                closings.extend(slot.transport.take());
                false
            });
            !entry.slots.is_empty()
        });
        drop(state);
        let n = closings.len();
        if n != 0 {
            debug!("close {n} transports idle for {idle_timeout:?}");
        }
        close_transports(closings);
        n
    }

    pub fn is_closed(&self) -> bool {
        self.lock().lifecycle == Lifecycle::Closed
    }

    /// Servers that returned too many failed transports, in server order.
    pub fn bad_servers(&self) -> Vec<ServerConnection> {
        self.lock().bad_servers.iter().cloned().collect()
    }

    pub fn is_bad_server(&self, server: &ServerConnection) -> bool {
        self.lock().bad_servers.contains(server)
    }

    pub fn error_count(&self, server: &ServerConnection) -> u32 {
        self.lock().error_counts.get(server).copied().unwrap_or(0)
    }

    pub fn last_error_millis(&self, server: &ServerConnection) -> Option<u64> {
        self.lock().error_times.get(server).copied()
    }

    /// Number of transports to `server`, reserved or not.
    pub fn cached_count(&self, server: &ServerConnection) -> usize {
        self.lock().cache.get(server).map(|entry| entry.slots.len()).unwrap_or(0)
    }

    /// Number of unreserved transports to `server`.
    pub fn idle_count(&self, server: &ServerConnection) -> usize {
        let state = self.lock();
        let Some(entry) = state.cache.get(server) else {
            return 0;
        };
        entry.slots.iter().filter(|slot| !slot.is_reserved()).count()
    }
}

impl<F: ConnectionFactory> Drop for TransportPool<F> {
    fn drop(&mut self) {
        self.close_all();
    }
}
