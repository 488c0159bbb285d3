// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Discovery context shared by an rmw implementation.
//!
//! A [`Context`] owns the graph cache of one participant. Local node and
//! endpoint changes go through it so that the participant's new state is
//! published on `ros_discovery_info` right after the cache is updated.
//! Snapshots from other participants arrive as CDR samples on an inbox
//! channel and are applied by a listener thread.
//!
//! The transport is not part of this crate: the caller injects a
//! [`ParticipantInfoPublisher`] and feeds the inbox.

use crossbeam::channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::env_config::{EnvConfig, DEFAULT_LISTENER_POLL};
use crate::error::{Error, Result};
use crate::gid::Gid;
use crate::graph::GraphCache;
use crate::msg::ParticipantEntitiesInfo;

/// Sink for this participant's `ParticipantEntitiesInfo` messages.
pub trait ParticipantInfoPublisher: Send + Sync {
    fn publish(&self, msg: &ParticipantEntitiesInfo) -> Result<()>;
}

/// Publisher that CDR-encodes each message onto a channel.
///
/// Useful for in-process loopback and for handing samples to a transport
/// running on another thread.
#[derive(Debug, Clone)]
pub struct CdrChannelPublisher {
    tx: Sender<Vec<u8>>,
}

impl CdrChannelPublisher {
    #[must_use]
    pub fn new(tx: Sender<Vec<u8>>) -> Self {
        Self { tx }
    }
}

impl ParticipantInfoPublisher for CdrChannelPublisher {
    fn publish(&self, msg: &ParticipantEntitiesInfo) -> Result<()> {
        let sample = msg.to_cdr()?;
        self.tx
            .send(sample)
            .map_err(|_| Error::Publish("discovery channel closed".into()))
    }
}

/// Latched "the graph changed" flag with blocking wait.
#[derive(Debug, Default)]
pub struct GraphGuard {
    triggered: Mutex<bool>,
    cond: Condvar,
}

impl GraphGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        *self.triggered.lock() = true;
        self.cond.notify_all();
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.triggered.lock()
    }

    /// Read and reset the flag.
    pub fn take(&self) -> bool {
        std::mem::replace(&mut *self.triggered.lock(), false)
    }

    /// Wait up to `timeout` for a trigger; consumes it if one arrived.
    ///
    /// A timeout too large to represent as a deadline waits without limit.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut triggered = self.triggered.lock();
        while !*triggered {
            match deadline {
                Some(deadline) => {
                    if self.cond.wait_until(&mut triggered, deadline).timed_out() {
                        break;
                    }
                }
                None => self.cond.wait(&mut triggered),
            }
        }
        std::mem::replace(&mut *triggered, false)
    }
}

struct Listener {
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Per-participant discovery context.
pub struct Context {
    gid: Gid,
    graph_cache: Arc<GraphCache>,
    publisher: Arc<dyn ParticipantInfoPublisher>,
    graph_guard: Arc<GraphGuard>,
    node_update_mutex: Mutex<()>,
    listener: Mutex<Option<Listener>>,
    listener_poll: Duration,
}

impl Context {
    /// Create a context for participant `gid` in `enclave`.
    ///
    /// Every cache change triggers the [`GraphGuard`].
    pub fn new(gid: Gid, enclave: &str, publisher: Arc<dyn ParticipantInfoPublisher>) -> Self {
        let graph_cache = Arc::new(GraphCache::new());
        let graph_guard = Arc::new(GraphGuard::new());

        let guard = Arc::clone(&graph_guard);
        graph_cache.set_on_change_callback(move || guard.trigger());
        graph_cache.add_participant(gid, enclave);

        log::info!("[context] created for participant {} (enclave '{}')", gid, enclave);

        Self {
            gid,
            graph_cache,
            publisher,
            graph_guard,
            node_update_mutex: Mutex::new(()),
            listener: Mutex::new(None),
            listener_poll: DEFAULT_LISTENER_POLL,
        }
    }

    /// Create a context using enclave and listener settings from `config`.
    pub fn from_env_config(
        gid: Gid,
        config: &EnvConfig,
        publisher: Arc<dyn ParticipantInfoPublisher>,
    ) -> Self {
        let mut context = Self::new(gid, &config.enclave, publisher);
        context.listener_poll = config.listener_poll;
        context
    }

    #[must_use]
    pub fn gid(&self) -> Gid {
        self.gid
    }

    /// Access the graph cache (shared ownership).
    #[must_use]
    pub fn graph_cache(&self) -> Arc<GraphCache> {
        Arc::clone(&self.graph_cache)
    }

    #[must_use]
    pub fn graph_guard(&self) -> Arc<GraphGuard> {
        Arc::clone(&self.graph_guard)
    }

    pub fn add_node(&self, node_name: &str, node_namespace: &str) -> Result<()> {
        let _lock = self.node_update_mutex.lock();
        let msg = self
            .graph_cache
            .add_node(self.gid, node_name, node_namespace)?;
        self.publish(&msg)
    }

    pub fn remove_node(&self, node_name: &str, node_namespace: &str) -> Result<()> {
        let _lock = self.node_update_mutex.lock();
        let msg = self
            .graph_cache
            .remove_node(self.gid, node_name, node_namespace)?;
        self.publish(&msg)
    }

    pub fn associate_writer(
        &self,
        writer_gid: Gid,
        node_name: &str,
        node_namespace: &str,
    ) -> Result<()> {
        let _lock = self.node_update_mutex.lock();
        let msg = self
            .graph_cache
            .associate_writer(writer_gid, self.gid, node_name, node_namespace)?;
        self.publish(&msg)
    }

    pub fn dissociate_writer(
        &self,
        writer_gid: Gid,
        node_name: &str,
        node_namespace: &str,
    ) -> Result<()> {
        let _lock = self.node_update_mutex.lock();
        let msg = self
            .graph_cache
            .dissociate_writer(writer_gid, self.gid, node_name, node_namespace)?;
        self.publish(&msg)
    }

    pub fn associate_reader(
        &self,
        reader_gid: Gid,
        node_name: &str,
        node_namespace: &str,
    ) -> Result<()> {
        let _lock = self.node_update_mutex.lock();
        let msg = self
            .graph_cache
            .associate_reader(reader_gid, self.gid, node_name, node_namespace)?;
        self.publish(&msg)
    }

    pub fn dissociate_reader(
        &self,
        reader_gid: Gid,
        node_name: &str,
        node_namespace: &str,
    ) -> Result<()> {
        let _lock = self.node_update_mutex.lock();
        let msg = self
            .graph_cache
            .dissociate_reader(reader_gid, self.gid, node_name, node_namespace)?;
        self.publish(&msg)
    }

    /// Publish the current state again, e.g. after a late peer joined.
    pub fn republish(&self) -> Result<()> {
        let _lock = self.node_update_mutex.lock();
        let msg = self
            .graph_cache
            .participant_entities_info(&self.gid)
            .ok_or(Error::ParticipantNotFound(self.gid))?;
        self.publish(&msg)
    }

    fn publish(&self, msg: &ParticipantEntitiesInfo) -> Result<()> {
        self.publisher.publish(msg).map_err(|err| {
            log::error!("[context] failed to publish participant {}: {}", self.gid, err);
            err
        })
    }

    /// Start applying remote snapshots received on `inbox`.
    ///
    /// Samples are CDR-encoded `ParticipantEntitiesInfo`; ours and
    /// undecodable ones are dropped. A listener whose inbox disconnected
    /// is reaped, so a new inbox can be attached without `shutdown()`.
    pub fn start_listener(&self, inbox: Receiver<Vec<u8>>) -> Result<()> {
        let mut slot = self.listener.lock();
        let stopped = slot
            .as_ref()
            .is_some_and(|l| !l.running.load(Ordering::Acquire) || l.handle.is_finished());
        if stopped {
            if let Some(finished) = slot.take() {
                finished
                    .handle
                    .join()
                    .map_err(|_| Error::Unexpected("graph listener panicked".into()))?;
                log::debug!("[context] reaped finished graph listener for {}", self.gid);
            }
        }
        if slot.is_some() {
            return Err(Error::InvalidArgument(
                "graph listener already running".into(),
            ));
        }

        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);
        let cache = Arc::clone(&self.graph_cache);
        let own_gid = self.gid;
        let poll = self.listener_poll;

        let handle = thread::Builder::new()
            .name("hdds-graph-listener".to_string())
            .spawn(move || run_listener(&cache, own_gid, &inbox, &thread_running, poll))
            .map_err(|e| Error::Unexpected(format!("failed to spawn graph listener: {}", e)))?;

        log::debug!("[context] graph listener started for {}", self.gid);
        *slot = Some(Listener { running, handle });
        Ok(())
    }

    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.listener
            .lock()
            .as_ref()
            .is_some_and(|l| l.running.load(Ordering::Acquire) && !l.handle.is_finished())
    }

    /// Stop and join the listener thread. No-op if none is running.
    pub fn shutdown(&self) -> Result<()> {
        let Some(listener) = self.listener.lock().take() else {
            return Ok(());
        };
        listener.running.store(false, Ordering::Release);
        listener
            .handle
            .join()
            .map_err(|_| Error::Unexpected("graph listener panicked".into()))?;
        log::debug!("[context] graph listener stopped for {}", self.gid);
        Ok(())
    }
}

fn run_listener(
    cache: &GraphCache,
    own_gid: Gid,
    inbox: &Receiver<Vec<u8>>,
    running: &AtomicBool,
    poll: Duration,
) {
    while running.load(Ordering::Acquire) {
        let sample = match inbox.recv_timeout(poll) {
            Ok(sample) => sample,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                log::debug!("[context] discovery inbox closed");
                break;
            }
        };
        match ParticipantEntitiesInfo::from_cdr(&sample) {
            Ok(msg) if msg.gid == own_gid => {}
            Ok(msg) => cache.update_participant_entities(&msg),
            Err(err) => log::warn!("[context] dropping malformed discovery sample: {}", err),
        }
    }
    running.store(false, Ordering::Release);
}

impl Drop for Context {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            log::error!("[context] {}", err);
        }
        self.graph_cache.clear_on_change_callback();
    }
}
