// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ROS graph cache.
//!
//! Tracks the data writers and data readers reported by discovery, the
//! participants that announced themselves through `ros_discovery_info`,
//! and which node of a participant owns which endpoint.
//!
//! # Locking
//!
//! A single mutex guards all three maps, the on-change callback and the
//! event subscribers. Every public method holds it for its whole duration;
//! internal helpers work on the already-locked [`GraphState`].
//!
//! The on-change callback runs on the mutating thread *while the lock is
//! held*. It must not call back into the cache (the lock is not reentrant)
//! and must not block. Consumers that need to react by querying the cache
//! should use [`GraphCache::subscribe`] instead: events are queued without
//! blocking and can be handled on another thread.

mod introspection;
#[cfg(test)]
mod tests;

pub use introspection::{NamesAndTypes, NodeNames};

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;

use crate::endpoint::EndpointType;
use crate::error::{Error, Result};
use crate::gid::Gid;
use crate::msg::{NodeEntitiesInfo, ParticipantEntitiesInfo};
use crate::qos::QosProfile;
use crate::type_hash::TypeHash;

/// Discovery data of one writer or reader. Never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityInfo {
    pub topic_name: String,
    pub topic_type: String,
    pub topic_type_hash: TypeHash,
    pub participant_gid: Gid,
    pub qos: QosProfile,
}

impl EntityInfo {
    #[must_use]
    pub fn new(
        topic_name: &str,
        topic_type: &str,
        topic_type_hash: TypeHash,
        participant_gid: Gid,
        qos: QosProfile,
    ) -> Self {
        Self {
            topic_name: topic_name.to_string(),
            topic_type: topic_type.to_string(),
            topic_type_hash,
            participant_gid,
            qos,
        }
    }
}

/// A participant's enclave and its nodes, in creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantInfo {
    pub enclave: String,
    pub node_entities_info_seq: Vec<NodeEntitiesInfo>,
}

impl ParticipantInfo {
    fn message(&self, gid: Gid) -> ParticipantEntitiesInfo {
        ParticipantEntitiesInfo {
            gid,
            node_entities_info_seq: self.node_entities_info_seq.clone(),
        }
    }
}

/// Structural change notification delivered to [`GraphCache::subscribe`] receivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphEvent {
    EntityAdded {
        gid: Gid,
        endpoint_type: EndpointType,
    },
    EntityRemoved {
        gid: Gid,
        endpoint_type: EndpointType,
    },
    /// Participant created, enclave set, or node list modified.
    ParticipantChanged(Gid),
    ParticipantRemoved(Gid),
}

/// Events buffered per [`GraphCache::subscribe`] receiver.
pub const GRAPH_EVENT_QUEUE_DEPTH: usize = 1024;

type OnChangeCallback = Box<dyn FnMut() + Send>;

#[derive(Default)]
struct GraphState {
    data_writers: BTreeMap<Gid, EntityInfo>,
    data_readers: BTreeMap<Gid, EntityInfo>,
    participants: BTreeMap<Gid, ParticipantInfo>,
    on_change: Option<OnChangeCallback>,
    subscribers: Vec<Sender<GraphEvent>>,
}

impl GraphState {
    fn entities(&self, endpoint_type: EndpointType) -> &BTreeMap<Gid, EntityInfo> {
        match endpoint_type {
            EndpointType::Publisher => &self.data_writers,
            EndpointType::Subscription => &self.data_readers,
        }
    }

    fn entities_mut(&mut self, endpoint_type: EndpointType) -> &mut BTreeMap<Gid, EntityInfo> {
        match endpoint_type {
            EndpointType::Publisher => &mut self.data_writers,
            EndpointType::Subscription => &mut self.data_readers,
        }
    }

    fn notify(&mut self, event: GraphEvent) {
        if let Some(callback) = self.on_change.as_mut() {
            callback();
        }
        if !self.subscribers.is_empty() {
            self.subscribers.retain(|tx| match tx.try_send(event.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    log::warn!(
                        "[graph] event subscriber lagged behind {} events, unsubscribing",
                        GRAPH_EVENT_QUEUE_DEPTH
                    );
                    false
                }
                Err(TrySendError::Disconnected(_)) => false,
            });
        }
    }

    /// First node of `participant_gid` named (`node_name`, `node_namespace`).
    fn node_mut(
        &mut self,
        participant_gid: Gid,
        node_name: &str,
        node_namespace: &str,
    ) -> Result<(&mut ParticipantInfo, usize)> {
        let participant = self
            .participants
            .get_mut(&participant_gid)
            .ok_or_else(|| participant_not_found(participant_gid))?;
        let index = participant
            .node_entities_info_seq
            .iter()
            .position(|node| node.matches(node_name, node_namespace))
            .ok_or_else(|| node_not_found(node_name, node_namespace))?;
        Ok((participant, index))
    }
}

fn participant_not_found(gid: Gid) -> Error {
    log::warn!("[graph] participant {} is not in the graph cache", gid);
    Error::ParticipantNotFound(gid)
}

fn node_not_found(node_name: &str, node_namespace: &str) -> Error {
    log::warn!(
        "[graph] node '{}' in namespace '{}' is not in the graph cache",
        node_name,
        node_namespace
    );
    Error::NodeNotFound {
        name: node_name.to_string(),
        namespace: node_namespace.to_string(),
    }
}

/// Discovery graph shared by a context, its discovery listener and
/// application threads. Share it through an `Arc`.
#[derive(Default)]
pub struct GraphCache {
    state: Mutex<GraphState>,
}

impl GraphCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the on-change callback, replacing any previous one.
    ///
    /// The callback runs under the cache lock; see the module docs.
    pub fn set_on_change_callback<F>(&self, callback: F)
    where
        F: FnMut() + Send + 'static,
    {
        let previous = self.state.lock().on_change.replace(Box::new(callback));
        drop(previous);
    }

    pub fn clear_on_change_callback(&self) {
        let previous = self.state.lock().on_change.take();
        drop(previous);
    }

    /// Receive a [`GraphEvent`] for every structural change from now on.
    ///
    /// Dropping the receiver unsubscribes it. At most
    /// [`GRAPH_EVENT_QUEUE_DEPTH`] events are queued; a receiver that falls
    /// further behind is unsubscribed and sees the channel disconnect once
    /// drained. It should then re-read the cache and subscribe again.
    pub fn subscribe(&self) -> Receiver<GraphEvent> {
        let (tx, rx) = channel::bounded(GRAPH_EVENT_QUEUE_DEPTH);
        self.state.lock().subscribers.push(tx);
        rx
    }

    // ---------------------------------------------------------------------
    // Discovery ingestion
    // ---------------------------------------------------------------------

    /// Record a discovered data writer. Returns `false` (and keeps the
    /// existing entry) if `gid` is already known.
    pub fn add_writer(
        &self,
        gid: Gid,
        topic_name: &str,
        type_name: &str,
        type_hash: TypeHash,
        participant_gid: Gid,
        qos: QosProfile,
    ) -> bool {
        self.add_entity(
            gid,
            topic_name,
            type_name,
            type_hash,
            participant_gid,
            qos,
            EndpointType::Publisher,
        )
    }

    /// Record a discovered data reader. See [`GraphCache::add_writer`].
    pub fn add_reader(
        &self,
        gid: Gid,
        topic_name: &str,
        type_name: &str,
        type_hash: TypeHash,
        participant_gid: Gid,
        qos: QosProfile,
    ) -> bool {
        self.add_entity(
            gid,
            topic_name,
            type_name,
            type_hash,
            participant_gid,
            qos,
            EndpointType::Subscription,
        )
    }

    pub fn add_entity(
        &self,
        gid: Gid,
        topic_name: &str,
        type_name: &str,
        type_hash: TypeHash,
        participant_gid: Gid,
        qos: QosProfile,
        endpoint_type: EndpointType,
    ) -> bool {
        let mut state = self.state.lock();
        let entities = state.entities_mut(endpoint_type);
        if entities.contains_key(&gid) {
            return false;
        }
        entities.insert(
            gid,
            EntityInfo::new(topic_name, type_name, type_hash, participant_gid, qos),
        );
        log::trace!(
            "[graph] added {:?} {} on '{}' (participant {})",
            endpoint_type,
            gid,
            topic_name,
            participant_gid
        );
        state.notify(GraphEvent::EntityAdded { gid, endpoint_type });
        true
    }

    /// Returns `false` if `gid` was not a known writer.
    pub fn remove_writer(&self, gid: &Gid) -> bool {
        self.remove_entity(gid, EndpointType::Publisher)
    }

    /// Returns `false` if `gid` was not a known reader.
    pub fn remove_reader(&self, gid: &Gid) -> bool {
        self.remove_entity(gid, EndpointType::Subscription)
    }

    pub fn remove_entity(&self, gid: &Gid, endpoint_type: EndpointType) -> bool {
        let mut state = self.state.lock();
        if state.entities_mut(endpoint_type).remove(gid).is_none() {
            return false;
        }
        log::trace!("[graph] removed {:?} {}", endpoint_type, gid);
        state.notify(GraphEvent::EntityRemoved {
            gid: *gid,
            endpoint_type,
        });
        true
    }

    // ---------------------------------------------------------------------
    // Local construction
    // ---------------------------------------------------------------------

    /// Ensure `participant_gid` exists and set its enclave. Always notifies.
    pub fn add_participant(&self, participant_gid: Gid, enclave: &str) {
        let mut state = self.state.lock();
        state
            .participants
            .entry(participant_gid)
            .or_default()
            .enclave = enclave.to_string();
        state.notify(GraphEvent::ParticipantChanged(participant_gid));
    }

    /// Forget a participant and all of its node associations.
    pub fn remove_participant(&self, participant_gid: &Gid) -> bool {
        let mut state = self.state.lock();
        if state.participants.remove(participant_gid).is_none() {
            return false;
        }
        state.notify(GraphEvent::ParticipantRemoved(*participant_gid));
        true
    }

    /// Append a node (duplicates allowed) and return the participant's new state.
    pub fn add_node(
        &self,
        participant_gid: Gid,
        node_name: &str,
        node_namespace: &str,
    ) -> Result<ParticipantEntitiesInfo> {
        let mut state = self.state.lock();
        let participant = state
            .participants
            .get_mut(&participant_gid)
            .ok_or_else(|| participant_not_found(participant_gid))?;
        participant
            .node_entities_info_seq
            .push(NodeEntitiesInfo::new(node_name, node_namespace));
        let msg = participant.message(participant_gid);
        state.notify(GraphEvent::ParticipantChanged(participant_gid));
        Ok(msg)
    }

    /// Remove the first matching node, discarding its associations.
    pub fn remove_node(
        &self,
        participant_gid: Gid,
        node_name: &str,
        node_namespace: &str,
    ) -> Result<ParticipantEntitiesInfo> {
        self.modify_participant(participant_gid, node_name, node_namespace, |participant, index| {
            participant.node_entities_info_seq.remove(index);
        })
    }

    pub fn associate_writer(
        &self,
        writer_gid: Gid,
        participant_gid: Gid,
        node_name: &str,
        node_namespace: &str,
    ) -> Result<ParticipantEntitiesInfo> {
        self.modify_participant(participant_gid, node_name, node_namespace, |participant, index| {
            participant.node_entities_info_seq[index]
                .writer_gid_seq
                .push(writer_gid);
        })
    }

    /// Remove the first occurrence of `writer_gid`; absent is not an error.
    pub fn dissociate_writer(
        &self,
        writer_gid: Gid,
        participant_gid: Gid,
        node_name: &str,
        node_namespace: &str,
    ) -> Result<ParticipantEntitiesInfo> {
        self.modify_participant(participant_gid, node_name, node_namespace, |participant, index| {
            remove_first(
                &mut participant.node_entities_info_seq[index].writer_gid_seq,
                &writer_gid,
            );
        })
    }

    pub fn associate_reader(
        &self,
        reader_gid: Gid,
        participant_gid: Gid,
        node_name: &str,
        node_namespace: &str,
    ) -> Result<ParticipantEntitiesInfo> {
        self.modify_participant(participant_gid, node_name, node_namespace, |participant, index| {
            participant.node_entities_info_seq[index]
                .reader_gid_seq
                .push(reader_gid);
        })
    }

    /// Remove the first occurrence of `reader_gid`; absent is not an error.
    pub fn dissociate_reader(
        &self,
        reader_gid: Gid,
        participant_gid: Gid,
        node_name: &str,
        node_namespace: &str,
    ) -> Result<ParticipantEntitiesInfo> {
        self.modify_participant(participant_gid, node_name, node_namespace, |participant, index| {
            remove_first(
                &mut participant.node_entities_info_seq[index].reader_gid_seq,
                &reader_gid,
            );
        })
    }

    fn modify_participant<F>(
        &self,
        participant_gid: Gid,
        node_name: &str,
        node_namespace: &str,
        apply: F,
    ) -> Result<ParticipantEntitiesInfo>
    where
        F: FnOnce(&mut ParticipantInfo, usize),
    {
        let mut state = self.state.lock();
        let (participant, index) = state.node_mut(participant_gid, node_name, node_namespace)?;
        apply(participant, index);
        let msg = participant.message(participant_gid);
        state.notify(GraphEvent::ParticipantChanged(participant_gid));
        Ok(msg)
    }

    // ---------------------------------------------------------------------
    // Remote update
    // ---------------------------------------------------------------------

    /// Replace a participant's node list with `msg`, creating the
    /// participant if needed. The enclave is left untouched.
    pub fn update_participant_entities(&self, msg: &ParticipantEntitiesInfo) {
        let mut state = self.state.lock();
        state
            .participants
            .entry(msg.gid)
            .or_default()
            .node_entities_info_seq = msg.node_entities_info_seq.clone();
        log::trace!(
            "[graph] participant {} now reports {} node(s)",
            msg.gid,
            msg.node_entities_info_seq.len()
        );
        state.notify(GraphEvent::ParticipantChanged(msg.gid));
    }

    // ---------------------------------------------------------------------
    // Point lookups
    // ---------------------------------------------------------------------

    pub fn writer_info(&self, gid: &Gid) -> Option<EntityInfo> {
        self.state.lock().data_writers.get(gid).cloned()
    }

    pub fn reader_info(&self, gid: &Gid) -> Option<EntityInfo> {
        self.state.lock().data_readers.get(gid).cloned()
    }

    pub fn participant_info(&self, gid: &Gid) -> Option<ParticipantInfo> {
        self.state.lock().participants.get(gid).cloned()
    }

    /// Current snapshot message of a participant, as published on
    /// `ros_discovery_info`.
    pub fn participant_entities_info(&self, gid: &Gid) -> Option<ParticipantEntitiesInfo> {
        self.state
            .lock()
            .participants
            .get(gid)
            .map(|participant| participant.message(*gid))
    }
}

fn remove_first(gids: &mut Vec<Gid>, gid: &Gid) {
    if let Some(pos) = gids.iter().position(|g| g == gid) {
        gids.remove(pos);
    }
}

impl fmt::Debug for GraphCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("GraphCache")
            .field("data_writers", &state.data_writers.len())
            .field("data_readers", &state.data_readers.len())
            .field("participants", &state.participants.len())
            .field("has_on_change_callback", &state.on_change.is_some())
            .finish()
    }
}
