// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Read-only graph queries.
//!
//! Results are assembled into local containers and handed over only once
//! complete; an allocation failure returns [`Error::BadAlloc`] and drops
//! whatever was built so far.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::{EntityInfo, GraphCache, GraphState, ParticipantInfo};
use crate::endpoint::{
    EndpointCreator, EndpointType, TopicEndpointInfo, CREATED_BY_BARE_DDS_APP,
    NODE_NAMESPACE_UNKNOWN, NODE_NAME_UNKNOWN,
};
use crate::error::{Error, Result};
use crate::gid::Gid;
use crate::msg::NodeEntitiesInfo;

/// Topic name -> set of type names.
pub type NamesAndTypes = BTreeMap<String, BTreeSet<String>>;

/// Parallel node listing returned by [`GraphCache::get_node_names`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeNames {
    pub names: Vec<String>,
    pub namespaces: Vec<String>,
    /// Present only when requested.
    pub enclaves: Option<Vec<String>>,
}

impl NodeNames {
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Resolve which node created `entity_gid`, looking only at the nodes of
/// the entity's own participant.
fn find_creator<'a>(
    participants: &'a BTreeMap<Gid, ParticipantInfo>,
    participant_gid: &Gid,
    entity_gid: &Gid,
    endpoint_type: EndpointType,
) -> (EndpointCreator, Option<&'a NodeEntitiesInfo>) {
    let Some(participant) = participants.get(participant_gid) else {
        return (EndpointCreator::BareDdsParticipant, None);
    };
    let owner = participant.node_entities_info_seq.iter().find(|node| {
        node_gids(node, endpoint_type)
            .iter()
            .any(|gid| gid == entity_gid)
    });
    match owner {
        Some(node) => (EndpointCreator::RosNode, Some(node)),
        None => (EndpointCreator::UndiscoveredRosNode, None),
    }
}

fn node_gids(node: &NodeEntitiesInfo, endpoint_type: EndpointType) -> &[Gid] {
    match endpoint_type {
        EndpointType::Publisher => &node.writer_gid_seq,
        EndpointType::Subscription => &node.reader_gid_seq,
    }
}

fn find_node<'a>(
    participants: &'a BTreeMap<Gid, ParticipantInfo>,
    node_name: &str,
    node_namespace: &str,
) -> Option<&'a NodeEntitiesInfo> {
    participants
        .values()
        .flat_map(|participant| participant.node_entities_info_seq.iter())
        .find(|node| node.matches(node_name, node_namespace))
}

fn insert_name_and_type<FT, FY>(
    topics: &mut NamesAndTypes,
    info: &EntityInfo,
    demangle_topic: &FT,
    demangle_type: &FY,
) where
    FT: Fn(&str) -> String,
    FY: Fn(&str) -> String,
{
    let topic = demangle_topic(&info.topic_name);
    if topic.is_empty() {
        return;
    }
    topics
        .entry(topic)
        .or_default()
        .insert(demangle_type(&info.topic_type));
}

impl GraphState {
    fn entities_info_by_topic<F>(
        &self,
        topic_name: &str,
        demangle_type: F,
        endpoint_type: EndpointType,
    ) -> Result<Vec<TopicEndpointInfo>>
    where
        F: Fn(&str) -> String,
    {
        let entities = self.entities(endpoint_type);
        let count = entities
            .values()
            .filter(|info| info.topic_name == topic_name)
            .count();
        let mut out = Vec::new();
        if count == 0 {
            return Ok(out);
        }
        out.try_reserve_exact(count)?;

        for (gid, info) in entities {
            if info.topic_name != topic_name {
                continue;
            }
            let (creator, node) =
                find_creator(&self.participants, &info.participant_gid, gid, endpoint_type);
            let (node_name, node_namespace) = match (creator, node) {
                (EndpointCreator::RosNode, Some(node)) => {
                    (node.node_name.clone(), node.node_namespace.clone())
                }
                (EndpointCreator::BareDdsParticipant, _) => (
                    CREATED_BY_BARE_DDS_APP.to_string(),
                    CREATED_BY_BARE_DDS_APP.to_string(),
                ),
                _ => (
                    NODE_NAME_UNKNOWN.to_string(),
                    NODE_NAMESPACE_UNKNOWN.to_string(),
                ),
            };
            out.push(TopicEndpointInfo {
                node_name,
                node_namespace,
                topic_type: demangle_type(&info.topic_type),
                topic_type_hash: info.topic_type_hash,
                endpoint_type,
                endpoint_gid: *gid,
                qos_profile: info.qos,
            });
        }
        Ok(out)
    }

    fn names_and_types_by_node<FT, FY>(
        &self,
        node_name: &str,
        node_namespace: &str,
        demangle_topic: FT,
        demangle_type: FY,
        endpoint_type: EndpointType,
    ) -> Result<NamesAndTypes>
    where
        FT: Fn(&str) -> String,
        FY: Fn(&str) -> String,
    {
        let node = find_node(&self.participants, node_name, node_namespace).ok_or_else(|| {
            Error::NodeNameNonExistent {
                name: node_name.to_string(),
                namespace: node_namespace.to_string(),
            }
        })?;
        let entities = self.entities(endpoint_type);
        let mut topics = NamesAndTypes::new();
        // Associated but not (yet) discovered gids are skipped.
        for info in node_gids(node, endpoint_type)
            .iter()
            .filter_map(|gid| entities.get(gid))
        {
            insert_name_and_type(&mut topics, info, &demangle_topic, &demangle_type);
        }
        Ok(topics)
    }

    fn count_on_topic(&self, topic_name: &str, endpoint_type: EndpointType) -> usize {
        self.entities(endpoint_type)
            .values()
            .filter(|info| info.topic_name == topic_name)
            .count()
    }

    fn number_of_nodes(&self) -> usize {
        self.participants
            .values()
            .map(|participant| participant.node_entities_info_seq.len())
            .sum()
    }
}

impl GraphCache {
    /// Descriptors of every writer on `topic_name`, ascending by gid.
    ///
    /// The topic is matched verbatim; only the type name goes through
    /// `demangle_type`.
    pub fn get_writers_info_by_topic<F>(
        &self,
        topic_name: &str,
        demangle_type: F,
    ) -> Result<Vec<TopicEndpointInfo>>
    where
        F: Fn(&str) -> String,
    {
        self.state
            .lock()
            .entities_info_by_topic(topic_name, demangle_type, EndpointType::Publisher)
    }

    /// Reader twin of [`GraphCache::get_writers_info_by_topic`].
    pub fn get_readers_info_by_topic<F>(
        &self,
        topic_name: &str,
        demangle_type: F,
    ) -> Result<Vec<TopicEndpointInfo>>
    where
        F: Fn(&str) -> String,
    {
        self.state
            .lock()
            .entities_info_by_topic(topic_name, demangle_type, EndpointType::Subscription)
    }

    /// Every topic seen on a reader or writer with its set of types.
    ///
    /// Topics for which `demangle_topic` returns an empty string are left out.
    pub fn get_names_and_types<FT, FY>(
        &self,
        demangle_topic: FT,
        demangle_type: FY,
    ) -> Result<NamesAndTypes>
    where
        FT: Fn(&str) -> String,
        FY: Fn(&str) -> String,
    {
        let state = self.state.lock();
        let mut topics = NamesAndTypes::new();
        for info in state.data_readers.values().chain(state.data_writers.values()) {
            insert_name_and_type(&mut topics, info, &demangle_topic, &demangle_type);
        }
        Ok(topics)
    }

    /// Topics published by the first node named (`node_name`, `node_namespace`).
    pub fn get_writer_names_and_types_by_node<FT, FY>(
        &self,
        node_name: &str,
        node_namespace: &str,
        demangle_topic: FT,
        demangle_type: FY,
    ) -> Result<NamesAndTypes>
    where
        FT: Fn(&str) -> String,
        FY: Fn(&str) -> String,
    {
        self.state.lock().names_and_types_by_node(
            node_name,
            node_namespace,
            demangle_topic,
            demangle_type,
            EndpointType::Publisher,
        )
    }

    /// Topics subscribed by the first node named (`node_name`, `node_namespace`).
    pub fn get_reader_names_and_types_by_node<FT, FY>(
        &self,
        node_name: &str,
        node_namespace: &str,
        demangle_topic: FT,
        demangle_type: FY,
    ) -> Result<NamesAndTypes>
    where
        FT: Fn(&str) -> String,
        FY: Fn(&str) -> String,
    {
        self.state.lock().names_and_types_by_node(
            node_name,
            node_namespace,
            demangle_topic,
            demangle_type,
            EndpointType::Subscription,
        )
    }

    pub fn get_number_of_nodes(&self) -> usize {
        self.state.lock().number_of_nodes()
    }

    /// All nodes, participant by participant, in node-creation order.
    pub fn get_node_names(&self, with_enclaves: bool) -> Result<NodeNames> {
        let state = self.state.lock();
        let count = state.number_of_nodes();

        let mut names = Vec::new();
        names.try_reserve_exact(count)?;
        let mut namespaces = Vec::new();
        namespaces.try_reserve_exact(count)?;
        let mut enclaves = if with_enclaves {
            let mut v = Vec::new();
            v.try_reserve_exact(count)?;
            Some(v)
        } else {
            None
        };

        for participant in state.participants.values() {
            for node in &participant.node_entities_info_seq {
                names.push(node.node_name.clone());
                namespaces.push(node.node_namespace.clone());
                if let Some(enclaves) = enclaves.as_mut() {
                    enclaves.push(participant.enclave.clone());
                }
            }
        }
        Ok(NodeNames {
            names,
            namespaces,
            enclaves,
        })
    }

    /// Number of writers on exactly `topic_name`.
    pub fn get_writer_count(&self, topic_name: &str) -> usize {
        self.state
            .lock()
            .count_on_topic(topic_name, EndpointType::Publisher)
    }

    /// Number of readers on exactly `topic_name`.
    pub fn get_reader_count(&self, topic_name: &str) -> usize {
        self.state
            .lock()
            .count_on_topic(topic_name, EndpointType::Subscription)
    }
}

fn write_gid_list(f: &mut fmt::Formatter<'_>, title: &str, gids: &[Gid]) -> fmt::Result {
    writeln!(f, "      associated data {} gids:", title)?;
    for gid in gids {
        writeln!(f, "        {}", gid)?;
    }
    Ok(())
}

/// Human-readable dump of the whole cache.
impl fmt::Display for GraphCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        writeln!(f, "---------------------------------")?;
        writeln!(f, "Graph cache:")?;
        for (title, entities) in [
            ("writers", &state.data_writers),
            ("readers", &state.data_readers),
        ] {
            writeln!(f, "  Discovered data {}:", title)?;
            for (gid, info) in entities {
                writeln!(
                    f,
                    "    gid: '{}', topic name: '{}', topic_type: '{}'",
                    gid, info.topic_name, info.topic_type
                )?;
            }
        }
        writeln!(f, "  Discovered participants:")?;
        for (gid, participant) in &state.participants {
            writeln!(f, "    gid: '{}'", gid)?;
            writeln!(f, "    enclave name '{}'", participant.enclave)?;
            writeln!(f, "    nodes:")?;
            for node in &participant.node_entities_info_seq {
                writeln!(
                    f,
                    "      namespace: '{}' name: '{}'",
                    node.node_namespace, node.node_name
                )?;
                write_gid_list(f, "readers", &node.reader_gid_seq)?;
                write_gid_list(f, "writers", &node.writer_gid_seq)?;
            }
        }
        writeln!(f, "---------------------------------")
    }
}
