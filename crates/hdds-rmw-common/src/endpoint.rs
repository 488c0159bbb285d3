// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Externally visible descriptor of a discovered publisher or subscription.

use crate::gid::Gid;
use crate::qos::QosProfile;
use crate::type_hash::TypeHash;

/// Publisher or subscription side of a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EndpointType {
    Publisher,
    Subscription,
}

impl EndpointType {
    #[must_use]
    pub fn is_reader(self) -> bool {
        self == Self::Subscription
    }
}

/// Who created an endpoint, as far as the graph cache can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointCreator {
    /// A node of a known participant lists the endpoint.
    RosNode,
    /// The participant is known but none of its nodes lists the endpoint (yet).
    UndiscoveredRosNode,
    /// The participant never announced itself through the ROS graph.
    BareDdsParticipant,
}

pub const NODE_NAME_UNKNOWN: &str = "_NODE_NAME_UNKNOWN_";
pub const NODE_NAMESPACE_UNKNOWN: &str = "_NODE_NAMESPACE_UNKNOWN_";
pub const CREATED_BY_BARE_DDS_APP: &str = "_CREATED_BY_BARE_DDS_APP_";

/// One entry of `get_{writers,readers}_info_by_topic`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TopicEndpointInfo {
    pub node_name: String,
    pub node_namespace: String,
    pub topic_type: String,
    pub topic_type_hash: TypeHash,
    pub endpoint_type: EndpointType,
    pub endpoint_gid: Gid,
    pub qos_profile: QosProfile,
}

impl TopicEndpointInfo {
    /// Descriptor carrying only a QoS profile; used when negotiating QoS
    /// against peers that are not tracked in a graph cache.
    #[must_use]
    pub fn with_qos(endpoint_type: EndpointType, qos_profile: QosProfile) -> Self {
        Self {
            node_name: String::new(),
            node_namespace: String::new(),
            topic_type: String::new(),
            topic_type_hash: TypeHash::zero(),
            endpoint_type,
            endpoint_gid: Gid::default(),
            qos_profile,
        }
    }
}
