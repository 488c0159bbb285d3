// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # hdds-rmw-common
//!
//! Middleware-agnostic pieces shared by ROS 2 rmw layers built on HDDS.
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------+
//! |  rmw layer (node / publisher / subscription lifecycle)        |
//! +---------------------------------------------------------------+
//!        |  add_node / associate_*            ^ graph queries
//!        v                                    |
//! +---------------------------------------------------------------+
//! |  Context  --publish-->  ros_discovery_info  --listener-->     |
//! |     |                                            |            |
//! |     +-------------->  GraphCache  <--------------+            |
//! |                    (writers, readers, participants)           |
//! +---------------------------------------------------------------+
//! |  QoS: compatibility check | BEST_AVAILABLE resolution         |
//! |  Codecs: ParticipantEntitiesInfo CDR | RIHS type hash          |
//! +---------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`GraphCache`] | Thread-safe view of writers, readers, participants and nodes |
//! | [`Context`] | One participant's cache plus `ros_discovery_info` plumbing |
//! | [`ParticipantEntitiesInfo`] | Snapshot message exchanged between participants |
//! | [`QosProfile`] | rmw QoS settings, including `BestAvailable` sentinels |
//! | [`TypeHash`] | Versioned type description hash (`RIHS01_...`) |
//!
//! ## Quick Start
//!
//! ```rust
//! use hdds_rmw_common::{EndpointType, Gid, GraphCache, QosProfile, TypeHash};
//!
//! let cache = GraphCache::new();
//! let participant = Gid::new([1; 16]);
//! let writer = Gid::new([2; 16]);
//!
//! cache.add_participant(participant, "/");
//! cache.add_node(participant, "talker", "/").unwrap();
//! cache.add_writer(writer, "rt/chatter", "std_msgs::msg::dds_::String_",
//!                  TypeHash::zero(), participant, QosProfile::default());
//! cache.associate_writer(writer, participant, "talker", "/").unwrap();
//!
//! let infos = cache.get_writers_info_by_topic("rt/chatter", |t| t.to_string()).unwrap();
//! assert_eq!(infos[0].node_name, "talker");
//! assert_eq!(infos[0].endpoint_type, EndpointType::Publisher);
//! ```

#![deny(unsafe_code)]

pub mod context;
pub mod endpoint;
pub mod env_config;
pub mod error;
pub mod gid;
pub mod graph;
pub mod msg;
pub mod qos;
pub mod security;
pub mod time;
pub mod type_hash;

pub use context::{CdrChannelPublisher, Context, GraphGuard, ParticipantInfoPublisher};
pub use endpoint::{EndpointCreator, EndpointType, TopicEndpointInfo};
pub use env_config::{EnvConfig, SecurityEnvConfig, SecurityStrategy};
pub use error::{Error, Result};
pub use gid::{Gid, RMW_GID_STORAGE_SIZE};
pub use graph::{
    EntityInfo, GraphCache, GraphEvent, NamesAndTypes, NodeNames, ParticipantInfo,
    GRAPH_EVENT_QUEUE_DEPTH,
};
pub use msg::{NodeEntitiesInfo, ParticipantEntitiesInfo};
pub use qos::{
    DurabilityPolicy, HistoryPolicy, LivelinessPolicy, QosCompatibility, QosCompatibilityReport,
    QosProfile, ReliabilityPolicy,
};
pub use security::get_security_files;
pub use time::RmwTime;
pub use type_hash::TypeHash;
