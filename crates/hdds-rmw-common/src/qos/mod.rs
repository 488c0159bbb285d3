// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! rmw QoS profile model.
//!
//! Unlike the DDS-side policies in HDDS, every policy here may also hold the
//! rmw sentinels `SystemDefault`, `Unknown` and (where meaningful)
//! `BestAvailable`. The cache stores these values as given; it never
//! validates them.

/// Publisher/subscription compatibility checks.
pub mod compat;
/// Resolution of `BestAvailable` policies against discovered peers.
pub mod best_available;

pub use best_available::{
    best_available_for_publisher, best_available_for_subscription,
    best_available_for_topic_publisher, best_available_for_topic_subscription,
    update_best_available_for_services,
};
pub use compat::{
    check_compatible, check_compatible_with_capacity, QosCompatibility, QosCompatibilityReport,
    ReasonBuffer,
};

use crate::time::{
    RmwTime, RMW_QOS_DEADLINE_BEST_AVAILABLE, RMW_QOS_DEADLINE_DEFAULT, RMW_QOS_LIFESPAN_DEFAULT,
    RMW_QOS_LIVELINESS_LEASE_DURATION_BEST_AVAILABLE, RMW_QOS_LIVELINESS_LEASE_DURATION_DEFAULT,
};

/// Depth value meaning "let the middleware decide".
pub const RMW_QOS_POLICY_DEPTH_SYSTEM_DEFAULT: usize = 0;

/// HISTORY policy kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HistoryPolicy {
    #[default]
    SystemDefault,
    KeepLast,
    KeepAll,
    Unknown,
}

impl HistoryPolicy {
    #[must_use]
    pub fn as_str(self) -> Option<&'static str> {
        match self {
            Self::SystemDefault => Some("system_default"),
            Self::KeepLast => Some("keep_last"),
            Self::KeepAll => Some("keep_all"),
            Self::Unknown => None,
        }
    }
}

/// RELIABILITY policy kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReliabilityPolicy {
    #[default]
    SystemDefault,
    Reliable,
    BestEffort,
    Unknown,
    BestAvailable,
}

impl ReliabilityPolicy {
    #[must_use]
    pub fn as_str(self) -> Option<&'static str> {
        match self {
            Self::SystemDefault => Some("system_default"),
            Self::Reliable => Some("reliable"),
            Self::BestEffort => Some("best_effort"),
            Self::BestAvailable => Some("best_available"),
            Self::Unknown => None,
        }
    }

    /// True for values that say nothing about the remote behaviour.
    #[must_use]
    pub fn is_unknown(self) -> bool {
        matches!(self, Self::SystemDefault | Self::Unknown)
    }
}

/// DURABILITY policy kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DurabilityPolicy {
    #[default]
    SystemDefault,
    TransientLocal,
    Volatile,
    Unknown,
    BestAvailable,
}

impl DurabilityPolicy {
    #[must_use]
    pub fn as_str(self) -> Option<&'static str> {
        match self {
            Self::SystemDefault => Some("system_default"),
            Self::TransientLocal => Some("transient_local"),
            Self::Volatile => Some("volatile"),
            Self::BestAvailable => Some("best_available"),
            Self::Unknown => None,
        }
    }

    #[must_use]
    pub fn is_unknown(self) -> bool {
        matches!(self, Self::SystemDefault | Self::Unknown)
    }
}

/// LIVELINESS policy kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LivelinessPolicy {
    #[default]
    SystemDefault,
    Automatic,
    /// Deprecated in rmw; still accepted from older peers.
    ManualByNode,
    ManualByTopic,
    Unknown,
    BestAvailable,
}

impl LivelinessPolicy {
    #[must_use]
    pub fn as_str(self) -> Option<&'static str> {
        match self {
            Self::SystemDefault => Some("system_default"),
            Self::Automatic => Some("automatic"),
            Self::ManualByNode => Some("manual_by_node"),
            Self::ManualByTopic => Some("manual_by_topic"),
            Self::BestAvailable => Some("best_available"),
            Self::Unknown => None,
        }
    }

    #[must_use]
    pub fn is_unknown(self) -> bool {
        matches!(self, Self::SystemDefault | Self::Unknown)
    }
}

/// Snapshot of an endpoint's QoS settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QosProfile {
    pub history: HistoryPolicy,
    pub depth: usize,
    pub reliability: ReliabilityPolicy,
    pub durability: DurabilityPolicy,
    pub deadline: RmwTime,
    pub lifespan: RmwTime,
    pub liveliness: LivelinessPolicy,
    pub liveliness_lease_duration: RmwTime,
    pub avoid_ros_namespace_conventions: bool,
}

impl Default for QosProfile {
    /// Default profile for ROS publishers and subscriptions.
    fn default() -> Self {
        Self {
            history: HistoryPolicy::KeepLast,
            depth: 10,
            reliability: ReliabilityPolicy::Reliable,
            durability: DurabilityPolicy::Volatile,
            deadline: RMW_QOS_DEADLINE_DEFAULT,
            lifespan: RMW_QOS_LIFESPAN_DEFAULT,
            liveliness: LivelinessPolicy::SystemDefault,
            liveliness_lease_duration: RMW_QOS_LIVELINESS_LEASE_DURATION_DEFAULT,
            avoid_ros_namespace_conventions: false,
        }
    }
}

impl QosProfile {
    /// Profile applied to service servers and clients.
    #[must_use]
    pub fn services_default() -> Self {
        Self::default()
    }

    /// Every policy deferred to the middleware.
    #[must_use]
    pub fn system_default() -> Self {
        Self {
            history: HistoryPolicy::SystemDefault,
            depth: RMW_QOS_POLICY_DEPTH_SYSTEM_DEFAULT,
            reliability: ReliabilityPolicy::SystemDefault,
            durability: DurabilityPolicy::SystemDefault,
            deadline: RMW_QOS_DEADLINE_DEFAULT,
            lifespan: RMW_QOS_LIFESPAN_DEFAULT,
            liveliness: LivelinessPolicy::SystemDefault,
            liveliness_lease_duration: RMW_QOS_LIVELINESS_LEASE_DURATION_DEFAULT,
            avoid_ros_namespace_conventions: false,
        }
    }

    /// Every negotiable policy set to `BestAvailable`.
    #[must_use]
    pub fn best_available() -> Self {
        Self {
            history: HistoryPolicy::KeepLast,
            depth: 10,
            reliability: ReliabilityPolicy::BestAvailable,
            durability: DurabilityPolicy::BestAvailable,
            deadline: RMW_QOS_DEADLINE_BEST_AVAILABLE,
            lifespan: RMW_QOS_LIFESPAN_DEFAULT,
            liveliness: LivelinessPolicy::BestAvailable,
            liveliness_lease_duration: RMW_QOS_LIVELINESS_LEASE_DURATION_BEST_AVAILABLE,
            avoid_ros_namespace_conventions: false,
        }
    }

    #[must_use]
    pub fn reliability(mut self, reliability: ReliabilityPolicy) -> Self {
        self.reliability = reliability;
        self
    }

    #[must_use]
    pub fn durability(mut self, durability: DurabilityPolicy) -> Self {
        self.durability = durability;
        self
    }

    #[must_use]
    pub fn liveliness(mut self, liveliness: LivelinessPolicy) -> Self {
        self.liveliness = liveliness;
        self
    }

    #[must_use]
    pub fn deadline(mut self, deadline: RmwTime) -> Self {
        self.deadline = deadline;
        self
    }

    #[must_use]
    pub fn liveliness_lease_duration(mut self, lease: RmwTime) -> Self {
        self.liveliness_lease_duration = lease;
        self
    }

    #[must_use]
    pub fn keep_last(mut self, depth: usize) -> Self {
        self.history = HistoryPolicy::KeepLast;
        self.depth = depth;
        self
    }

    /// True if at least one policy still needs peer-based resolution.
    #[must_use]
    pub fn has_best_available_policy(&self) -> bool {
        self.reliability == ReliabilityPolicy::BestAvailable
            || self.durability == DurabilityPolicy::BestAvailable
            || self.liveliness == LivelinessPolicy::BestAvailable
            || self.deadline == RMW_QOS_DEADLINE_BEST_AVAILABLE
            || self.liveliness_lease_duration == RMW_QOS_LIVELINESS_LEASE_DURATION_BEST_AVAILABLE
    }
}
