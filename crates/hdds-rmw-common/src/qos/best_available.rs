// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Resolution of `BestAvailable` QoS policies.
//!
//! A subscription adopts the strongest setting that *every* matched
//! publisher offers. A publisher offers the strongest reliability and
//! durability unconditionally (it can serve any subscription that way) and
//! tightens liveliness, deadline and lease to the most demanding
//! subscription.

use super::{DurabilityPolicy, LivelinessPolicy, QosProfile, ReliabilityPolicy};
use crate::endpoint::{EndpointType, TopicEndpointInfo};
use crate::error::Result;
use crate::time::{
    RmwTime, RMW_DURATION_INFINITE, RMW_QOS_DEADLINE_BEST_AVAILABLE, RMW_QOS_DEADLINE_DEFAULT,
    RMW_QOS_LIVELINESS_LEASE_DURATION_BEST_AVAILABLE, RMW_QOS_LIVELINESS_LEASE_DURATION_DEFAULT,
};

/// Resolve a subscription profile against the discovered publishers.
///
/// An empty publisher list counts as "all publishers agree".
pub fn best_available_for_subscription(
    publishers: &[TopicEndpointInfo],
    subscription_qos: &mut QosProfile,
) {
    let mut number_of_reliable = 0usize;
    let mut number_of_transient_local = 0usize;
    let mut number_of_manual_by_topic = 0usize;
    let mut use_default_deadline = true;
    let mut largest_deadline = RmwTime::default();
    let mut use_default_lease = true;
    let mut largest_lease = RmwTime::default();

    for info in publishers {
        let profile = &info.qos_profile;
        if profile.reliability == ReliabilityPolicy::Reliable {
            number_of_reliable += 1;
        }
        if profile.durability == DurabilityPolicy::TransientLocal {
            number_of_transient_local += 1;
        }
        if profile.liveliness == LivelinessPolicy::ManualByTopic {
            number_of_manual_by_topic += 1;
        }
        if profile.deadline != RMW_QOS_DEADLINE_DEFAULT {
            use_default_deadline = false;
            largest_deadline = largest_deadline.max(profile.deadline);
        }
        if profile.liveliness_lease_duration != RMW_QOS_LIVELINESS_LEASE_DURATION_DEFAULT {
            use_default_lease = false;
            largest_lease = largest_lease.max(profile.liveliness_lease_duration);
        }
    }

    let total = publishers.len();

    if subscription_qos.reliability == ReliabilityPolicy::BestAvailable {
        subscription_qos.reliability = if number_of_reliable == total {
            ReliabilityPolicy::Reliable
        } else {
            ReliabilityPolicy::BestEffort
        };
    }
    if subscription_qos.durability == DurabilityPolicy::BestAvailable {
        subscription_qos.durability = if number_of_transient_local == total {
            DurabilityPolicy::TransientLocal
        } else {
            DurabilityPolicy::Volatile
        };
    }
    if subscription_qos.liveliness == LivelinessPolicy::BestAvailable {
        subscription_qos.liveliness = if number_of_manual_by_topic == total {
            LivelinessPolicy::ManualByTopic
        } else {
            LivelinessPolicy::Automatic
        };
    }
    if subscription_qos.deadline == RMW_QOS_DEADLINE_BEST_AVAILABLE {
        subscription_qos.deadline = if use_default_deadline {
            RMW_QOS_DEADLINE_DEFAULT
        } else {
            largest_deadline
        };
    }
    if subscription_qos.liveliness_lease_duration == RMW_QOS_LIVELINESS_LEASE_DURATION_BEST_AVAILABLE
    {
        subscription_qos.liveliness_lease_duration = if use_default_lease {
            RMW_QOS_LIVELINESS_LEASE_DURATION_DEFAULT
        } else {
            largest_lease
        };
    }
}

/// Resolve a publisher profile against the discovered subscriptions.
pub fn best_available_for_publisher(
    subscriptions: &[TopicEndpointInfo],
    publisher_qos: &mut QosProfile,
) {
    if publisher_qos.reliability == ReliabilityPolicy::BestAvailable {
        publisher_qos.reliability = ReliabilityPolicy::Reliable;
    }
    if publisher_qos.durability == DurabilityPolicy::BestAvailable {
        publisher_qos.durability = DurabilityPolicy::TransientLocal;
    }

    let mut use_manual_by_topic = false;
    let mut use_default_deadline = true;
    let mut smallest_deadline = RMW_DURATION_INFINITE;
    let mut use_default_lease = true;
    let mut smallest_lease = RMW_DURATION_INFINITE;

    for info in subscriptions {
        let profile = &info.qos_profile;
        if profile.liveliness == LivelinessPolicy::ManualByTopic {
            use_manual_by_topic = true;
        }
        if profile.deadline != RMW_QOS_DEADLINE_DEFAULT {
            use_default_deadline = false;
            smallest_deadline = smallest_deadline.min(profile.deadline);
        }
        if profile.liveliness_lease_duration != RMW_QOS_LIVELINESS_LEASE_DURATION_DEFAULT {
            use_default_lease = false;
            smallest_lease = smallest_lease.min(profile.liveliness_lease_duration);
        }
    }

    if publisher_qos.liveliness == LivelinessPolicy::BestAvailable {
        publisher_qos.liveliness = if use_manual_by_topic {
            LivelinessPolicy::ManualByTopic
        } else {
            LivelinessPolicy::Automatic
        };
    }
    if publisher_qos.deadline == RMW_QOS_DEADLINE_BEST_AVAILABLE {
        publisher_qos.deadline = if use_default_deadline {
            RMW_QOS_DEADLINE_DEFAULT
        } else {
            smallest_deadline
        };
    }
    if publisher_qos.liveliness_lease_duration == RMW_QOS_LIVELINESS_LEASE_DURATION_BEST_AVAILABLE {
        publisher_qos.liveliness_lease_duration = if use_default_lease {
            RMW_QOS_LIVELINESS_LEASE_DURATION_DEFAULT
        } else {
            smallest_lease
        };
    }
}

/// Resolve a subscription profile for `topic_name`, fetching publishers on demand.
///
/// `fetch` is only called when the profile holds a `BestAvailable` policy;
/// it receives the endpoint kind to look up ([`EndpointType::Publisher`]).
pub fn best_available_for_topic_subscription<N, F>(
    node: &N,
    topic_name: &str,
    qos_profile: &mut QosProfile,
    fetch: F,
) -> Result<()>
where
    N: ?Sized,
    F: FnOnce(&N, &str, EndpointType) -> Result<Vec<TopicEndpointInfo>>,
{
    if !qos_profile.has_best_available_policy() {
        return Ok(());
    }
    let publishers = fetch(node, topic_name, EndpointType::Publisher)?;
    log::trace!(
        "[qos] resolving subscription on '{}' against {} publisher(s)",
        topic_name,
        publishers.len()
    );
    best_available_for_subscription(&publishers, qos_profile);
    Ok(())
}

/// Resolve a publisher profile for `topic_name`, fetching subscriptions on demand.
pub fn best_available_for_topic_publisher<N, F>(
    node: &N,
    topic_name: &str,
    qos_profile: &mut QosProfile,
    fetch: F,
) -> Result<()>
where
    N: ?Sized,
    F: FnOnce(&N, &str, EndpointType) -> Result<Vec<TopicEndpointInfo>>,
{
    if !qos_profile.has_best_available_policy() {
        return Ok(());
    }
    let subscriptions = fetch(node, topic_name, EndpointType::Subscription)?;
    log::trace!(
        "[qos] resolving publisher on '{}' against {} subscription(s)",
        topic_name,
        subscriptions.len()
    );
    best_available_for_publisher(&subscriptions, qos_profile);
    Ok(())
}

/// Replace every `BestAvailable` policy with the services default.
#[must_use]
pub fn update_best_available_for_services(qos_profile: &QosProfile) -> QosProfile {
    let defaults = QosProfile::services_default();
    let mut result = *qos_profile;
    if result.reliability == ReliabilityPolicy::BestAvailable {
        result.reliability = defaults.reliability;
    }
    if result.durability == DurabilityPolicy::BestAvailable {
        result.durability = defaults.durability;
    }
    if result.liveliness == LivelinessPolicy::BestAvailable {
        result.liveliness = defaults.liveliness;
    }
    if result.deadline == RMW_QOS_DEADLINE_BEST_AVAILABLE {
        result.deadline = defaults.deadline;
    }
    if result.liveliness_lease_duration == RMW_QOS_LIVELINESS_LEASE_DURATION_BEST_AVAILABLE {
        result.liveliness_lease_duration = defaults.liveliness_lease_duration;
    }
    result
}
