// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Publisher/subscription QoS compatibility check.
//!
//! Error rules are evaluated first and all of them contribute to the reason
//! text. Warning rules (sides whose policy is unknown or system default)
//! only run when no error was found.

use super::{DurabilityPolicy, LivelinessPolicy, QosProfile, ReliabilityPolicy};
use crate::error::{Error, Result};
use crate::time::{RMW_QOS_DEADLINE_DEFAULT, RMW_QOS_LIVELINESS_LEASE_DURATION_DEFAULT};
use std::fmt::{self, Write};

/// Verdict of a compatibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QosCompatibility {
    /// The endpoints will communicate.
    Ok,
    /// Communication depends on values this side cannot see.
    Warning,
    /// The endpoints will not communicate.
    Error,
}

/// Verdict plus the `;`-terminated reasons that led to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QosCompatibilityReport {
    pub compatibility: QosCompatibility,
    pub reason: String,
}

/// Bounded text sink behaving like a C `char[capacity]` buffer.
///
/// At most `capacity - 1` bytes are kept (one slot is the terminator); a
/// zero capacity keeps nothing. Text past the limit is dropped silently.
#[derive(Debug, Clone)]
pub struct ReasonBuffer {
    text: String,
    capacity: Option<usize>,
}

impl ReasonBuffer {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            text: String::new(),
            capacity: Some(capacity),
        }
    }

    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            text: String::new(),
            capacity: None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.text
    }

    fn remaining(&self) -> usize {
        match self.capacity {
            None => usize::MAX,
            Some(capacity) => capacity.saturating_sub(1).saturating_sub(self.text.len()),
        }
    }

    fn append(&mut self, args: fmt::Arguments<'_>) -> Result<()> {
        self.write_fmt(args)
            .map_err(|_| Error::Unexpected("failed to append to character buffer".into()))
    }
}

impl Write for ReasonBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = self.remaining();
        if s.len() <= room {
            self.text.push_str(s);
            return Ok(());
        }
        let mut cut = room;
        while cut > 0 && !s.is_char_boundary(cut) {
            cut -= 1;
        }
        self.text.push_str(&s[..cut]);
        Ok(())
    }
}

fn policy_str(value: Option<&'static str>) -> &'static str {
    value.unwrap_or("unknown")
}

/// Check compatibility collecting the full reason text.
pub fn check_compatible(
    publisher_qos: &QosProfile,
    subscription_qos: &QosProfile,
) -> Result<QosCompatibilityReport> {
    let mut reason = ReasonBuffer::unbounded();
    let compatibility = check_into(publisher_qos, subscription_qos, &mut reason)?;
    Ok(QosCompatibilityReport {
        compatibility,
        reason: reason.into_string(),
    })
}

/// Check compatibility keeping at most `reason_capacity - 1` bytes of reason.
pub fn check_compatible_with_capacity(
    publisher_qos: &QosProfile,
    subscription_qos: &QosProfile,
    reason_capacity: usize,
) -> Result<QosCompatibilityReport> {
    let mut reason = ReasonBuffer::with_capacity(reason_capacity);
    let compatibility = check_into(publisher_qos, subscription_qos, &mut reason)?;
    Ok(QosCompatibilityReport {
        compatibility,
        reason: reason.into_string(),
    })
}

/// Run the rule set, appending reasons to a caller-owned buffer.
pub fn check_into(
    pub_qos: &QosProfile,
    sub_qos: &QosProfile,
    reason: &mut ReasonBuffer,
) -> Result<QosCompatibility> {
    let mut compatibility = QosCompatibility::Ok;

    if pub_qos.reliability == ReliabilityPolicy::BestEffort
        && sub_qos.reliability == ReliabilityPolicy::Reliable
    {
        compatibility = QosCompatibility::Error;
        reason.append(format_args!(
            "ERROR: Best effort publisher and reliable subscription;"
        ))?;
    }

    if pub_qos.durability == DurabilityPolicy::Volatile
        && sub_qos.durability == DurabilityPolicy::TransientLocal
    {
        compatibility = QosCompatibility::Error;
        reason.append(format_args!(
            "ERROR: Volatile publisher and transient local subscription;"
        ))?;
    }

    let pub_deadline = pub_qos.deadline;
    let sub_deadline = sub_qos.deadline;
    if pub_deadline == RMW_QOS_DEADLINE_DEFAULT && sub_deadline != RMW_QOS_DEADLINE_DEFAULT {
        compatibility = QosCompatibility::Error;
        reason.append(format_args!(
            "ERROR: Subscription has a deadline, but publisher does not;"
        ))?;
    }
    if pub_deadline != RMW_QOS_DEADLINE_DEFAULT
        && sub_deadline != RMW_QOS_DEADLINE_DEFAULT
        && sub_deadline < pub_deadline
    {
        compatibility = QosCompatibility::Error;
        reason.append(format_args!(
            "ERROR: Subscription deadline is less than publisher deadline;"
        ))?;
    }

    if pub_qos.liveliness == LivelinessPolicy::Automatic
        && sub_qos.liveliness == LivelinessPolicy::ManualByTopic
    {
        compatibility = QosCompatibility::Error;
        reason.append(format_args!(
            "ERROR: Publisher's liveliness is automatic and subscription's is manual by topic;"
        ))?;
    }

    let pub_lease = pub_qos.liveliness_lease_duration;
    let sub_lease = sub_qos.liveliness_lease_duration;
    let lease_default = RMW_QOS_LIVELINESS_LEASE_DURATION_DEFAULT;
    if pub_lease == lease_default && sub_lease != lease_default {
        compatibility = QosCompatibility::Error;
        reason.append(format_args!(
            "ERROR: Subscription has a liveliness lease duration, but publisher does not;"
        ))?;
    }
    if pub_lease != lease_default && sub_lease != lease_default && sub_lease < pub_lease {
        compatibility = QosCompatibility::Error;
        reason.append(format_args!(
            "ERROR: Subscription liveliness lease duration is less than publisher;"
        ))?;
    }

    if compatibility == QosCompatibility::Ok {
        compatibility = check_warnings(pub_qos, sub_qos, reason)?;
    }

    Ok(compatibility)
}

fn check_warnings(
    pub_qos: &QosProfile,
    sub_qos: &QosProfile,
    reason: &mut ReasonBuffer,
) -> Result<QosCompatibility> {
    let mut compatibility = QosCompatibility::Ok;

    let pub_reliability_unknown = pub_qos.reliability.is_unknown();
    let sub_reliability_unknown = sub_qos.reliability.is_unknown();
    let pub_durability_unknown = pub_qos.durability.is_unknown();
    let sub_durability_unknown = sub_qos.durability.is_unknown();
    let pub_liveliness_unknown = pub_qos.liveliness.is_unknown();
    let sub_liveliness_unknown = sub_qos.liveliness.is_unknown();

    let pub_reliability = policy_str(pub_qos.reliability.as_str());
    let sub_reliability = policy_str(sub_qos.reliability.as_str());
    let pub_durability = policy_str(pub_qos.durability.as_str());
    let sub_durability = policy_str(sub_qos.durability.as_str());
    let pub_liveliness = policy_str(pub_qos.liveliness.as_str());
    let sub_liveliness = policy_str(sub_qos.liveliness.as_str());

    if pub_reliability_unknown && sub_reliability_unknown {
        compatibility = QosCompatibility::Warning;
        reason.append(format_args!(
            "WARNING: Publisher reliability is {} and subscription reliability is {};",
            pub_reliability, sub_reliability
        ))?;
    } else if pub_reliability_unknown && sub_qos.reliability == ReliabilityPolicy::Reliable {
        compatibility = QosCompatibility::Warning;
        reason.append(format_args!(
            "WARNING: Reliable subscription, but publisher is {};",
            pub_reliability
        ))?;
    } else if pub_qos.reliability == ReliabilityPolicy::BestEffort && sub_reliability_unknown {
        compatibility = QosCompatibility::Warning;
        reason.append(format_args!(
            "WARNING: Best effort publisher, but subscription is {};",
            sub_reliability
        ))?;
    }

    if pub_durability_unknown && sub_durability_unknown {
        compatibility = QosCompatibility::Warning;
        reason.append(format_args!(
            "WARNING: Publisher durabilty is {} and subscription durability is {};",
            pub_durability, sub_durability
        ))?;
    } else if pub_durability_unknown && sub_qos.durability == DurabilityPolicy::TransientLocal {
        compatibility = QosCompatibility::Warning;
        reason.append(format_args!(
            "WARNING: Transient local subscription, but publisher is {};",
            pub_durability
        ))?;
    } else if pub_qos.durability == DurabilityPolicy::Volatile && sub_durability_unknown {
        compatibility = QosCompatibility::Warning;
        reason.append(format_args!(
            "WARNING: Volatile publisher, but subscription is {};",
            sub_durability
        ))?;
    }

    if pub_liveliness_unknown && sub_liveliness_unknown {
        compatibility = QosCompatibility::Warning;
        reason.append(format_args!(
            "WARNING: Publisher liveliness is {} and subscription liveliness is {};",
            pub_liveliness, sub_liveliness
        ))?;
    } else if pub_liveliness_unknown && sub_qos.liveliness == LivelinessPolicy::ManualByTopic {
        compatibility = QosCompatibility::Warning;
        reason.append(format_args!(
            "WARNING: Subscription's liveliness is manual by topic, but publisher's is {};",
            pub_liveliness
        ))?;
    } else if pub_qos.liveliness == LivelinessPolicy::Automatic && sub_liveliness_unknown {
        compatibility = QosCompatibility::Warning;
        reason.append(format_args!(
            "WARNING: Publisher's liveliness is automatic, but subscription's is {};",
            sub_liveliness
        ))?;
    }

    Ok(compatibility)
}
