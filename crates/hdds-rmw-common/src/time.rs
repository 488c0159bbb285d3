// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! rmw-style durations and the DDS time clamp.

use std::cmp::Ordering;
use std::fmt;

const NSEC_PER_SEC: u64 = 1_000_000_000;

/// Duration expressed as seconds + nanoseconds, as carried by QoS profiles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RmwTime {
    pub sec: u64,
    pub nsec: u64,
}

impl RmwTime {
    #[must_use]
    pub const fn new(sec: u64, nsec: u64) -> Self {
        Self { sec, nsec }
    }

    #[must_use]
    pub const fn from_secs(sec: u64) -> Self {
        Self { sec, nsec: 0 }
    }

    #[must_use]
    pub const fn from_millis(ms: u64) -> Self {
        Self {
            sec: ms / 1000,
            nsec: (ms % 1000) * 1_000_000,
        }
    }

    #[must_use]
    pub const fn is_unspecified(&self) -> bool {
        self.sec == 0 && self.nsec == 0
    }
}

impl PartialOrd for RmwTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RmwTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sec
            .cmp(&other.sec)
            .then_with(|| self.nsec.cmp(&other.nsec))
    }
}

impl From<std::time::Duration> for RmwTime {
    fn from(d: std::time::Duration) -> Self {
        Self {
            sec: d.as_secs(),
            nsec: u64::from(d.subsec_nanos()),
        }
    }
}

impl fmt::Display for RmwTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s {}ns", self.sec, self.nsec)
    }
}

/// Zero duration; QoS durations use it to mean "use the default".
pub const RMW_DURATION_UNSPECIFIED: RmwTime = RmwTime::new(0, 0);
/// Largest representable duration (`i64::MAX` nanoseconds).
pub const RMW_DURATION_INFINITE: RmwTime = RmwTime::new(9_223_372_036, 854_775_807);

pub const RMW_QOS_DEADLINE_DEFAULT: RmwTime = RMW_DURATION_UNSPECIFIED;
pub const RMW_QOS_DEADLINE_BEST_AVAILABLE: RmwTime = RmwTime::new(9_223_372_036, 854_775_806);
pub const RMW_QOS_LIFESPAN_DEFAULT: RmwTime = RMW_DURATION_UNSPECIFIED;
pub const RMW_QOS_LIVELINESS_LEASE_DURATION_DEFAULT: RmwTime = RMW_DURATION_UNSPECIFIED;
pub const RMW_QOS_LIVELINESS_LEASE_DURATION_BEST_AVAILABLE: RmwTime =
    RmwTime::new(9_223_372_036, 854_775_806);

/// Clamp an rmw duration to what a DDS `Duration_t` (i32 sec, u32 nsec) can hold.
///
/// Whole seconds hidden in `nsec` are carried into `sec`. On overflow the
/// result saturates at `i32::MAX` seconds and `10^9 - 1` nanoseconds.
#[must_use]
pub fn clamp_rmw_time_to_dds_time(time: &RmwTime) -> RmwTime {
    let int_max = i32::MAX as u64;
    let mut t = *time;

    let mut ns_sec_adjust = t.nsec / NSEC_PER_SEC;
    let mut overflow_nsec = false;
    if ns_sec_adjust > int_max {
        ns_sec_adjust = int_max;
        overflow_nsec = true;
    }

    let mut overflow_sec = false;
    if t.sec > int_max - ns_sec_adjust {
        t.sec = int_max;
        overflow_sec = true;
    } else {
        t.sec += ns_sec_adjust;
    }

    if overflow_nsec || overflow_sec {
        t.nsec = NSEC_PER_SEC - 1;
        log::debug!(
            "[time] rmw_time_t length cannot be represented by DDS, truncated at \
             INT_MAX seconds + (10^9 - 1) nanoseconds"
        );
    } else {
        t.nsec -= ns_sec_adjust * NSEC_PER_SEC;
    }
    t
}
