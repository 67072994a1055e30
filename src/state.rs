//! # State Store
//! Last-write-wins state for the fixed feed set: the latest reading per feed
//! plus a global "last updated" timestamp. Updates either replace a feed's
//! value wholesale or are rejected without touching anything; there is no
//! merging and no error path.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::feed::Feed;
use crate::reading::OuReading;

/// Latest accepted reading for one feed.
#[derive(Debug, Clone, Serialize)]
pub struct FeedValue {
    pub ou: OuReading,
    pub updated: Option<DateTime<Utc>>,
}

/// The whole current state: one entry per known feed, always exactly the
/// fixed set, plus the global last-update timestamp.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub updated: DateTime<Utc>,
    pub values: BTreeMap<Feed, FeedValue>,
}

/// What a single update attempt decided. Carries everything the event log
/// needs to record the attempt, accepted or not.
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    /// Normalized feed name, possibly unknown or empty.
    pub feed: String,
    pub ou: OuReading,
    pub accepted: bool,
}

#[derive(Debug)]
pub struct StateStore {
    snapshot: Snapshot,
}

impl StateStore {
    /// Fresh store: every known feed at zero, no per-feed timestamps yet.
    pub fn new(now: DateTime<Utc>) -> Self {
        let values = Feed::ALL
            .iter()
            .map(|&f| {
                (
                    f,
                    FeedValue {
                        ou: OuReading::Number(0.0),
                        updated: None,
                    },
                )
            })
            .collect();
        Self {
            snapshot: Snapshot { updated: now, values },
        }
    }

    /// Apply one update attempt. `raw_value` is `None` when the producer sent
    /// no value at all, which coerces to the invalid sentinel.
    ///
    /// Accepted iff the normalized feed name is in the fixed set; acceptance
    /// replaces that feed's value and advances the global timestamp.
    /// Rejection mutates nothing. Never errors.
    pub fn apply_update(
        &mut self,
        raw_feed: &str,
        raw_value: Option<&Value>,
        now: DateTime<Utc>,
    ) -> ApplyOutcome {
        let feed = Feed::normalize(raw_feed);
        let ou = match raw_value {
            Some(v) => OuReading::coerce(v),
            None => OuReading::Invalid,
        };

        match Feed::from_normalized(&feed) {
            Some(known) => {
                self.snapshot.values.insert(
                    known,
                    FeedValue {
                        ou,
                        updated: Some(now),
                    },
                );
                self.snapshot.updated = now;
                ApplyOutcome {
                    feed,
                    ou,
                    accepted: true,
                }
            }
            None => ApplyOutcome {
                feed,
                ou,
                accepted: false,
            },
        }
    }

    /// Advance the global timestamp without touching any feed value.
    ///
    /// Bulk requests do this once per request, regardless of per-pair
    /// outcomes, matching the long-observed behavior of this service.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.snapshot.updated = now;
    }

    /// Copy of the current state; callers never see the live structure.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.clone()
    }
}
