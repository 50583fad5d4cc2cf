use crate::{Error, IncrementPolicy, ReissuePolicy, Result};
use core::time::Duration;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Longest accepted sequence name, in bytes.
pub const MAX_NAME_LEN: usize = 128;

/// Effective configuration of one sequence, fixed at init.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceConfig {
    pub reclaim_keys: bool,
    pub reissue_policy: ReissuePolicy,
    pub index_pad: String,
    pub min_index: i64,
    pub max_index: i64,
    pub increment_policy: IncrementPolicy,
    pub increment_step: i64,
    pub require_confirm: bool,
    #[serde(with = "duration_secs")]
    pub confirm_deadline: Duration,
}

impl SequenceConfig {
    /// `maxIndex == 0` means the sequence has no upper bound.
    pub const fn is_bounded(&self) -> bool {
        self.max_index > 0
    }
}

/// An index handed out under `requireConfirm`, awaiting confirmation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub index: i64,
    /// Milliseconds since the Unix epoch.
    pub issued_at: u64,
}

/// Persisted state of one named sequence.
///
/// Each version read from the store replaces the previous one wholesale; the
/// engine never patches a record in place across requests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sequence {
    pub config: SequenceConfig,
    /// Highest index computed by increment. Holds `begin` until the first
    /// fresh allocation.
    pub last: i64,
    /// Whether any fresh index has been computed yet.
    #[serde(default)]
    pub started: bool,
    /// Returned or expired indices awaiting reissue, oldest first.
    #[serde(default)]
    pub reclaimed: VecDeque<i64>,
    /// Issued indices awaiting confirmation, oldest first.
    #[serde(default)]
    pub reserved: Vec<Reservation>,
}

impl Sequence {
    /// A freshly initialized sequence positioned at `begin`.
    pub fn new(config: SequenceConfig, begin: i64) -> Self {
        Self {
            config,
            last: begin,
            started: false,
            reclaimed: VecDeque::new(),
            reserved: Vec::new(),
        }
    }

    /// Computes the next fresh index and moves `last` onto it.
    ///
    /// Returns `None`, leaving the sequence untouched, when the candidate
    /// would pass `maxIndex` or overflow.
    pub fn advance(&mut self) -> Option<i64> {
        let config = &self.config;
        let candidate =
            config
                .increment_policy
                .candidate(self.last, config.increment_step, self.started)?;
        if config.is_bounded() && candidate > config.max_index {
            return None;
        }
        self.last = candidate;
        self.started = true;
        Some(candidate)
    }
}

/// Rejects names that cannot serve as a store key or identifier prefix.
pub fn validate_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        "must not be empty"
    } else if name.len() > MAX_NAME_LEN {
        "must be at most 128 bytes"
    } else if name.starts_with('.') {
        "must not start with '.'"
    } else if name.chars().any(|c| c == '/' || c == '\\' || c.is_control()) {
        "must not contain path separators or control characters"
    } else {
        return Ok(());
    };
    Err(Error::InvalidName {
        name: name.to_string(),
        reason,
    })
}

mod duration_secs {
    use core::time::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PolicyDefaults, SequenceConfigPatch, resolve};

    fn config(patch: SequenceConfigPatch) -> SequenceConfig {
        resolve(&patch, &PolicyDefaults::default()).unwrap()
    }

    #[test]
    fn advance_stops_at_max_without_moving_last() {
        let mut seq = Sequence::new(
            config(SequenceConfigPatch {
                min_index: Some(1),
                max_index: Some(2),
                ..Default::default()
            }),
            1,
        );
        assert_eq!(seq.advance(), Some(1));
        assert_eq!(seq.advance(), Some(2));
        assert_eq!(seq.advance(), None);
        assert_eq!(seq.advance(), None);
        assert_eq!(seq.last, 2);
    }

    #[test]
    fn persisted_form_matches_logical_schema() {
        let mut seq = Sequence::new(config(SequenceConfigPatch::default()), 0);
        seq.reclaimed.push_back(4);
        seq.reserved.push(Reservation {
            index: 5,
            issued_at: 1_000,
        });

        let value = serde_json::to_value(&seq).unwrap();
        assert_eq!(value["last"], 0);
        assert_eq!(value["reclaimed"], serde_json::json!([4]));
        assert_eq!(value["reserved"][0]["issuedAt"], 1_000);
        assert_eq!(value["config"]["reissuePolicy"], "FIFO");
        assert_eq!(value["config"]["incrementPolicy"], "Next");
        assert_eq!(value["config"]["confirmDeadline"], 3600);

        let back: Sequence = serde_json::from_value(value).unwrap();
        assert_eq!(back, seq);
    }

    #[test]
    fn missing_pools_decode_as_empty() {
        let json = r#"{
            "config": {
                "reclaimKeys": false, "reissuePolicy": "LIFO", "indexPad": "000",
                "minIndex": 0, "maxIndex": 0, "incrementPolicy": "Next-Odd",
                "incrementStep": 1, "requireConfirm": false, "confirmDeadline": 60
            },
            "last": 7
        }"#;
        let seq: Sequence = serde_json::from_str(json).unwrap();
        assert!(!seq.started);
        assert!(seq.reclaimed.is_empty());
        assert!(seq.reserved.is_empty());
        assert_eq!(seq.config.increment_policy, IncrementPolicy::NextOdd);
    }

    #[test]
    fn name_validation() {
        assert!(validate_name("INV-").is_ok());
        assert!(validate_name("orders.2025").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name(".hidden").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("a\\b").is_err());
        assert!(validate_name("tab\there").is_err());
        assert!(validate_name(&"x".repeat(MAX_NAME_LEN + 1)).is_err());
    }
}
