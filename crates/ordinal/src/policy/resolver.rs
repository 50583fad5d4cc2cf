use crate::{Error, IncrementPolicy, ReissuePolicy, Result, SequenceConfig};
use core::time::Duration;
use serde::{Deserialize, Serialize};

/// Default `reclaimKeys`.
pub const DEFAULT_RECLAIM_KEYS: bool = false;
/// Default `indexPad` (width 1, i.e. no padding).
pub const DEFAULT_INDEX_PAD: &str = "0";
/// Default `minIndex`.
pub const DEFAULT_MIN_INDEX: i64 = 0;
/// Default `maxIndex` (`0` means unbounded).
pub const DEFAULT_MAX_INDEX: i64 = 0;
/// Default `incrementStep`.
pub const DEFAULT_INCREMENT_STEP: i64 = 1;
/// Default `requireConfirm`.
pub const DEFAULT_REQUIRE_CONFIRM: bool = false;
/// Default `confirmDeadline`.
pub const DEFAULT_CONFIRM_DEADLINE: Duration = Duration::from_secs(3600);

/// Process-wide fallback values for fields a caller leaves out at init.
///
/// Passed explicitly into [`resolve`] so resolution stays a pure function of
/// its inputs. [`Default`] yields the documented constants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyDefaults {
    pub reclaim_keys: bool,
    pub reissue_policy: ReissuePolicy,
    pub index_pad: String,
    pub min_index: i64,
    pub max_index: i64,
    pub increment_policy: IncrementPolicy,
    pub increment_step: i64,
    pub require_confirm: bool,
    pub confirm_deadline: Duration,
}

impl Default for PolicyDefaults {
    fn default() -> Self {
        Self {
            reclaim_keys: DEFAULT_RECLAIM_KEYS,
            reissue_policy: ReissuePolicy::Fifo,
            index_pad: DEFAULT_INDEX_PAD.to_string(),
            min_index: DEFAULT_MIN_INDEX,
            max_index: DEFAULT_MAX_INDEX,
            increment_policy: IncrementPolicy::Next,
            increment_step: DEFAULT_INCREMENT_STEP,
            require_confirm: DEFAULT_REQUIRE_CONFIRM,
            confirm_deadline: DEFAULT_CONFIRM_DEADLINE,
        }
    }
}

/// Caller-supplied, possibly partial sequence configuration.
///
/// Policy names stay strings here so an unknown name surfaces as
/// [`Error::InvalidConfig`] from [`resolve`] rather than as a decode error.
/// `confirmDeadline` is given in whole seconds. Unknown keys are rejected.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct SequenceConfigPatch {
    pub reclaim_keys: Option<bool>,
    pub reissue_policy: Option<String>,
    pub index_pad: Option<String>,
    pub min_index: Option<i64>,
    pub max_index: Option<i64>,
    pub increment_policy: Option<String>,
    pub increment_step: Option<i64>,
    pub require_confirm: Option<bool>,
    pub confirm_deadline: Option<u64>,
}

/// Absent and empty strings both fall back to the default.
fn supplied(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.trim().is_empty())
}

/// Absent and zero numbers both fall back to the default.
fn nonzero<N: Copy + Default + PartialEq>(value: Option<N>) -> Option<N> {
    value.filter(|v| *v != N::default())
}

/// Merges `patch` over `defaults` and validates the result.
///
/// # Errors
///
/// [`Error::InvalidConfig`] when a policy name is unknown, the pad is not a
/// non-empty digit string, `incrementStep` is negative under
/// [`IncrementPolicy::Step`], `maxIndex` is negative, or a bounded `maxIndex`
/// lies below `minIndex`.
///
/// A zero `incrementStep` or `confirmDeadline` counts as unset and takes the
/// default, as do absent fields and empty strings. `minIndex`, `maxIndex` and
/// the booleans are taken as given, since zero and `false` are their
/// defaults anyway.
///
/// # Example
///
/// ```
/// use ordinal::{IncrementPolicy, PolicyDefaults, SequenceConfigPatch, resolve};
///
/// let patch = SequenceConfigPatch {
///     increment_policy: Some("Next-Even".into()),
///     ..Default::default()
/// };
/// let config = resolve(&patch, &PolicyDefaults::default()).unwrap();
/// assert_eq!(config.increment_policy, IncrementPolicy::NextEven);
/// assert_eq!(config.index_pad, "0");
/// ```
pub fn resolve(patch: &SequenceConfigPatch, defaults: &PolicyDefaults) -> Result<SequenceConfig> {
    let reissue_policy = match supplied(patch.reissue_policy.as_ref()) {
        Some(name) => name.parse()?,
        None => defaults.reissue_policy,
    };
    let increment_policy = match supplied(patch.increment_policy.as_ref()) {
        Some(name) => name.parse()?,
        None => defaults.increment_policy,
    };

    let config = SequenceConfig {
        reclaim_keys: patch.reclaim_keys.unwrap_or(defaults.reclaim_keys),
        reissue_policy,
        index_pad: supplied(patch.index_pad.as_ref())
            .map_or_else(|| defaults.index_pad.clone(), str::to_string),
        min_index: patch.min_index.unwrap_or(defaults.min_index),
        max_index: patch.max_index.unwrap_or(defaults.max_index),
        increment_policy,
        increment_step: nonzero(patch.increment_step).unwrap_or(defaults.increment_step),
        require_confirm: patch.require_confirm.unwrap_or(defaults.require_confirm),
        confirm_deadline: nonzero(patch.confirm_deadline)
            .map_or(defaults.confirm_deadline, Duration::from_secs),
    };

    config.validate()?;
    Ok(config)
}

impl SequenceConfig {
    /// Checks the bound, step and pad rules.
    pub fn validate(&self) -> Result<()> {
        if self.index_pad.is_empty() || !self.index_pad.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::invalid_config(format!(
                "indexPad `{}` must be a non-empty digit string",
                self.index_pad
            )));
        }
        if self.increment_policy == IncrementPolicy::Step && self.increment_step <= 0 {
            return Err(Error::invalid_config(format!(
                "incrementStep must be positive under Step, got {}",
                self.increment_step
            )));
        }
        if self.confirm_deadline.is_zero() {
            return Err(Error::invalid_config("confirmDeadline must be positive"));
        }
        if self.max_index < 0 {
            return Err(Error::invalid_config(format!(
                "maxIndex must be 0 (unbounded) or positive, got {}",
                self.max_index
            )));
        }
        if self.is_bounded() && self.max_index < self.min_index {
            return Err(Error::invalid_config(format!(
                "maxIndex {} is below minIndex {}",
                self.max_index, self.min_index
            )));
        }
        Ok(())
    }

    /// Checks that `begin` lies within `[minIndex, maxIndex]`.
    pub fn check_begin(&self, begin: i64) -> Result<()> {
        if begin < self.min_index {
            return Err(Error::invalid_config(format!(
                "begin {begin} is below minIndex {}",
                self.min_index
            )));
        }
        if self.is_bounded() && begin > self.max_index {
            return Err(Error::invalid_config(format!(
                "begin {begin} is above maxIndex {}",
                self.max_index
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve_default(patch: SequenceConfigPatch) -> Result<SequenceConfig> {
        resolve(&patch, &PolicyDefaults::default())
    }

    #[test]
    fn empty_patch_yields_documented_defaults() {
        let config = resolve_default(SequenceConfigPatch::default()).unwrap();
        assert!(!config.reclaim_keys);
        assert_eq!(config.reissue_policy, ReissuePolicy::Fifo);
        assert_eq!(config.index_pad, "0");
        assert_eq!(config.min_index, 0);
        assert_eq!(config.max_index, 0);
        assert_eq!(config.increment_policy, IncrementPolicy::Next);
        assert_eq!(config.increment_step, 1);
        assert!(!config.require_confirm);
        assert_eq!(config.confirm_deadline, Duration::from_secs(3600));
    }

    #[test]
    fn supplied_fields_override_defaults() {
        let config = resolve_default(SequenceConfigPatch {
            reclaim_keys: Some(true),
            reissue_policy: Some("LIFO".into()),
            index_pad: Some("00000".into()),
            min_index: Some(10),
            max_index: Some(99),
            increment_policy: Some("Step".into()),
            increment_step: Some(3),
            require_confirm: Some(true),
            confirm_deadline: Some(10),
        })
        .unwrap();
        assert!(config.reclaim_keys);
        assert_eq!(config.reissue_policy, ReissuePolicy::Lifo);
        assert_eq!(config.index_pad, "00000");
        assert_eq!((config.min_index, config.max_index), (10, 99));
        assert_eq!(config.increment_policy, IncrementPolicy::Step);
        assert_eq!(config.increment_step, 3);
        assert!(config.require_confirm);
        assert_eq!(config.confirm_deadline, Duration::from_secs(10));
    }

    #[test]
    fn empty_strings_fall_back_to_defaults() {
        let config = resolve_default(SequenceConfigPatch {
            reissue_policy: Some(String::new()),
            index_pad: Some(String::new()),
            increment_policy: Some("  ".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(config.reissue_policy, ReissuePolicy::Fifo);
        assert_eq!(config.index_pad, "0");
        assert_eq!(config.increment_policy, IncrementPolicy::Next);
    }

    #[test]
    fn defaults_are_taken_from_the_supplied_value() {
        let defaults = PolicyDefaults {
            reissue_policy: ReissuePolicy::HighestFirst,
            index_pad: "000".into(),
            ..Default::default()
        };
        let config = resolve(&SequenceConfigPatch::default(), &defaults).unwrap();
        assert_eq!(config.reissue_policy, ReissuePolicy::HighestFirst);
        assert_eq!(config.index_pad, "000");
    }

    #[test]
    fn rejects_unknown_policy_names() {
        let err = resolve_default(SequenceConfigPatch {
            reissue_policy: Some("Oldest".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));

        let err = resolve_default(SequenceConfigPatch {
            increment_policy: Some("Skip".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn zero_numbers_fall_back_to_defaults() {
        let config = resolve_default(SequenceConfigPatch {
            increment_policy: Some("Step".into()),
            increment_step: Some(0),
            require_confirm: Some(true),
            confirm_deadline: Some(0),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(config.increment_step, DEFAULT_INCREMENT_STEP);
        assert_eq!(config.confirm_deadline, DEFAULT_CONFIRM_DEADLINE);

        let defaults = PolicyDefaults {
            increment_step: 4,
            confirm_deadline: Duration::from_secs(90),
            ..Default::default()
        };
        let config = resolve(
            &SequenceConfigPatch {
                increment_step: Some(0),
                confirm_deadline: Some(0),
                ..Default::default()
            },
            &defaults,
        )
        .unwrap();
        assert_eq!(config.increment_step, 4);
        assert_eq!(config.confirm_deadline, Duration::from_secs(90));
    }

    #[test]
    fn rejects_negative_step_only_under_step() {
        let err = resolve_default(SequenceConfigPatch {
            increment_policy: Some("Step".into()),
            increment_step: Some(-2),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));

        assert!(
            resolve_default(SequenceConfigPatch {
                increment_step: Some(-2),
                ..Default::default()
            })
            .is_ok()
        );
    }

    #[test]
    fn rejects_zero_defaults() {
        let defaults = PolicyDefaults {
            confirm_deadline: Duration::ZERO,
            ..Default::default()
        };
        assert!(resolve(&SequenceConfigPatch::default(), &defaults).is_err());

        let defaults = PolicyDefaults {
            increment_policy: IncrementPolicy::Step,
            increment_step: 0,
            ..Default::default()
        };
        assert!(resolve(&SequenceConfigPatch::default(), &defaults).is_err());
    }

    #[test]
    fn rejects_inverted_and_negative_bounds() {
        let err = resolve_default(SequenceConfigPatch {
            min_index: Some(10),
            max_index: Some(5),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));

        assert!(
            resolve_default(SequenceConfigPatch {
                max_index: Some(-1),
                ..Default::default()
            })
            .is_err()
        );

        // maxIndex 0 is unbounded regardless of minIndex
        assert!(
            resolve_default(SequenceConfigPatch {
                min_index: Some(100),
                ..Default::default()
            })
            .is_ok()
        );
    }

    #[test]
    fn rejects_non_digit_pad() {
        let err = resolve_default(SequenceConfigPatch {
            index_pad: Some("xx".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn begin_must_lie_within_bounds() {
        let config = resolve_default(SequenceConfigPatch {
            min_index: Some(1),
            max_index: Some(10),
            ..Default::default()
        })
        .unwrap();
        assert!(config.check_begin(1).is_ok());
        assert!(config.check_begin(10).is_ok());
        assert!(config.check_begin(0).is_err());
        assert!(config.check_begin(11).is_err());
    }

    #[test]
    fn patch_decodes_from_camel_case_json() {
        let patch: SequenceConfigPatch = serde_json::from_str(
            r#"{"reclaimKeys":true,"reissuePolicy":"Lowest-First","confirmDeadline":30}"#,
        )
        .unwrap();
        assert_eq!(patch.reclaim_keys, Some(true));
        assert_eq!(patch.reissue_policy.as_deref(), Some("Lowest-First"));
        assert_eq!(patch.confirm_deadline, Some(30));
        assert_eq!(patch.min_index, None);
    }

    #[test]
    fn patch_rejects_unknown_keys() {
        let err = serde_json::from_str::<SequenceConfigPatch>(r#"{"incrementstep":5}"#);
        assert!(err.is_err());
    }
}
