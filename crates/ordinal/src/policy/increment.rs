use crate::{Error, policy::policy_key};
use core::{fmt, str::FromStr};
use serde::{Deserialize, Serialize};

/// Computes the next fresh index from the previous one and the configured
/// step. `None` means the arithmetic left the `i64` range.
pub type Advance = fn(last: i64, step: i64) -> Option<i64>;

/// Rule computing the next fresh index when nothing is reissued.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum IncrementPolicy {
    /// `last + 1`.
    #[default]
    Next,
    /// Smallest even integer strictly greater than `last`.
    NextEven,
    /// Smallest odd integer strictly greater than `last`.
    NextOdd,
    /// `last + incrementStep`.
    Step,
}

const NAMES: [(&str, IncrementPolicy); 4] = [
    ("Next", IncrementPolicy::Next),
    ("Next-Even", IncrementPolicy::NextEven),
    ("Next-Odd", IncrementPolicy::NextOdd),
    ("Step", IncrementPolicy::Step),
];

fn next(last: i64, _step: i64) -> Option<i64> {
    last.checked_add(1)
}

fn next_even(last: i64, _step: i64) -> Option<i64> {
    last.checked_add(if last.rem_euclid(2) == 0 { 2 } else { 1 })
}

fn next_odd(last: i64, _step: i64) -> Option<i64> {
    last.checked_add(if last.rem_euclid(2) == 1 { 2 } else { 1 })
}

fn step(last: i64, step: i64) -> Option<i64> {
    last.checked_add(step)
}

impl IncrementPolicy {
    /// Canonical name, as persisted and reported.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Next => "Next",
            Self::NextEven => "Next-Even",
            Self::NextOdd => "Next-Odd",
            Self::Step => "Step",
        }
    }

    /// The step function bound to this variant.
    pub const fn strategy(self) -> Advance {
        match self {
            Self::Next => next,
            Self::NextEven => next_even,
            Self::NextOdd => next_odd,
            Self::Step => step,
        }
    }

    /// Whether `index` could have been produced by this policy, i.e. whether
    /// the starting value may be issued as-is.
    pub const fn admits(self, index: i64) -> bool {
        match self {
            Self::Next | Self::Step => true,
            Self::NextEven => index.rem_euclid(2) == 0,
            Self::NextOdd => index.rem_euclid(2) == 1,
        }
    }

    /// Next fresh candidate after `last`.
    ///
    /// Before the first fresh allocation (`started == false`) `last` still
    /// holds the `begin` value, which is issued itself when the policy admits
    /// it.
    pub fn candidate(self, last: i64, step: i64, started: bool) -> Option<i64> {
        if !started && self.admits(last) {
            return Some(last);
        }
        (self.strategy())(last, step)
    }
}

impl fmt::Display for IncrementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IncrementPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = policy_key(s);
        NAMES
            .iter()
            .find(|(name, _)| policy_key(name) == key)
            .map(|(_, policy)| *policy)
            .ok_or_else(|| {
                Error::invalid_config(format!(
                    "unknown increment policy `{s}` (expected one of: Next, Next-Even, Next-Odd, Step)"
                ))
            })
    }
}

impl TryFrom<String> for IncrementPolicy {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<IncrementPolicy> for &'static str {
    fn from(policy: IncrementPolicy) -> Self {
        policy.as_str()
    }
}
