use crate::{Error, RandSource, policy::policy_key};
use core::{fmt, str::FromStr};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Chooses the position in a non-empty reclaim pool to hand out next.
pub type Selector = fn(pool: &VecDeque<i64>, rand: &dyn RandSource) -> usize;

/// Rule selecting which pooled index is reissued.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum ReissuePolicy {
    /// Earliest inserted (head of the pool).
    #[default]
    Fifo,
    /// Most recently inserted (tail of the pool).
    Lifo,
    /// Numerically smallest.
    LowestFirst,
    /// Numerically largest.
    HighestFirst,
    /// Uniformly chosen.
    Random,
}

const NAMES: [(&str, ReissuePolicy); 5] = [
    ("FIFO", ReissuePolicy::Fifo),
    ("LIFO", ReissuePolicy::Lifo),
    ("Lowest-First", ReissuePolicy::LowestFirst),
    ("Highest-First", ReissuePolicy::HighestFirst),
    ("Random", ReissuePolicy::Random),
];

fn head(_pool: &VecDeque<i64>, _rand: &dyn RandSource) -> usize {
    0
}

fn tail(pool: &VecDeque<i64>, _rand: &dyn RandSource) -> usize {
    pool.len() - 1
}

fn lowest(pool: &VecDeque<i64>, _rand: &dyn RandSource) -> usize {
    pool.iter()
        .enumerate()
        .min_by_key(|(_, index)| **index)
        .map_or(0, |(pos, _)| pos)
}

fn highest(pool: &VecDeque<i64>, _rand: &dyn RandSource) -> usize {
    pool.iter()
        .enumerate()
        .max_by_key(|(_, index)| **index)
        .map_or(0, |(pos, _)| pos)
}

fn random(pool: &VecDeque<i64>, rand: &dyn RandSource) -> usize {
    rand.pick(pool.len())
}

impl ReissuePolicy {
    /// Canonical name, as persisted and reported.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fifo => "FIFO",
            Self::Lifo => "LIFO",
            Self::LowestFirst => "Lowest-First",
            Self::HighestFirst => "Highest-First",
            Self::Random => "Random",
        }
    }

    /// The selector bound to this variant.
    pub const fn selector(self) -> Selector {
        match self {
            Self::Fifo => head,
            Self::Lifo => tail,
            Self::LowestFirst => lowest,
            Self::HighestFirst => highest,
            Self::Random => random,
        }
    }

    /// Removes and returns the index this policy selects, or `None` for an
    /// empty pool.
    pub fn take(self, pool: &mut VecDeque<i64>, rand: &dyn RandSource) -> Option<i64> {
        if pool.is_empty() {
            return None;
        }
        let pos = (self.selector())(pool, rand);
        pool.remove(pos.min(pool.len() - 1))
    }
}

impl fmt::Display for ReissuePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReissuePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = policy_key(s);
        NAMES
            .iter()
            .find(|(name, _)| policy_key(name) == key)
            .map(|(_, policy)| *policy)
            .ok_or_else(|| {
                Error::invalid_config(format!(
                    "unknown reissue policy `{s}` (expected one of: FIFO, LIFO, Lowest-First, Highest-First, Random)"
                ))
            })
    }
}

impl TryFrom<String> for ReissuePolicy {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReissuePolicy> for &'static str {
    fn from(policy: ReissuePolicy) -> Self {
        policy.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ThreadRandom;

    struct Fixed(usize);

    impl RandSource for Fixed {
        fn pick(&self, len: usize) -> usize {
            self.0 % len
        }
    }

    fn drain(policy: ReissuePolicy, values: &[i64]) -> Vec<i64> {
        let mut pool: VecDeque<i64> = values.iter().copied().collect();
        let mut out = Vec::new();
        while let Some(index) = policy.take(&mut pool, &ThreadRandom) {
            out.push(index);
        }
        out
    }

    #[test]
    fn ordered_policies_drain_in_expected_order() {
        assert_eq!(drain(ReissuePolicy::Fifo, &[5, 7, 9]), [5, 7, 9]);
        assert_eq!(drain(ReissuePolicy::Lifo, &[5, 7, 9]), [9, 7, 5]);
        assert_eq!(drain(ReissuePolicy::LowestFirst, &[7, 9, 5]), [5, 7, 9]);
        assert_eq!(drain(ReissuePolicy::HighestFirst, &[7, 5, 9]), [9, 7, 5]);
    }

    #[test]
    fn random_uses_rand_source_position() {
        let mut pool: VecDeque<i64> = [5, 7, 9].into_iter().collect();
        assert_eq!(ReissuePolicy::Random.take(&mut pool, &Fixed(1)), Some(7));
        assert_eq!(pool, [5, 9]);
    }

    #[test]
    fn random_drains_every_element_once() {
        let mut drained = drain(ReissuePolicy::Random, &[1, 2, 3, 4, 5, 6]);
        drained.sort_unstable();
        assert_eq!(drained, [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn empty_pool_yields_nothing() {
        let mut pool = VecDeque::new();
        assert_eq!(ReissuePolicy::Lifo.take(&mut pool, &ThreadRandom), None);
    }

    #[test]
    fn parses_hyphenated_and_compact_names() {
        assert_eq!("Lowest-First".parse::<ReissuePolicy>().unwrap(), ReissuePolicy::LowestFirst);
        assert_eq!("highestfirst".parse::<ReissuePolicy>().unwrap(), ReissuePolicy::HighestFirst);
        assert_eq!("fifo".parse::<ReissuePolicy>().unwrap(), ReissuePolicy::Fifo);
        assert!("Oldest".parse::<ReissuePolicy>().is_err());
    }
}
