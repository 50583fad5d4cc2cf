//! Increment and reissue policies, and the resolver that turns a partial,
//! caller-supplied configuration into an effective [`SequenceConfig`].
//!
//! Both policy families are closed enums. Each variant is bound to its
//! behavior through a single table ([`IncrementPolicy::strategy`],
//! [`ReissuePolicy::selector`]) and to its accepted spellings through a name
//! table, so adding a variant touches one place.
//!
//! [`SequenceConfig`]: crate::SequenceConfig

mod increment;
mod reissue;
mod resolver;

pub use increment::*;
pub use reissue::*;
pub use resolver::*;

/// Normalizes a policy name for lookup: ASCII alphanumerics only,
/// lowercased. `"Lowest-First"`, `"lowest_first"` and `"LowestFirst"` all
/// compare equal.
pub(crate) fn policy_key(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
