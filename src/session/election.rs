//! Deterministic host election.
//!
//! Every peer runs the same pure function over the same connected set, so no
//! negotiation messages are needed.

use crate::models::PlayerId;

/// Returns the host among `ids`: the lexicographically smallest identifier.
pub fn elected_host<'a, I>(ids: I) -> Option<&'a PlayerId>
where
    I: IntoIterator<Item = &'a PlayerId>,
{
    ids.into_iter().min()
}

/// Whether `local` is host of the set `{local} ∪ remotes`.
pub fn elect(local: &PlayerId, remotes: &[PlayerId]) -> bool {
    elected_host(std::iter::once(local).chain(remotes)) == Some(local)
}
