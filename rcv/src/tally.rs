//! Per-round vote tallies and the inversion into sorted tally buckets.

use std::collections::BTreeMap;
use log::debug;
use serde::{Serialize,Deserialize};
use crate::ballot_metadata::CandidateIndex;
use crate::fixed_decimal::FixedDecimal;

/// The votes credited to each candidate in one round. Indexed by [CandidateIndex].
/// Once a round's tally is recorded in the transcript it is never edited.
#[derive(Clone,Debug,Serialize,Deserialize,PartialEq)]
pub struct RoundTally {
    counts : Vec<FixedDecimal>,
}

impl RoundTally {
    pub fn zeroed(num_candidates:usize,scale:u8) -> Self {
        RoundTally{counts:vec![FixedDecimal::zero(scale);num_candidates]}
    }
    pub fn len(&self) -> usize { self.counts.len() }
    pub fn is_empty(&self) -> bool { self.counts.is_empty() }
    pub fn count(&self,candidate:CandidateIndex) -> FixedDecimal { self.counts[candidate.0] }
    pub fn add(&mut self,candidate:CandidateIndex,amount:FixedDecimal) { self.counts[candidate.0]+=amount; }
    /// sum over the given candidates, typically the continuing ones.
    pub fn total_over(&self,candidates:impl Iterator<Item=CandidateIndex>) -> FixedDecimal {
        candidates.map(|c|self.counts[c.0]).sum()
    }
}

/// Sorted mapping from tally (ascending) to the candidates holding that tally.
/// The candidate order within a bucket is the iteration order of the inclusion
/// sequence; downstream consumers must not assume it is alphabetical, but it is
/// stable given identical input. Every included candidate appears exactly once.
pub type TallyBuckets = BTreeMap<FixedDecimal,Vec<CandidateIndex>>;

pub fn invert_tally(tally:&RoundTally,included:&[CandidateIndex],log:bool) -> TallyBuckets {
    let mut buckets : TallyBuckets = BTreeMap::new();
    for &candidate in included {
        buckets.entry(tally.count(candidate)).or_insert_with(Vec::new).push(candidate);
    }
    if log {
        for (count,candidates) in &buckets {
            debug!("tally {} : candidates {:?}",count,candidates);
        }
    }
    buckets
}
