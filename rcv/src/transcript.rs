//! Store the history of a tabulation: the per-round tallies, who won and who was
//! eliminated when, every discretionary decision, and the per-precinct duplicates.
//! Everything here is append-only during a run and read-only afterwards.

use std::collections::BTreeMap;
use serde::{Serialize,Deserialize};
use crate::ballot_metadata::{CandidateIndex, RoundIndex};
use crate::cast_vote_record::CastVoteRecord;
use crate::config::TieBreakMode;
use crate::fixed_decimal::FixedDecimal;
use crate::tally::RoundTally;

/// The three disjoint states of a candidate during tabulation. Derived from the winner
/// and elimination maps, not stored per round.
#[derive(Clone,Copy,Debug,Eq, PartialEq)]
pub enum CandidateStatus {
    Continuing,
    Winner,
    Eliminated,
}

/// One use of the tie-breaker.
#[derive(Clone,Debug,Serialize,Deserialize)]
pub struct TieBreakRecord {
    pub round : RoundIndex,
    pub tied : Vec<CandidateIndex>,
    pub selected : CandidateIndex,
    pub mode : TieBreakMode,
}

/// One triggering point of the batch elimination scan: everyone in `unable_to_catch_up`
/// holds fewer votes in total than the next candidate up holds alone.
#[derive(Clone,Debug,Serialize,Deserialize)]
pub struct BatchEliminationRecord {
    pub unable_to_catch_up : Vec<CandidateIndex>,
    pub running_total : FixedDecimal,
    pub next_highest_tally : FixedDecimal,
}

/// Everything that happened in one round.
#[derive(Clone,Debug,Serialize,Deserialize)]
pub struct RoundRecord {
    pub round : RoundIndex,
    pub tally : RoundTally,
    pub threshold : FixedDecimal,
    pub elected : Vec<CandidateIndex>,
    pub eliminated : Vec<CandidateIndex>,
    /// the scan decisions when elimination strategy 3 fired. The last entry is the batch taken.
    #[serde(skip_serializing_if = "Vec::is_empty",default)]
    pub batch_eliminations : Vec<BatchEliminationRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty",default)]
    pub tie_breaks : Vec<TieBreakRecord>,
    /// ballot weight that exhausted while applying votes this round.
    pub newly_exhausted : FixedDecimal,
    /// running total of exhausted ballot weight at the end of this round.
    pub exhausted_total : FixedDecimal,
}

/// The full history of one tabulation pass.
#[derive(Clone,Debug,Serialize,Deserialize)]
pub struct Transcript {
    /// winner to the round they crossed the threshold (or were elected terminally).
    pub winners : BTreeMap<CandidateIndex,RoundIndex>,
    /// candidate to the round they were eliminated in.
    pub eliminated : BTreeMap<CandidateIndex,RoundIndex>,
    /// rounds in order; `rounds[r-1]` is round `r`.
    pub rounds : Vec<RoundRecord>,
    /// per-precinct tally histories. A precinct appears iff at least one ballot names it.
    #[serde(skip_serializing_if = "BTreeMap::is_empty",default)]
    pub precinct_tallies : BTreeMap<String,Vec<RoundTally>>,
}

impl Transcript {
    pub fn new() -> Self {
        Transcript{
            winners: BTreeMap::new(),
            eliminated: BTreeMap::new(),
            rounds: vec![],
            precinct_tallies: BTreeMap::new(),
        }
    }

    pub fn status(&self,candidate:CandidateIndex) -> CandidateStatus {
        if self.winners.contains_key(&candidate) { CandidateStatus::Winner }
        else if self.eliminated.contains_key(&candidate) { CandidateStatus::Eliminated }
        else { CandidateStatus::Continuing }
    }

    pub fn is_continuing(&self,candidate:CandidateIndex) -> bool {
        self.status(candidate)==CandidateStatus::Continuing
    }

    pub fn round(&self,round:RoundIndex) -> &RoundRecord { &self.rounds[round.0-1] }
    pub fn num_rounds(&self) -> usize { self.rounds.len() }
}

impl Default for Transcript {
    fn default() -> Self { Transcript::new() }
}

/// The result of a tabulation: the transcript of each pass (a single pass except in
/// sequential winner-takes-all mode, which runs one full pass per seat), plus a read-only
/// view of the ballots with their audit trails, released only now that the run is over.
#[derive(Clone,Debug,Serialize,Deserialize)]
pub struct TabulationOutcome {
    pub passes : Vec<Transcript>,
    records : Vec<CastVoteRecord>,
}

impl TabulationOutcome {
    pub(crate) fn new(passes:Vec<Transcript>,records:Vec<CastVoteRecord>) -> Self {
        TabulationOutcome{passes,records}
    }

    /// the transcript of the only pass, for the ordinary modes.
    pub fn transcript(&self) -> &Transcript { &self.passes[0] }

    /// the ballots as they ended the (final) pass, with audit trails.
    pub fn records(&self) -> &[CastVoteRecord] { &self.records }

    /// every winner across all passes, in order of election.
    pub fn winners(&self) -> Vec<CandidateIndex> {
        let mut res = vec![];
        for pass in &self.passes {
            let mut of_pass : Vec<(RoundIndex,CandidateIndex)> = pass.winners.iter().map(|(&c,&r)|(r,c)).collect();
            of_pass.sort();
            res.extend(of_pass.into_iter().map(|(_,c)|c));
        }
        res
    }
}
