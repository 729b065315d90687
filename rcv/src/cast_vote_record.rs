//! One voter's ranked ballot plus provenance and audit data. The rankings are immutable
//! once constructed; the exhaustion state, current recipient, fractional transfer value
//! and audit trail are state of one particular tabulation run and belong exclusively to
//! the driver while a run is in progress.

use serde::{Serialize,Deserialize};
use crate::ballot_metadata::{CandidateIndex, RoundIndex};
use crate::fixed_decimal::FixedDecimal;

/// A single marking at one rank of a ballot. The explicit overvote label is a reserved
/// token that may appear on ballots but is never a candidate.
#[derive(Clone,Copy,Debug,Eq, PartialEq,Serialize,Deserialize)]
pub enum BallotMark {
    Declared(CandidateIndex),
    OvervoteLabel,
}

impl BallotMark {
    pub fn declared(&self) -> Option<CandidateIndex> {
        match self {
            BallotMark::Declared(c) => Some(*c),
            BallotMark::OvervoteLabel => None,
        }
    }
}

/// The set of markings a voter made at one rank. A voter may mark more than one
/// candidate at a rank (an overvote), so this is a set, not a single value.
#[derive(Clone,Debug,Serialize,Deserialize)]
pub struct RankMarks {
    /// 1 is the most preferred rank. Ranks on a ballot are sparse; integers may be skipped.
    pub rank : u32,
    pub marks : Vec<BallotMark>,
}

/// Why a ballot stopped participating.
#[derive(Clone,Copy,Debug,Eq, PartialEq,Serialize,Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExhaustReason {
    Overvote,
    Undervote,
    DuplicateCandidate,
    NoContinuingCandidates,
}

/// Why a ballot was set aside for one round without exhausting.
#[derive(Clone,Copy,Debug,Eq, PartialEq,Serialize,Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IgnoreReason {
    Overvote,
}

/// What happened to a ballot in one round.
#[derive(Clone,Copy,Debug,Eq, PartialEq,Serialize,Deserialize)]
pub enum VoteOutcome {
    CountedFor(CandidateIndex),
    Ignored(IgnoreReason),
    Exhausted(ExhaustReason),
}

#[derive(Clone,Copy,Debug,Serialize,Deserialize)]
pub struct AuditEntry {
    pub round : RoundIndex,
    pub outcome : VoteOutcome,
}

/// A cast vote record. See the module documentation for the ownership story.
#[derive(Clone,Debug,Serialize,Deserialize)]
pub struct CastVoteRecord {
    /// name of the file this record came from.
    source : String,
    /// stable identifier of the record within its source.
    record_id : String,
    #[serde(skip_serializing_if = "Option::is_none",default)]
    precinct : Option<String>,
    /// the raw row as read, kept verbatim for audit.
    #[serde(skip_serializing_if = "Vec::is_empty",default)]
    raw_row : Vec<String>,
    /// rank to markings, ascending by rank.
    rankings : Vec<RankMarks>,
    // State of one tabulation run. exhausted never reverts to false within a run.
    exhausted : bool,
    current_recipient : Option<CandidateIndex>,
    ftv : FixedDecimal,
    audit : Vec<AuditEntry>,
}

impl CastVoteRecord {
    pub fn new(source:&str,record_id:&str,precinct:Option<String>,raw_row:Vec<String>,mut rankings:Vec<RankMarks>) -> Self {
        rankings.sort_by_key(|r|r.rank);
        CastVoteRecord{
            source: source.to_string(),
            record_id: record_id.to_string(),
            precinct,
            raw_row,
            rankings,
            exhausted: false,
            current_recipient: None,
            ftv: FixedDecimal::zero(0),
            audit: vec![],
        }
    }

    /// Convenience constructor for a ballot ranking one candidate per rank, 1,2,3,...
    pub fn simple(source:&str,record_id:&str,prefs:&[CandidateIndex]) -> Self {
        let rankings = prefs.iter().enumerate().map(|(i,&c)|RankMarks{rank:(i+1) as u32,marks:vec![BallotMark::Declared(c)]}).collect();
        CastVoteRecord::new(source,record_id,None,vec![],rankings)
    }

    pub fn with_precinct(mut self,precinct:&str) -> Self { self.precinct=Some(precinct.to_string()); self }

    pub fn source(&self) -> &str { &self.source }
    pub fn record_id(&self) -> &str { &self.record_id }
    pub fn precinct(&self) -> Option<&str> { self.precinct.as_deref() }
    pub fn raw_row(&self) -> &[String] { &self.raw_row }
    pub fn rankings(&self) -> &[RankMarks] { &self.rankings }

    pub fn is_exhausted(&self) -> bool { self.exhausted }
    pub fn current_recipient(&self) -> Option<CandidateIndex> { self.current_recipient }
    /// The fractional weight of this ballot, in [0,1]. Starts at 1, only ever decreases.
    pub fn fractional_transfer_value(&self) -> FixedDecimal { self.ftv }
    pub fn audit_trail(&self) -> &[AuditEntry] { &self.audit }

    /// Reset the per-run state. Called by the driver before a tabulation pass begins;
    /// never during one.
    pub(crate) fn begin_run(&mut self,scale:u8) {
        self.exhausted=false;
        self.current_recipient=None;
        self.ftv=FixedDecimal::one(scale);
        self.audit.clear();
    }

    pub(crate) fn clear_recipient(&mut self) { self.current_recipient=None; }

    pub(crate) fn record_counted(&mut self,round:RoundIndex,candidate:CandidateIndex) {
        self.current_recipient=Some(candidate);
        self.audit.push(AuditEntry{round,outcome:VoteOutcome::CountedFor(candidate)});
    }

    pub(crate) fn record_ignored(&mut self,round:RoundIndex,reason:IgnoreReason) {
        self.audit.push(AuditEntry{round,outcome:VoteOutcome::Ignored(reason)});
    }

    pub(crate) fn exhaust(&mut self,round:RoundIndex,reason:ExhaustReason) {
        self.exhausted=true;
        self.audit.push(AuditEntry{round,outcome:VoteOutcome::Exhausted(reason)});
    }

    /// Apply a surplus fraction: `ftv ← round_down(ftv × fraction)`.
    pub(crate) fn reduce_transfer_value(&mut self,fraction:FixedDecimal,scale:u8) {
        self.ftv=FixedDecimal::multiply(self.ftv,fraction,scale);
    }
}
