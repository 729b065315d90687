//! Interpretation of the markings at a single rank: the overvote decision table.
//! Pure functions; the per-round walk that consumes the decisions lives in the tabulator.

use crate::ballot_metadata::CandidateIndex;
use crate::cast_vote_record::BallotMark;
use crate::config::OvervoteRule;
use crate::TabulationError;

/// What the overvote rule says to do with the markings at one rank.
#[derive(Clone,Copy,Debug,Eq, PartialEq)]
pub enum OvervoteDecision {
    /// No overvote handling applies; proceed with the rank.
    None,
    /// The ballot exhausts at this rank.
    Exhaust,
    /// Skip this rank and move to the next.
    Skip,
    /// Set the ballot aside for this round without exhausting it.
    Ignore,
}

/// The exhaustive decision table mapping a rank's markings, the overvote rule and the
/// current candidate statuses to a decision.
///
/// An explicit overvote label is written by the loader only when it is the sole marking
/// at its rank; co-occurrence with any other marking is a programming error in the
/// loader, reported as an invariant violation rather than silently interpreted.
pub fn overvote_decision(marks:&[BallotMark],rule:OvervoteRule,is_continuing:impl Fn(CandidateIndex)->bool) -> Result<OvervoteDecision,TabulationError> {
    if marks.iter().any(|m|*m==BallotMark::OvervoteLabel) {
        if marks.len()!=1 {
            return Err(TabulationError::Invariant("explicit overvote label sharing a rank with another marking".to_string()));
        }
        return match rule {
            OvervoteRule::ExhaustImmediately => Ok(OvervoteDecision::Exhaust),
            OvervoteRule::AlwaysSkipToNextRank => Ok(OvervoteDecision::Skip),
            // validation rejects configurations pairing an explicit label with the status-sensitive rules
            _ => Err(TabulationError::Invariant("explicit overvote label under a status-sensitive overvote rule".to_string())),
        };
    }
    if marks.len()<=1 { return Ok(OvervoteDecision::None); }
    match rule {
        OvervoteRule::ExhaustImmediately => return Ok(OvervoteDecision::Exhaust),
        OvervoteRule::AlwaysSkipToNextRank => return Ok(OvervoteDecision::Skip),
        _ => {}
    }
    let continuing_here = marks.iter().filter_map(|m|m.declared()).filter(|&c|is_continuing(c)).count();
    match rule {
        _ if continuing_here==0 => Ok(OvervoteDecision::None), // no eligible candidate at this rank
        OvervoteRule::ExhaustIfAnyContinuing => Ok(OvervoteDecision::Exhaust),
        OvervoteRule::IgnoreIfAnyContinuing => Ok(OvervoteDecision::Ignore),
        _ if continuing_here==1 => Ok(OvervoteDecision::None), // the single continuing candidate is counted
        OvervoteRule::ExhaustIfMultipleContinuing => Ok(OvervoteDecision::Exhaust),
        OvervoteRule::IgnoreIfMultipleContinuing => Ok(OvervoteDecision::Ignore),
        OvervoteRule::ExhaustImmediately|OvervoteRule::AlwaysSkipToNextRank => unreachable!("handled before counting continuing candidates"),
        OvervoteRule::Unknown => Err(TabulationError::Invariant("unknown overvote rule survived validation".to_string())),
    }
}
