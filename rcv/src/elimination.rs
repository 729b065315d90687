//! The four ways a round that elected nobody removes candidates. They are attempted in
//! a fixed order and the first to produce a non-empty set wins; a round in which all
//! four come up empty while no winner was declared is a fatal invariant violation,
//! raised by the driver.

use log::debug;
use crate::ballot_metadata::{CandidateIndex, RoundIndex};
use crate::fixed_decimal::FixedDecimal;
use crate::tally::{RoundTally, invert_tally};
use crate::tie_resolution::{Tiebreaker, TieDirection};
use crate::transcript::{BatchEliminationRecord, RoundRecord, TieBreakRecord};
use crate::TabulationError;

/// What the elimination strategies need to see of the round.
pub struct EliminationContext<'a> {
    pub round : RoundIndex,
    pub tally : &'a RoundTally,
    /// continuing candidates, in roster order.
    pub continuing : &'a [CandidateIndex],
    pub undeclared_write_in : Option<CandidateIndex>,
    pub minimum_vote_threshold : FixedDecimal,
    pub batch_elimination_enabled : bool,
}

#[derive(Default)]
pub struct EliminationResult {
    pub eliminated : Vec<CandidateIndex>,
    pub batch_records : Vec<BatchEliminationRecord>,
    pub tie_break : Option<TieBreakRecord>,
}

/// The strategies, in the order they are attempted. A list of variants rather than a
/// trait hierarchy; they all share the same shape of answer.
#[derive(Clone,Copy,Debug,Eq, PartialEq)]
pub enum EliminationStrategy {
    DropUndeclaredWriteIn,
    DropBelowMinimumThreshold,
    BatchEliminate,
    EliminateLowest,
}

pub const STRATEGIES_IN_ORDER : [EliminationStrategy;4] = [
    EliminationStrategy::DropUndeclaredWriteIn,
    EliminationStrategy::DropBelowMinimumThreshold,
    EliminationStrategy::BatchEliminate,
    EliminationStrategy::EliminateLowest,
];

/// Run the strategy ladder. The result may still be empty (the driver decides whether
/// that is fatal, which it is whenever no winner was found this round).
pub fn eliminate(ctx:&EliminationContext,tiebreaker:&mut Tiebreaker,rounds_so_far:&[RoundRecord]) -> Result<EliminationResult,TabulationError> {
    for strategy in STRATEGIES_IN_ORDER {
        let result = strategy.attempt(ctx,tiebreaker,rounds_so_far)?;
        if !result.eliminated.is_empty() {
            debug!("round {} : {:?} eliminated {:?}",ctx.round,strategy,result.eliminated);
            return Ok(result);
        }
    }
    Ok(EliminationResult::default())
}

impl EliminationStrategy {
    fn attempt(self,ctx:&EliminationContext,tiebreaker:&mut Tiebreaker,rounds_so_far:&[RoundRecord]) -> Result<EliminationResult,TabulationError> {
        match self {
            EliminationStrategy::DropUndeclaredWriteIn => Ok(drop_undeclared_write_in(ctx)),
            EliminationStrategy::DropBelowMinimumThreshold => Ok(drop_below_minimum_threshold(ctx)),
            EliminationStrategy::BatchEliminate => Ok(batch_eliminate(ctx)),
            EliminationStrategy::EliminateLowest => eliminate_lowest(ctx,tiebreaker,rounds_so_far),
        }
    }
}

/// The undeclared write in bucket can never win, so it goes first, but only in round 1
/// and only if it actually holds votes.
fn drop_undeclared_write_in(ctx:&EliminationContext) -> EliminationResult {
    let mut result = EliminationResult::default();
    if ctx.round==RoundIndex(1) {
        if let Some(uwi) = ctx.undeclared_write_in {
            if ctx.continuing.contains(&uwi) && !ctx.tally.count(uwi).is_zero() {
                result.eliminated.push(uwi);
            }
        }
    }
    result
}

/// Eliminate every continuing candidate whose tally is strictly below the configured
/// minimum vote threshold. Inactive when the threshold is zero.
fn drop_below_minimum_threshold(ctx:&EliminationContext) -> EliminationResult {
    let mut result = EliminationResult::default();
    if !ctx.minimum_vote_threshold.is_zero() {
        for &candidate in ctx.continuing {
            if ctx.tally.count(candidate)<ctx.minimum_vote_threshold {
                result.eliminated.push(candidate);
            }
        }
    }
    result
}

/// Walk the sorted tally buckets from lowest to highest keeping a running total of the
/// votes seen. Whenever the running total is below the current bucket's tally, everyone
/// seen so far cannot catch the next-highest candidate even if every lower vote
/// transferred to them, so they may all be eliminated together. The largest such batch
/// is taken, provided it removes at least two candidates; a single candidate is left to
/// the regular path.
fn batch_eliminate(ctx:&EliminationContext) -> EliminationResult {
    let mut result = EliminationResult::default();
    if !ctx.batch_elimination_enabled { return result; }
    let buckets = invert_tally(ctx.tally,ctx.continuing,true);
    let mut running_total = FixedDecimal::zero(0);
    let mut seen : Vec<CandidateIndex> = vec![];
    for (bucket_tally,candidates) in &buckets {
        if !seen.is_empty() && running_total<*bucket_tally {
            result.batch_records.push(BatchEliminationRecord{
                unable_to_catch_up: seen.clone(),
                running_total,
                next_highest_tally: *bucket_tally,
            });
        }
        for &candidate in candidates {
            running_total+=ctx.tally.count(candidate);
            seen.push(candidate);
        }
    }
    if let Some(last) = result.batch_records.last() {
        if last.unable_to_catch_up.len()>=2 {
            result.eliminated=last.unable_to_catch_up.clone();
            return result;
        }
    }
    // scan decisions that did not produce a usable batch are not worth recording
    result.batch_records.clear();
    result
}

/// Eliminate the unique lowest-tally candidate, invoking the tie-breaker if the lowest
/// bucket holds more than one.
fn eliminate_lowest(ctx:&EliminationContext,tiebreaker:&mut Tiebreaker,rounds_so_far:&[RoundRecord]) -> Result<EliminationResult,TabulationError> {
    let mut result = EliminationResult::default();
    let buckets = invert_tally(ctx.tally,ctx.continuing,false);
    if let Some((_,lowest)) = buckets.into_iter().next() {
        if lowest.len()==1 {
            result.eliminated=lowest;
        } else {
            let loser = tiebreaker.resolve(&lowest,TieDirection::Loser,ctx.round,rounds_so_far)?;
            result.tie_break=Some(TieBreakRecord{round:ctx.round,tied:lowest,selected:loser,mode:tiebreaker.mode()});
            result.eliminated.push(loser);
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Rules, TieBreakMode};

    fn tally_of(values:&[usize]) -> RoundTally {
        let mut t = RoundTally::zeroed(values.len(),4);
        for (i,&v) in values.iter().enumerate() { t.add(CandidateIndex(i),FixedDecimal::from_usize(v,4)); }
        t
    }

    fn all_continuing(n:usize) -> Vec<CandidateIndex> { (0..n).map(CandidateIndex).collect() }

    fn context<'a>(round:usize,tally:&'a RoundTally,continuing:&'a [CandidateIndex]) -> EliminationContext<'a> {
        EliminationContext{
            round: RoundIndex(round),
            tally,
            continuing,
            undeclared_write_in: None,
            minimum_vote_threshold: FixedDecimal::zero(4),
            batch_elimination_enabled: false,
        }
    }

    fn tiebreaker() -> Tiebreaker {
        Tiebreaker::new(&Rules{tiebreak_mode:TieBreakMode::Random,random_seed:Some(1),..Rules::default()},4,None)
    }

    #[test]
    fn uwi_dropped_first_round_only() {
        let tally = tally_of(&[5,3,2]);
        let continuing = all_continuing(3);
        let mut ctx = context(1,&tally,&continuing);
        ctx.undeclared_write_in=Some(CandidateIndex(2));
        let result = eliminate(&ctx,&mut tiebreaker(),&[]).unwrap();
        assert_eq!(vec![CandidateIndex(2)],result.eliminated);
        // round 2: the UWI path no longer applies, the ordinary lowest goes
        ctx.round=RoundIndex(2);
        let result = eliminate(&ctx,&mut tiebreaker(),&[]).unwrap();
        assert_eq!(vec![CandidateIndex(2)],result.eliminated); // still lowest, but via EliminateLowest
        assert!(result.batch_records.is_empty());
    }

    #[test]
    fn uwi_with_no_votes_is_left_alone() {
        let tally = tally_of(&[5,3,0]);
        let continuing = all_continuing(3);
        let mut ctx = context(1,&tally,&continuing);
        ctx.undeclared_write_in=Some(CandidateIndex(2));
        let result = drop_undeclared_write_in(&ctx);
        assert!(result.eliminated.is_empty());
    }

    #[test]
    fn minimum_threshold_drops_everyone_strictly_below() {
        let tally = tally_of(&[50,10,9,3]);
        let continuing = all_continuing(4);
        let mut ctx = context(1,&tally,&continuing);
        ctx.minimum_vote_threshold=FixedDecimal::from_usize(10,4);
        let result = eliminate(&ctx,&mut tiebreaker(),&[]).unwrap();
        assert_eq!(vec![CandidateIndex(2),CandidateIndex(3)],result.eliminated);
    }

    #[test]
    fn batch_elimination_takes_the_largest_batch() {
        // A:10 B:1 C:2 D:3 — the scan triggers at C (1<2) and at A (6<10); the batch is B,C,D
        let tally = tally_of(&[10,1,2,3]);
        let continuing = all_continuing(4);
        let mut ctx = context(1,&tally,&continuing);
        ctx.batch_elimination_enabled=true;
        let result = eliminate(&ctx,&mut tiebreaker(),&[]).unwrap();
        let mut eliminated = result.eliminated.clone();
        eliminated.sort();
        assert_eq!(vec![CandidateIndex(1),CandidateIndex(2),CandidateIndex(3)],eliminated);
        let last = result.batch_records.last().unwrap();
        assert_eq!(FixedDecimal::from_usize(6,4),last.running_total);
        assert_eq!(FixedDecimal::from_usize(10,4),last.next_highest_tally);
    }

    #[test]
    fn batch_of_one_is_left_to_the_regular_path() {
        // B cannot catch C, but a batch of one is not a batch
        let tally = tally_of(&[4,1,3]);
        let continuing = all_continuing(3);
        let mut ctx = context(1,&tally,&continuing);
        ctx.batch_elimination_enabled=true;
        let result = eliminate(&ctx,&mut tiebreaker(),&[]).unwrap();
        assert_eq!(vec![CandidateIndex(1)],result.eliminated);
        assert!(result.batch_records.is_empty()); // came from EliminateLowest, not the batch scan
    }

    #[test]
    fn lowest_elimination_breaks_ties_deterministically() {
        let tally = tally_of(&[4,3,3]);
        let continuing = all_continuing(3);
        let ctx = context(1,&tally,&continuing);
        let a = eliminate(&ctx,&mut tiebreaker(),&[]).unwrap();
        let b = eliminate(&ctx,&mut tiebreaker(),&[]).unwrap();
        assert_eq!(a.eliminated,b.eliminated);
        assert_eq!(1,a.eliminated.len());
        let record = a.tie_break.unwrap();
        assert_eq!(vec![CandidateIndex(1),CandidateIndex(2)],record.tied);
        assert!(record.tied.contains(&record.selected));
    }
}
