//! The round-by-round tabulation driver. It owns the cast vote records for the duration
//! of a run, applies each ballot to its highest continuing choice every round, detects
//! winners against the threshold, transfers surplus fractionally, and otherwise runs the
//! elimination ladder, until every seat is filled.

use std::cmp::Reverse;
use std::collections::BTreeSet;
use log::{debug, info};
use crate::ballot_metadata::{CandidateIndex, CandidateRoster, NumberOfCandidates, RoundIndex};
use crate::ballot_interpretation::{overvote_decision, OvervoteDecision};
use crate::cast_vote_record::{BallotMark, CastVoteRecord, ExhaustReason, IgnoreReason};
use crate::config::{ContestConfig, MaxRankings, MaxSkippedRanks, Rules, WinnerElectionMode};
use crate::config_validation::validate;
use crate::elimination::{eliminate, EliminationContext};
use crate::fixed_decimal::FixedDecimal;
use crate::tally::RoundTally;
use crate::tie_resolution::{TieBreakOracle, TieDirection, Tiebreaker};
use crate::transcript::{RoundRecord, TabulationOutcome, TieBreakRecord, Transcript};
use crate::TabulationError;

/// Validate the configuration and, if it is clean, run the tabulation to completion.
///
/// The cast vote records are taken by value: their exhaustion state, transfer values and
/// audit trails are state of this particular run. They come back, read-only, inside the
/// outcome. The oracle is only consulted by the interactive tie-break modes.
pub fn tabulate(config:&ContestConfig,mut cvrs:Vec<CastVoteRecord>,oracle:Option<Box<dyn TieBreakOracle>>) -> Result<TabulationOutcome,TabulationError> {
    let errors = validate(config);
    if !errors.is_empty() { return Err(TabulationError::ConfigInvalid(errors)); }
    let roster = config.roster();
    let rules = &config.rules;
    let scale = rules.decimal_places_for_vote_arithmetic;
    let by_precinct = config.output_settings.tabulate_by_precinct;
    let mut tiebreaker = Tiebreaker::new(rules,roster.len(),oracle);
    let mut passes : Vec<Transcript> = vec![];
    match rules.winner_election_mode {
        WinnerElectionMode::MultiSeatSequentialWinnerTakesAll => {
            // Each pass is a complete single-winner tabulation over the full ballot set,
            // with the winners of earlier passes barred from the contest.
            let mut barred : BTreeSet<CandidateIndex> = BTreeSet::new();
            for pass_number in 0..rules.number_of_winners {
                info!("sequential winner-takes-all pass {}",pass_number+1);
                for cvr in cvrs.iter_mut() { cvr.begin_run(scale); }
                let mut pass = RoundLoop::new(rules,&roster,scale,1,WinnerElectionMode::SingleSeatMajority,by_precinct,&mut cvrs,&barred,&mut tiebreaker);
                pass.run()?;
                let transcript = pass.into_transcript();
                for &winner in transcript.winners.keys() { barred.insert(winner); }
                passes.push(transcript);
            }
        }
        mode => {
            for cvr in cvrs.iter_mut() { cvr.begin_run(scale); }
            let barred = BTreeSet::new();
            let mut pass = RoundLoop::new(rules,&roster,scale,rules.number_of_winners,mode,by_precinct,&mut cvrs,&barred,&mut tiebreaker);
            pass.run()?;
            passes.push(pass.into_transcript());
        }
    }
    Ok(TabulationOutcome::new(passes,cvrs))
}

/// The main workhorse that runs the rounds of one tabulation pass.
struct RoundLoop<'a> {
    rules : &'a Rules,
    roster : &'a CandidateRoster,
    scale : u8,
    /// seats this pass fills (1 for a sequential pass regardless of the contest total).
    seats : usize,
    /// the election mode in effect for this pass.
    mode : WinnerElectionMode,
    by_precinct : bool,
    cvrs : &'a mut Vec<CastVoteRecord>,
    /// candidates barred before the pass began (winners of earlier sequential passes).
    barred : &'a BTreeSet<CandidateIndex>,
    tiebreaker : &'a mut Tiebreaker,
    transcript : Transcript,
    exhausted_total : FixedDecimal,
}

impl <'a> RoundLoop<'a> {
    fn new(rules:&'a Rules,roster:&'a CandidateRoster,scale:u8,seats:usize,mode:WinnerElectionMode,by_precinct:bool,cvrs:&'a mut Vec<CastVoteRecord>,barred:&'a BTreeSet<CandidateIndex>,tiebreaker:&'a mut Tiebreaker) -> Self {
        let mut transcript = Transcript::new();
        if by_precinct {
            // a precinct appears iff at least one ballot references it
            for cvr in cvrs.iter() {
                if let Some(precinct) = cvr.precinct() {
                    transcript.precinct_tallies.entry(precinct.to_string()).or_insert_with(Vec::new);
                }
            }
        }
        RoundLoop{rules,roster,scale,seats,mode,by_precinct,cvrs,barred,tiebreaker,transcript,exhausted_total:FixedDecimal::zero(scale)}
    }

    fn into_transcript(self) -> Transcript { self.transcript }

    /// continuing candidates in roster order: neither winner, eliminated, nor barred.
    fn continuing_candidates(&self) -> Vec<CandidateIndex> {
        self.roster.indices().filter(|c|!self.barred.contains(c) && self.transcript.is_continuing(*c)).collect()
    }

    fn seats_remaining(&self) -> NumberOfCandidates {
        NumberOfCandidates(self.seats)-NumberOfCandidates(self.transcript.winners.len())
    }

    fn run(&mut self) -> Result<(),TabulationError> {
        loop {
            let round = RoundIndex(self.transcript.rounds.len()+1);
            if round.0>self.roster.len()+1 {
                return Err(TabulationError::Invariant(format!("tabulation failed to terminate within {} rounds",self.roster.len()+1)));
            }
            let continuing = self.continuing_candidates();
            let (tally,newly_exhausted) = self.apply_votes(round,&continuing)?;
            self.exhausted_total+=newly_exhausted;
            let seats_remaining = self.seats_remaining().0;
            let total = tally.total_over(continuing.iter().copied());
            let divisor = if self.rules.hare_quota { seats_remaining } else { seats_remaining+1 };
            let threshold = FixedDecimal::divide(total,FixedDecimal::from_usize(divisor,self.scale),self.scale);
            info!("round {} : {} continuing, total {}, threshold {}",round,continuing.len(),total,threshold);
            let mut record = RoundRecord{
                round,
                tally: tally.clone(),
                threshold,
                elected: vec![],
                eliminated: vec![],
                batch_eliminations: vec![],
                tie_breaks: vec![],
                newly_exhausted,
                exhausted_total: self.exhausted_total,
            };
            let finished = match self.mode {
                WinnerElectionMode::MultiSeatBottomsUp => self.bottoms_up_round(round,&continuing,&tally,&mut record)?,
                WinnerElectionMode::SingleSeatContinueUntilTwoCandidatesRemain => self.continue_until_two_round(round,&continuing,&tally,&mut record)?,
                _ => self.threshold_round(round,&continuing,&tally,threshold,&mut record)?,
            };
            self.transcript.rounds.push(record);
            if finished { return Ok(()); }
        }
    }

    /// The ordinary round body: detect winners against the threshold, otherwise
    /// eliminate. Returns true when the pass is complete.
    fn threshold_round(&mut self,round:RoundIndex,continuing:&[CandidateIndex],tally:&RoundTally,threshold:FixedDecimal,record:&mut RoundRecord) -> Result<bool,TabulationError> {
        let winners = self.detect_winners(round,continuing,tally,threshold,record)?;
        if !winners.is_empty() {
            for &winner in &winners {
                info!("round {} : elected {}",round,self.roster.name(winner));
                self.transcript.winners.insert(winner,round);
            }
            record.elected=winners.clone();
            if self.transcript.winners.len()<self.seats {
                for &winner in &winners {
                    self.transfer_surplus(winner,tally,threshold);
                }
            }
            Ok(self.transcript.winners.len()>=self.seats)
        } else {
            self.eliminate_for_round(round,continuing,tally,record)?;
            Ok(false)
        }
    }

    /// Candidates strictly above the threshold, the undeclared write in bucket aside.
    /// Under MULTI_SEAT_ALLOW_ONLY_ONE_WINNER_PER_ROUND only the highest crosser is
    /// elected and the rest defer to a later round. Winners come back sorted highest
    /// tally first, the order their surplus is transferred in.
    fn detect_winners(&mut self,round:RoundIndex,continuing:&[CandidateIndex],tally:&RoundTally,threshold:FixedDecimal,record:&mut RoundRecord) -> Result<Vec<CandidateIndex>,TabulationError> {
        let mut crossers : Vec<CandidateIndex> = continuing.iter().copied()
            .filter(|&c|!self.roster.is_undeclared_write_in(c))
            .filter(|&c|tally.count(c)>threshold)
            .collect();
        crossers.sort_by_key(|&c|Reverse(tally.count(c)));
        if crossers.len()>1 && self.mode==WinnerElectionMode::MultiSeatAllowOnlyOneWinnerPerRound {
            let top_tally = tally.count(crossers[0]);
            let top : Vec<CandidateIndex> = crossers.iter().copied().take_while(|&c|tally.count(c)==top_tally).collect();
            let winner = if top.len()==1 { top[0] } else {
                let winner = self.tiebreaker.resolve(&top,TieDirection::Winner,round,&self.transcript.rounds)?;
                record.tie_breaks.push(TieBreakRecord{round,tied:top,selected:winner,mode:self.tiebreaker.mode()});
                winner
            };
            crossers=vec![winner];
        }
        Ok(crossers)
    }

    /// The winner keeps the threshold's worth of votes; the fraction of each of
    /// their ballots above it carries on at a reduced transfer value.
    fn transfer_surplus(&mut self,winner:CandidateIndex,tally:&RoundTally,threshold:FixedDecimal) {
        let votes = tally.count(winner);
        let surplus = votes-threshold;
        let fraction = FixedDecimal::divide(surplus,votes,self.scale);
        debug!("surplus transfer for {} : surplus {} of {} votes, fraction {}",self.roster.name(winner),surplus,votes,fraction);
        for cvr in self.cvrs.iter_mut() {
            if cvr.current_recipient()==Some(winner) {
                cvr.reduce_transfer_value(fraction,self.scale);
            }
        }
    }

    fn eliminate_for_round(&mut self,round:RoundIndex,continuing:&[CandidateIndex],tally:&RoundTally,record:&mut RoundRecord) -> Result<(),TabulationError> {
        let minimum = FixedDecimal::from_usize(self.rules.minimum_vote_threshold as usize,self.scale);
        let ctx = EliminationContext{
            round,
            tally,
            continuing,
            undeclared_write_in: self.roster.undeclared_write_in(),
            minimum_vote_threshold: minimum,
            batch_elimination_enabled: self.rules.batch_elimination,
        };
        let result = eliminate(&ctx,self.tiebreaker,&self.transcript.rounds)?;
        if result.eliminated.is_empty() {
            return Err(TabulationError::Invariant("no winner was declared and no elimination strategy applied".to_string()));
        }
        for &candidate in &result.eliminated {
            info!("round {} : eliminated {}",round,self.roster.name(candidate));
            self.transcript.eliminated.insert(candidate,round);
        }
        record.eliminated=result.eliminated;
        record.batch_eliminations=result.batch_records;
        if let Some(tie) = result.tie_break { record.tie_breaks.push(tie); }
        Ok(())
    }

    /// MULTI_SEAT_BOTTOMS_UP: never transfer surplus, never test the threshold; keep
    /// eliminating, and as soon as the electable continuing candidates fit the seats,
    /// they all win. The undeclared write in bucket can linger on zero votes without
    /// ever being force-dropped, so it does not count towards filling the seats and is
    /// never elected.
    fn bottoms_up_round(&mut self,round:RoundIndex,continuing:&[CandidateIndex],tally:&RoundTally,record:&mut RoundRecord) -> Result<bool,TabulationError> {
        let electable : Vec<CandidateIndex> = continuing.iter().copied().filter(|&c|!self.roster.is_undeclared_write_in(c)).collect();
        if electable.len()<=self.seats {
            self.elect_all(round,&electable,record)?;
            return Ok(true);
        }
        self.eliminate_for_round(round,continuing,tally,record)?;
        let survivors : Vec<CandidateIndex> = self.continuing_candidates().into_iter().filter(|&c|!self.roster.is_undeclared_write_in(c)).collect();
        if survivors.len()<=self.seats {
            self.elect_all(round,&survivors,record)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// SINGLE_SEAT_CONTINUE_UNTIL_TWO_CANDIDATES_REMAIN: keep eliminating past any
    /// majority; once exactly two stand, the higher tally takes the seat.
    fn continue_until_two_round(&mut self,round:RoundIndex,continuing:&[CandidateIndex],tally:&RoundTally,record:&mut RoundRecord) -> Result<bool,TabulationError> {
        if continuing.len()<=2 {
            // the undeclared write in bucket can be one of the last two standing but never takes the seat
            let electable : Vec<CandidateIndex> = continuing.iter().copied().filter(|&c|!self.roster.is_undeclared_write_in(c)).collect();
            let top = electable.iter().copied().max_by_key(|&c|tally.count(c)).ok_or_else(||TabulationError::Invariant("no continuing candidates remain to elect".to_string()))?;
            let top_tally = tally.count(top);
            let tied : Vec<CandidateIndex> = electable.iter().copied().filter(|&c|tally.count(c)==top_tally).collect();
            let winner = if tied.len()==1 { top } else {
                let winner = self.tiebreaker.resolve(&tied,TieDirection::Winner,round,&self.transcript.rounds)?;
                record.tie_breaks.push(TieBreakRecord{round,tied,selected:winner,mode:self.tiebreaker.mode()});
                winner
            };
            info!("round {} : elected {} as the higher of the last two standing",round,self.roster.name(winner));
            self.transcript.winners.insert(winner,round);
            record.elected.push(winner);
            return Ok(true);
        }
        self.eliminate_for_round(round,continuing,tally,record)?;
        Ok(false)
    }

    /// Register every given candidate as a winner. Callers hand over the full field of
    /// electable survivors; ending a pass with empty seats is not a legal outcome.
    fn elect_all(&mut self,round:RoundIndex,candidates:&[CandidateIndex],record:&mut RoundRecord) -> Result<(),TabulationError> {
        for &candidate in candidates {
            info!("round {} : elected {} (all remaining seats filled bottoms-up)",round,self.roster.name(candidate));
            self.transcript.winners.insert(candidate,round);
            record.elected.push(candidate);
        }
        if self.transcript.winners.len()<self.seats {
            return Err(TabulationError::Invariant(format!("tabulation ended with {} of {} seats filled",self.transcript.winners.len(),self.seats)));
        }
        Ok(())
    }

    /// Walk every live ballot to its highest-ranked continuing candidate and
    /// credit the ballot's current fractional weight there, mirroring into the precinct
    /// tally when per-precinct output is on. Returns the round tally and the ballot
    /// weight that exhausted during the walk.
    fn apply_votes(&mut self,round:RoundIndex,continuing:&[CandidateIndex]) -> Result<(RoundTally,FixedDecimal),TabulationError> {
        let mut continuing_flags = vec![false;self.roster.len()];
        for &c in continuing { continuing_flags[c.0]=true; }
        let mut tally = RoundTally::zeroed(self.roster.len(),self.scale);
        let mut newly_exhausted = FixedDecimal::zero(self.scale);
        if self.by_precinct {
            for rounds in self.transcript.precinct_tallies.values_mut() {
                rounds.push(RoundTally::zeroed(self.roster.len(),self.scale));
            }
        }
        for cvr in self.cvrs.iter_mut() {
            if cvr.is_exhausted() { continue; }
            cvr.clear_recipient();
            match walk_ballot(cvr,&continuing_flags,self.rules)? {
                WalkOutcome::CountFor(candidate) => {
                    let weight = cvr.fractional_transfer_value();
                    tally.add(candidate,weight);
                    if self.by_precinct {
                        if let Some(precinct) = cvr.precinct() {
                            if let Some(rounds) = self.transcript.precinct_tallies.get_mut(precinct) {
                                if let Some(current) = rounds.last_mut() { current.add(candidate,weight); }
                            }
                        }
                    }
                    cvr.record_counted(round,candidate);
                }
                WalkOutcome::Ignore(reason) => { cvr.record_ignored(round,reason); }
                WalkOutcome::Exhaust(reason) => {
                    newly_exhausted+=cvr.fractional_transfer_value();
                    cvr.exhaust(round,reason);
                }
            }
        }
        Ok((tally,newly_exhausted))
    }
}

enum WalkOutcome {
    CountFor(CandidateIndex),
    Ignore(IgnoreReason),
    Exhaust(ExhaustReason),
}

/// Walk one ballot's ranks in ascending order and decide what it does this round.
/// Pure with respect to the ballot; the driver applies the outcome.
fn walk_ballot(cvr:&CastVoteRecord,continuing:&[bool],rules:&Rules) -> Result<WalkOutcome,TabulationError> {
    let cutoff = match rules.max_rankings_allowed { MaxRankings::Max => u32::MAX, MaxRankings::UpTo(n) => n };
    let is_continuing = |c:CandidateIndex|continuing[c.0];
    // a ballot with no continuing candidate at any usable rank can never count again
    let any_continuing = cvr.rankings().iter()
        .filter(|r|r.rank<=cutoff)
        .any(|r|r.marks.iter().filter_map(BallotMark::declared).any(&is_continuing));
    if !any_continuing { return Ok(WalkOutcome::Exhaust(ExhaustReason::NoContinuingCandidates)); }
    let mut last_rank : u32 = 0;
    let mut seen = vec![false;continuing.len()];
    for ranking in cvr.rankings() {
        if ranking.rank>cutoff { break; }
        match overvote_decision(&ranking.marks,rules.overvote_rule,is_continuing)? {
            OvervoteDecision::Exhaust => return Ok(WalkOutcome::Exhaust(ExhaustReason::Overvote)),
            OvervoteDecision::Ignore => return Ok(WalkOutcome::Ignore(IgnoreReason::Overvote)),
            OvervoteDecision::Skip => {
                for c in ranking.marks.iter().filter_map(BallotMark::declared) { seen[c.0]=true; }
                continue;
            }
            OvervoteDecision::None => {}
        }
        if let MaxSkippedRanks::UpTo(max) = rules.max_skipped_ranks_allowed {
            if ranking.rank-last_rank>max+1 { return Ok(WalkOutcome::Exhaust(ExhaustReason::Undervote)); }
        }
        if rules.exhaust_on_duplicate_candidate
            && ranking.marks.iter().filter_map(BallotMark::declared).any(|c|seen[c.0]) {
            return Ok(WalkOutcome::Exhaust(ExhaustReason::DuplicateCandidate));
        }
        let mut continuing_here = ranking.marks.iter().filter_map(BallotMark::declared).filter(|&c|is_continuing(c));
        match (continuing_here.next(),continuing_here.next()) {
            (Some(candidate),None) => return Ok(WalkOutcome::CountFor(candidate)),
            _ => {
                last_rank=ranking.rank;
                for c in ranking.marks.iter().filter_map(BallotMark::declared) { seen[c.0]=true; }
            }
        }
    }
    Ok(WalkOutcome::Exhaust(ExhaustReason::NoContinuingCandidates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cast_vote_record::RankMarks;
    use crate::config::OvervoteRule;

    fn rules() -> Rules { Rules::default() }

    fn walk(cvr:&CastVoteRecord,continuing:&[bool],rules:&Rules) -> WalkOutcome {
        walk_ballot(cvr,continuing,rules).unwrap()
    }

    #[test]
    fn ballot_counts_for_highest_continuing_choice() {
        let cvr = CastVoteRecord::simple("f","1",&[CandidateIndex(0),CandidateIndex(1),CandidateIndex(2)]);
        assert!(matches!(walk(&cvr,&[true,true,true],&rules()),WalkOutcome::CountFor(CandidateIndex(0))));
        assert!(matches!(walk(&cvr,&[false,true,true],&rules()),WalkOutcome::CountFor(CandidateIndex(1))));
        assert!(matches!(walk(&cvr,&[false,false,false],&rules()),WalkOutcome::Exhaust(ExhaustReason::NoContinuingCandidates)));
    }

    #[test]
    fn undervote_gap_exhausts() {
        // ranks 1 then 4: a gap of two skipped ranks
        let cvr = CastVoteRecord::new("f","1",None,vec![],vec![
            RankMarks{rank:1,marks:vec![BallotMark::Declared(CandidateIndex(0))]},
            RankMarks{rank:4,marks:vec![BallotMark::Declared(CandidateIndex(1))]},
        ]);
        let mut r = rules();
        r.max_skipped_ranks_allowed=MaxSkippedRanks::UpTo(1);
        // candidate 0 is gone, so the walk advances past rank 1 and measures the gap
        assert!(matches!(walk(&cvr,&[false,true],&r),WalkOutcome::Exhaust(ExhaustReason::Undervote)));
        r.max_skipped_ranks_allowed=MaxSkippedRanks::UpTo(2);
        assert!(matches!(walk(&cvr,&[false,true],&r),WalkOutcome::CountFor(CandidateIndex(1))));
        r.max_skipped_ranks_allowed=MaxSkippedRanks::Unlimited;
        assert!(matches!(walk(&cvr,&[false,true],&r),WalkOutcome::CountFor(CandidateIndex(1))));
    }

    #[test]
    fn duplicate_candidate_exhausts_when_configured() {
        // candidate 0 at ranks 1 and 2, then candidate 1
        let cvr = CastVoteRecord::new("f","1",None,vec![],vec![
            RankMarks{rank:1,marks:vec![BallotMark::Declared(CandidateIndex(0))]},
            RankMarks{rank:2,marks:vec![BallotMark::Declared(CandidateIndex(0))]},
            RankMarks{rank:3,marks:vec![BallotMark::Declared(CandidateIndex(1))]},
        ]);
        let mut r = rules();
        r.exhaust_on_duplicate_candidate=true;
        assert!(matches!(walk(&cvr,&[false,true],&r),WalkOutcome::Exhaust(ExhaustReason::DuplicateCandidate)));
        r.exhaust_on_duplicate_candidate=false;
        assert!(matches!(walk(&cvr,&[false,true],&r),WalkOutcome::CountFor(CandidateIndex(1))));
    }

    #[test]
    fn overvote_ignore_sets_the_ballot_aside_for_the_round() {
        let cvr = CastVoteRecord::new("f","1",None,vec![],vec![
            RankMarks{rank:1,marks:vec![BallotMark::Declared(CandidateIndex(0)),BallotMark::Declared(CandidateIndex(1))]},
            RankMarks{rank:2,marks:vec![BallotMark::Declared(CandidateIndex(2))]},
        ]);
        let mut r = rules();
        r.overvote_rule=OvervoteRule::IgnoreIfMultipleContinuing;
        assert!(matches!(walk(&cvr,&[true,true,true],&r),WalkOutcome::Ignore(IgnoreReason::Overvote)));
        // once one of the two is out, the remaining single continuing candidate counts
        assert!(matches!(walk(&cvr,&[true,false,true],&r),WalkOutcome::CountFor(CandidateIndex(0))));
    }

    #[test]
    fn max_rankings_cutoff_ends_the_walk() {
        let cvr = CastVoteRecord::simple("f","1",&[CandidateIndex(0),CandidateIndex(1),CandidateIndex(2)]);
        let mut r = rules();
        r.max_rankings_allowed=MaxRankings::UpTo(2);
        // candidate 2 sits at rank 3, beyond the cutoff
        assert!(matches!(walk(&cvr,&[false,false,true],&r),WalkOutcome::Exhaust(ExhaustReason::NoContinuingCandidates)));
        r.max_rankings_allowed=MaxRankings::Max;
        assert!(matches!(walk(&cvr,&[false,false,true],&r),WalkOutcome::CountFor(CandidateIndex(2))));
    }
}
