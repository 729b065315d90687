//! Resolution of ties between candidates with identical tallies. Given identical inputs
//! and an identical seed the resolution is identical; nothing here consults a clock, an
//! address, or a hash iteration order.

use rand::Rng;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha20Rng;
use crate::ballot_metadata::{CandidateIndex, RoundIndex};
use crate::config::{Rules, TieBreakMode};
use crate::fixed_decimal::FixedDecimal;
use crate::transcript::RoundRecord;
use crate::TabulationError;

/// Whether the tie-breaker is singling out the candidate to eliminate or the candidate
/// to elect. The previous-round-counts walk looks for the minimum in the first case and
/// the maximum in the second; the permutation is read from opposite ends.
#[derive(Clone,Copy,Debug,Eq, PartialEq)]
pub enum TieDirection {
    Loser,
    Winner,
}

/// The capability the INTERACTIVE modes use to ask a human. Injected by the caller; the
/// engine itself does no I/O. Returning a candidate outside the tied set (or nothing)
/// surfaces as [TabulationError::TieBreakUnresolved].
pub trait TieBreakOracle {
    fn select(&mut self,tied:&[CandidateIndex],round:RoundIndex,direction:TieDirection) -> Option<CandidateIndex>;
}

/// Shuffle the full candidate list deterministically. A function of the seed and the
/// list length only; computed once, at configuration load.
pub fn generate_candidate_permutation(seed:u64,num_candidates:usize) -> Vec<CandidateIndex> {
    let mut permutation : Vec<CandidateIndex> = (0..num_candidates).map(CandidateIndex).collect();
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    permutation.shuffle(&mut rng);
    permutation
}

/// Produces a single loser (or winner) from a set of tied candidates.
pub struct Tiebreaker {
    mode : TieBreakMode,
    seed : u64,
    /// position of each candidate in the generated permutation, for GENERATE_PERMUTATION.
    permutation_position : Option<Vec<usize>>,
    oracle : Option<Box<dyn TieBreakOracle>>,
}

impl Tiebreaker {
    pub fn new(rules:&Rules,num_candidates:usize,oracle:Option<Box<dyn TieBreakOracle>>) -> Self {
        let seed = rules.random_seed.unwrap_or(0);
        let permutation_position = if rules.tiebreak_mode==TieBreakMode::GeneratePermutation {
            let permutation = generate_candidate_permutation(seed,num_candidates);
            let mut positions = vec![0;num_candidates];
            for (position,&candidate) in permutation.iter().enumerate() { positions[candidate.0]=position; }
            Some(positions)
        } else { None };
        Tiebreaker{mode:rules.tiebreak_mode,seed,permutation_position,oracle}
    }

    pub fn mode(&self) -> TieBreakMode { self.mode }

    /// Resolve a tie amongst `tied`, returning the single candidate the direction asks for.
    /// `rounds` is the tally history of the rounds before the one the tie arose in.
    pub fn resolve(&mut self,tied:&[CandidateIndex],direction:TieDirection,round:RoundIndex,rounds:&[RoundRecord]) -> Result<CandidateIndex,TabulationError> {
        // canonical ordering of the tied set
        let mut tied : Vec<CandidateIndex> = tied.to_vec();
        tied.sort();
        if tied.len()==1 { return Ok(tied[0]); }
        match self.mode {
            TieBreakMode::Random => Ok(self.random_choice(&tied,round)),
            TieBreakMode::Interactive => self.ask_oracle(&tied,round,direction),
            TieBreakMode::PreviousRoundCountsThenRandom => {
                match previous_round_extremum(&tied,direction,rounds) {
                    Some(c) => Ok(c),
                    None => Ok(self.random_choice(&tied,round)),
                }
            }
            TieBreakMode::PreviousRoundCountsThenInteractive => {
                match previous_round_extremum(&tied,direction,rounds) {
                    Some(c) => Ok(c),
                    None => self.ask_oracle(&tied,round,direction),
                }
            }
            TieBreakMode::GeneratePermutation => {
                let positions = self.permutation_position.as_ref().expect("permutation generated at construction");
                let extreme = match direction {
                    TieDirection::Winner => tied.iter().min_by_key(|c|positions[c.0]),
                    TieDirection::Loser => tied.iter().max_by_key(|c|positions[c.0]),
                };
                Ok(*extreme.expect("tied set is non-empty"))
            }
            TieBreakMode::Unknown => Err(TabulationError::Invariant("unknown tiebreak mode survived validation".to_string())),
        }
    }

    /// uniform selection over the canonical ordering, PRNG seeded from the configured
    /// seed XORed with the current round.
    fn random_choice(&self,tied:&[CandidateIndex],round:RoundIndex) -> CandidateIndex {
        let mut rng = ChaCha20Rng::seed_from_u64(self.seed ^ round.0 as u64);
        tied[rng.gen_range(0..tied.len())]
    }

    fn ask_oracle(&mut self,tied:&[CandidateIndex],round:RoundIndex,direction:TieDirection) -> Result<CandidateIndex,TabulationError> {
        let selection = match self.oracle.as_mut() {
            Some(oracle) => oracle.select(tied,round,direction),
            None => None,
        };
        match selection {
            Some(c) if tied.contains(&c) => Ok(c),
            _ => Err(TabulationError::TieBreakUnresolved{round,tied:tied.to_vec()}),
        }
    }
}

/// For each prior round, most recent first, rebuild the tally restricted to the tied set;
/// the unique minimum (for a loser) or maximum (for a winner) wins the tie.
fn previous_round_extremum(tied:&[CandidateIndex],direction:TieDirection,rounds:&[RoundRecord]) -> Option<CandidateIndex> {
    for record in rounds.iter().rev() {
        let restricted : Vec<(CandidateIndex,FixedDecimal)> = tied.iter().map(|&c|(c,record.tally.count(c))).collect();
        let extreme : FixedDecimal = match direction {
            TieDirection::Loser => restricted.iter().map(|(_,t)|*t).min().expect("tied set is non-empty"),
            TieDirection::Winner => restricted.iter().map(|(_,t)|*t).max().expect("tied set is non-empty"),
        };
        let holders : Vec<CandidateIndex> = restricted.iter().filter(|(_,t)|*t==extreme).map(|(c,_)|*c).collect();
        if holders.len()==1 { return Some(holders[0]); }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Rules;
    use crate::tally::RoundTally;

    fn rules_with_mode(mode:TieBreakMode,seed:u64) -> Rules {
        Rules{tiebreak_mode:mode,random_seed:Some(seed),..Rules::default()}
    }

    fn round_record(round:usize,tallies:&[usize]) -> RoundRecord {
        let mut tally = RoundTally::zeroed(tallies.len(),4);
        for (i,&v) in tallies.iter().enumerate() { tally.add(CandidateIndex(i),FixedDecimal::from_usize(v,4)); }
        RoundRecord{
            round: RoundIndex(round),
            tally,
            threshold: FixedDecimal::zero(4),
            elected: vec![],
            eliminated: vec![],
            batch_eliminations: vec![],
            tie_breaks: vec![],
            newly_exhausted: FixedDecimal::zero(4),
            exhausted_total: FixedDecimal::zero(4),
        }
    }

    #[test]
    fn random_mode_is_deterministic_per_seed_and_round() {
        let tied = [CandidateIndex(1),CandidateIndex(2)];
        let mut a = Tiebreaker::new(&rules_with_mode(TieBreakMode::Random,1),3,None);
        let mut b = Tiebreaker::new(&rules_with_mode(TieBreakMode::Random,1),3,None);
        let choice_a = a.resolve(&tied,TieDirection::Loser,RoundIndex(1),&[]).unwrap();
        let choice_b = b.resolve(&tied,TieDirection::Loser,RoundIndex(1),&[]).unwrap();
        assert_eq!(choice_a,choice_b);
        assert!(tied.contains(&choice_a));
    }

    #[test]
    fn previous_round_counts_find_the_unique_extremum() {
        let rounds = vec![round_record(1,&[4,3,5]),round_record(2,&[4,4,4])];
        let tied = [CandidateIndex(0),CandidateIndex(1),CandidateIndex(2)];
        let mut t = Tiebreaker::new(&rules_with_mode(TieBreakMode::PreviousRoundCountsThenRandom,7),3,None);
        // round 2 is all equal; round 1 separates: 1 is the unique minimum, 2 the unique maximum
        assert_eq!(CandidateIndex(1),t.resolve(&tied,TieDirection::Loser,RoundIndex(3),&rounds).unwrap());
        assert_eq!(CandidateIndex(2),t.resolve(&tied,TieDirection::Winner,RoundIndex(3),&rounds).unwrap());
    }

    #[test]
    fn previous_round_counts_fall_back_when_no_extremum_emerges() {
        let rounds = vec![round_record(1,&[4,4])];
        let tied = [CandidateIndex(0),CandidateIndex(1)];
        let mut a = Tiebreaker::new(&rules_with_mode(TieBreakMode::PreviousRoundCountsThenRandom,9),2,None);
        let mut b = Tiebreaker::new(&rules_with_mode(TieBreakMode::PreviousRoundCountsThenRandom,9),2,None);
        assert_eq!(a.resolve(&tied,TieDirection::Loser,RoundIndex(2),&rounds).unwrap(),
                   b.resolve(&tied,TieDirection::Loser,RoundIndex(2),&rounds).unwrap());
    }

    #[test]
    fn interactive_without_an_oracle_is_unresolved() {
        let tied = [CandidateIndex(0),CandidateIndex(1)];
        let mut t = Tiebreaker::new(&rules_with_mode(TieBreakMode::Interactive,0),2,None);
        assert!(matches!(t.resolve(&tied,TieDirection::Loser,RoundIndex(1),&[]),Err(TabulationError::TieBreakUnresolved{..})));
    }

    struct FixedOracle(CandidateIndex);
    impl TieBreakOracle for FixedOracle {
        fn select(&mut self,_tied:&[CandidateIndex],_round:RoundIndex,_direction:TieDirection) -> Option<CandidateIndex> { Some(self.0) }
    }

    #[test]
    fn interactive_oracle_selection_must_be_amongst_the_tied() {
        let tied = [CandidateIndex(0),CandidateIndex(1)];
        let mut good = Tiebreaker::new(&rules_with_mode(TieBreakMode::Interactive,0),3,Some(Box::new(FixedOracle(CandidateIndex(1)))));
        assert_eq!(CandidateIndex(1),good.resolve(&tied,TieDirection::Loser,RoundIndex(1),&[]).unwrap());
        let mut bad = Tiebreaker::new(&rules_with_mode(TieBreakMode::Interactive,0),3,Some(Box::new(FixedOracle(CandidateIndex(2)))));
        assert!(matches!(bad.resolve(&tied,TieDirection::Loser,RoundIndex(1),&[]),Err(TabulationError::TieBreakUnresolved{..})));
    }

    #[test]
    fn permutation_is_a_function_of_seed_and_list_only() {
        let p1 = generate_candidate_permutation(42,6);
        let p2 = generate_candidate_permutation(42,6);
        assert_eq!(p1,p2);
        let mut sorted = p1.clone();
        sorted.sort();
        assert_eq!((0..6).map(CandidateIndex).collect::<Vec<_>>(),sorted);
    }
}
