//! The contest configuration consumed by the tabulator. The file format it is read from
//! (and the GUI that edits it) live outside this crate; this is the validated value object.
//! Field names serialize in the camelCase form the configuration documents use.
//!
//! Every enum shaped rule field admits an `Unknown` sentinel for loaders to map
//! unrecognized strings onto. The validator rejects the sentinel; the tabulation code may
//! then assume exhaustive coverage of the real variants.

use serde::{Serialize, Serializer, Deserialize, Deserializer};
use std::path::PathBuf;
use crate::ballot_metadata::{Candidate, CandidateRoster, is_false};

/// Information about the contest and everything governing how it is counted.
#[derive(Debug,Serialize,Deserialize,Clone)]
#[serde(rename_all = "camelCase")]
pub struct ContestConfig {
    /// Must equal [crate::TABULATOR_VERSION] or the validator refuses to count.
    pub tabulator_version : String,
    pub output_settings : OutputSettings,
    pub cvr_file_sources : Vec<CvrSource>,
    pub candidates : Vec<Candidate>,
    pub rules : Rules,
}

#[derive(Debug,Serialize,Deserialize,Clone)]
#[serde(rename_all = "camelCase")]
pub struct OutputSettings {
    pub contest_name : String,
    #[serde(skip_serializing_if = "Option::is_none",default)]
    pub contest_jurisdiction : Option<String>,
    #[serde(skip_serializing_if = "Option::is_none",default)]
    pub contest_office : Option<String>,
    #[serde(skip_serializing_if = "Option::is_none",default)]
    pub contest_date : Option<String>,
    /// Where callers write results. Not used by the engine itself.
    #[serde(skip_serializing_if = "Option::is_none",default)]
    pub output_directory : Option<PathBuf>,
    #[serde(skip_serializing_if = "is_false",default)]
    pub tabulate_by_precinct : bool,
    #[serde(skip_serializing_if = "is_false",default)]
    pub generate_cdf_json : bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        OutputSettings{
            contest_name: String::new(),
            contest_jurisdiction: None,
            contest_office: None,
            contest_date: None,
            output_directory: None,
            tabulate_by_precinct: false,
            generate_cdf_json: false,
        }
    }
}

/// Where one file of cast vote records came from, and how to find the votes in it.
/// The file is read by an external parser; the engine only checks the description.
#[derive(Debug,Serialize,Deserialize,Clone)]
#[serde(rename_all = "camelCase")]
pub struct CvrSource {
    pub file_path : PathBuf,
    pub provider : Provider,
    #[serde(skip_serializing_if = "Option::is_none",default)]
    pub first_vote_column_index : Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none",default)]
    pub first_vote_row_index : Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none",default)]
    pub id_column_index : Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none",default)]
    pub precinct_column_index : Option<u32>,
}

#[derive(Debug,Serialize,Deserialize,Clone,Copy,PartialEq,Eq)]
pub enum Provider {
    #[serde(rename = "CDF")]
    Cdf,
    #[serde(rename = "ES&S")]
    Ess,
    Dominion,
    Unknown,
}

impl Provider {
    pub fn is_cdf(self) -> bool { self==Provider::Cdf }
}

#[derive(Debug,Serialize,Deserialize,Clone,Copy,PartialEq,Eq)]
#[serde(rename_all = "camelCase")]
pub enum TieBreakMode {
    Random,
    Interactive,
    PreviousRoundCountsThenRandom,
    PreviousRoundCountsThenInteractive,
    GeneratePermutation,
    Unknown,
}

impl TieBreakMode {
    /// true iff the mode draws on the configured random seed.
    pub fn uses_random_seed(self) -> bool {
        matches!(self,TieBreakMode::Random|TieBreakMode::PreviousRoundCountsThenRandom|TieBreakMode::GeneratePermutation)
    }
}

#[derive(Debug,Serialize,Deserialize,Clone,Copy,PartialEq,Eq)]
#[serde(rename_all = "camelCase")]
pub enum OvervoteRule {
    ExhaustImmediately,
    AlwaysSkipToNextRank,
    ExhaustIfAnyContinuing,
    IgnoreIfAnyContinuing,
    ExhaustIfMultipleContinuing,
    IgnoreIfMultipleContinuing,
    Unknown,
}

#[derive(Debug,Serialize,Deserialize,Clone,Copy,PartialEq,Eq)]
#[serde(rename_all = "camelCase")]
pub enum WinnerElectionMode {
    SingleSeatMajority,
    SingleSeatContinueUntilTwoCandidatesRemain,
    MultiSeatAllowMultipleWinnersPerRound,
    MultiSeatAllowOnlyOneWinnerPerRound,
    MultiSeatBottomsUp,
    MultiSeatSequentialWinnerTakesAll,
    Unknown,
}

impl WinnerElectionMode {
    pub fn is_multi_seat(self) -> bool {
        matches!(self,WinnerElectionMode::MultiSeatAllowMultipleWinnersPerRound
            |WinnerElectionMode::MultiSeatAllowOnlyOneWinnerPerRound
            |WinnerElectionMode::MultiSeatBottomsUp
            |WinnerElectionMode::MultiSeatSequentialWinnerTakesAll)
    }
}

/// Either a concrete cap on the number of rankings a ballot may use, or no cap.
/// Serializes as the string `max` or as an integer.
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum MaxRankings {
    Max,
    UpTo(u32),
}

/// How many consecutive skipped ranks a ballot tolerates before it exhausts.
/// Serializes as the string `unlimited` or as an integer.
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum MaxSkippedRanks {
    Unlimited,
    UpTo(u32),
}

// These two serialize as a bare word or a number, which derive cannot express, so the
// impls are by hand like the decimal type's.

#[derive(Deserialize)]
#[serde(untagged)]
enum WordOrNumber {
    Word(String),
    Number(u64),
}

impl Serialize for MaxRankings {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error> where S: Serializer {
        match self {
            MaxRankings::Max => serializer.serialize_str("max"),
            MaxRankings::UpTo(n) => serializer.serialize_u32(*n),
        }
    }
}
impl <'de> Deserialize<'de> for MaxRankings {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error> where D: Deserializer<'de> {
        match WordOrNumber::deserialize(deserializer)? {
            WordOrNumber::Word(w) if w=="max" => Ok(MaxRankings::Max),
            WordOrNumber::Word(w) => Err(serde::de::Error::custom(format!("expected \"max\" or an integer, found {:?}",w))),
            WordOrNumber::Number(n) => Ok(MaxRankings::UpTo(n.min(u32::MAX as u64) as u32)),
        }
    }
}

impl Serialize for MaxSkippedRanks {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error> where S: Serializer {
        match self {
            MaxSkippedRanks::Unlimited => serializer.serialize_str("unlimited"),
            MaxSkippedRanks::UpTo(n) => serializer.serialize_u32(*n),
        }
    }
}
impl <'de> Deserialize<'de> for MaxSkippedRanks {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error> where D: Deserializer<'de> {
        match WordOrNumber::deserialize(deserializer)? {
            WordOrNumber::Word(w) if w=="unlimited" => Ok(MaxSkippedRanks::Unlimited),
            WordOrNumber::Word(w) => Err(serde::de::Error::custom(format!("expected \"unlimited\" or an integer, found {:?}",w))),
            WordOrNumber::Number(n) => Ok(MaxSkippedRanks::UpTo(n.min(u32::MAX as u64) as u32)),
        }
    }
}

/// The semantic rules of the count.
#[derive(Debug,Serialize,Deserialize,Clone)]
#[serde(rename_all = "camelCase")]
pub struct Rules {
    pub tiebreak_mode : TieBreakMode,
    pub overvote_rule : OvervoteRule,
    pub winner_election_mode : WinnerElectionMode,
    pub max_rankings_allowed : MaxRankings,
    pub max_skipped_ranks_allowed : MaxSkippedRanks,
    pub number_of_winners : usize,
    pub decimal_places_for_vote_arithmetic : u8,
    #[serde(default)]
    pub minimum_vote_threshold : u64,
    #[serde(skip_serializing_if = "is_false",default)]
    pub non_integer_winning_threshold : bool,
    #[serde(skip_serializing_if = "is_false",default)]
    pub hare_quota : bool,
    #[serde(skip_serializing_if = "is_false",default)]
    pub batch_elimination : bool,
    #[serde(skip_serializing_if = "is_false",default)]
    pub exhaust_on_duplicate_candidate : bool,
    #[serde(skip_serializing_if = "is_false",default)]
    pub treat_blank_as_undeclared_write_in : bool,
    #[serde(skip_serializing_if = "Option::is_none",default)]
    pub undeclared_write_in_label : Option<String>,
    #[serde(skip_serializing_if = "Option::is_none",default)]
    pub overvote_label : Option<String>,
    #[serde(skip_serializing_if = "Option::is_none",default)]
    pub undervote_label : Option<String>,
    #[serde(skip_serializing_if = "Option::is_none",default)]
    pub random_seed : Option<u64>,
}

impl Default for Rules {
    fn default() -> Self {
        Rules{
            tiebreak_mode: TieBreakMode::Random,
            overvote_rule: OvervoteRule::ExhaustImmediately,
            winner_election_mode: WinnerElectionMode::SingleSeatMajority,
            max_rankings_allowed: MaxRankings::Max,
            max_skipped_ranks_allowed: MaxSkippedRanks::Unlimited,
            number_of_winners: 1,
            decimal_places_for_vote_arithmetic: 4,
            minimum_vote_threshold: 0,
            non_integer_winning_threshold: false,
            hare_quota: false,
            batch_elimination: false,
            exhaust_on_duplicate_candidate: false,
            treat_blank_as_undeclared_write_in: false,
            undeclared_write_in_label: None,
            overvote_label: None,
            undervote_label: None,
            random_seed: Some(0),
        }
    }
}

impl ContestConfig {
    /// The candidates the tabulation counts for: declared non-excluded candidates in
    /// declaration order, plus the undeclared write in bucket if one is configured.
    pub fn roster(&self) -> CandidateRoster {
        let names : Vec<String> = self.candidates.iter().filter(|c|!c.excluded).map(|c|c.name.clone()).collect();
        CandidateRoster::new(names,self.rules.undeclared_write_in_label.as_deref())
    }
}
