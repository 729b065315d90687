//! Static checks over the contest configuration. Tabulation only proceeds on a clean
//! bill; the validator reports every violation it finds rather than stopping at the
//! first, so an operator can fix a configuration in one edit.

use std::collections::HashSet;
use std::path::PathBuf;
use crate::ballot_metadata::Candidate;
use crate::config::{ContestConfig, CvrSource, OvervoteRule, Provider, Rules, TieBreakMode, WinnerElectionMode, MaxRankings};
use crate::fixed_decimal::{MIN_SCALE, MAX_SCALE};
use crate::{RESERVED_TALLY_STRINGS, TABULATOR_VERSION};

/// One way a configuration can be wrong.
#[derive(thiserror::Error,Debug,Clone,PartialEq,Eq)]
pub enum ValidationError {
    #[error("config was generated by tabulator version {found} but this is version {expected}")]
    WrongTabulatorVersion{found:String,expected:String},
    #[error("contest name must not be empty")]
    ContestNameMissing,
    #[error("at least one cast vote record source is required")]
    NoCvrSources,
    #[error("cast vote record file {0:?} does not exist")]
    CvrFileMissing(PathBuf),
    #[error("cast vote record file {0:?} is listed more than once")]
    DuplicateCvrFile(PathBuf),
    #[error("source {0:?} has an unrecognized provider")]
    UnknownProvider(PathBuf),
    #[error("a CDF source must be the only source")]
    CdfNotSoleSource,
    #[error("a CDF source cannot be tabulated by precinct")]
    CdfIncompatibleWithPrecinctTabulation,
    #[error("source {path:?} is missing required field {field}")]
    MissingSourceField{path:PathBuf,field:&'static str},
    #[error("source {path:?} field {field} is {value}, outside [{min},{max}]")]
    SourceFieldOutOfRange{path:PathBuf,field:&'static str,value:u32,min:u32,max:u32},
    #[error("source {0:?} needs a precinct column to tabulate by precinct")]
    PrecinctColumnRequired(PathBuf),
    #[error("at least one non-excluded declared candidate is required")]
    NoEligibleCandidates,
    #[error("candidate name {0} appears more than once")]
    DuplicateCandidateName(String),
    #[error("candidate code {0} appears more than once")]
    DuplicateCandidateCode(String),
    #[error("candidate {0} has no code although other candidates do")]
    MissingCandidateCode(String),
    #[error("label {0} collides with a candidate name or code")]
    LabelCollidesWithCandidate(String),
    #[error("label or name {0} is a reserved tabulation string")]
    ReservedString(String),
    #[error("labels must be pairwise distinct, but {0} is reused")]
    LabelsNotDistinct(String),
    #[error("unrecognized tiebreak mode")]
    UnknownTiebreakMode,
    #[error("unrecognized overvote rule")]
    UnknownOvervoteRule,
    #[error("unrecognized winner election mode")]
    UnknownWinnerElectionMode,
    #[error("an explicit overvote label only works with exhaustImmediately or alwaysSkipToNextRank")]
    OvervoteLabelNeedsSimpleRule,
    #[error("tiebreak mode requires a random seed")]
    RandomSeedRequired,
    #[error("number of winners {found} must be between 1 and the number of declared candidates ({declared})")]
    NumberOfWinnersOutOfRange{found:usize,declared:usize},
    #[error("decimal places for vote arithmetic {0} must be between 1 and 20")]
    DecimalPlacesOutOfRange(u8),
    #[error("minimum vote threshold {0} must be at most 1000000")]
    MinimumVoteThresholdOutOfRange(u64),
    #[error("maximum rankings allowed must be \"max\" or a positive integer")]
    MaxRankingsNotPositive,
    #[error("a single-seat winner election mode requires exactly one winner")]
    SingleSeatModeNeedsOneWinner,
    #[error("a multi-seat winner election mode requires more than one winner")]
    MultiSeatModeNeedsMultipleWinners,
    #[error("batch elimination is only available in single-seat contests")]
    BatchEliminationNeedsSingleSeat,
    #[error("batch elimination cannot be combined with bottoms-up tabulation")]
    BatchEliminationIncompatibleWithBottomsUp,
    #[error("the Hare quota only applies to multi-seat contests")]
    HareQuotaNeedsMultipleWinners,
    #[error("treating blanks as undeclared write-ins requires an undeclared write-in label")]
    UndeclaredWriteInLabelRequired,
}

/// Run every check. An empty return means the configuration may be tabulated.
pub fn validate(config:&ContestConfig) -> Vec<ValidationError> {
    let mut errors = vec![];
    if config.tabulator_version!=TABULATOR_VERSION {
        errors.push(ValidationError::WrongTabulatorVersion{found:config.tabulator_version.clone(),expected:TABULATOR_VERSION.to_string()});
    }
    if config.output_settings.contest_name.trim().is_empty() { errors.push(ValidationError::ContestNameMissing); }
    check_sources(config,&mut errors);
    check_candidates(&config.candidates,&mut errors);
    check_labels(config,&mut errors);
    check_rules(&config.rules,config.candidates.len(),&mut errors);
    errors
}

impl ContestConfig {
    pub fn is_valid(&self) -> bool { validate(self).is_empty() }
}

fn check_sources(config:&ContestConfig,errors:&mut Vec<ValidationError>) {
    let sources = &config.cvr_file_sources;
    if sources.is_empty() {
        errors.push(ValidationError::NoCvrSources);
        return;
    }
    let mut resolved_paths : HashSet<PathBuf> = HashSet::new();
    for source in sources {
        if source.provider==Provider::Unknown { errors.push(ValidationError::UnknownProvider(source.file_path.clone())); }
        if !source.file_path.exists() {
            errors.push(ValidationError::CvrFileMissing(source.file_path.clone()));
        }
        let resolved = source.file_path.canonicalize().unwrap_or_else(|_|source.file_path.clone());
        if !resolved_paths.insert(resolved) {
            errors.push(ValidationError::DuplicateCvrFile(source.file_path.clone()));
        }
        if source.provider.is_cdf() {
            if sources.len()>1 { errors.push(ValidationError::CdfNotSoleSource); }
            if config.output_settings.tabulate_by_precinct { errors.push(ValidationError::CdfIncompatibleWithPrecinctTabulation); }
        } else {
            check_index_field(source,"firstVoteColumnIndex",source.first_vote_column_index,true,1000,errors);
            check_index_field(source,"firstVoteRowIndex",source.first_vote_row_index,true,100000,errors);
            check_index_field(source,"idColumnIndex",source.id_column_index,false,1000,errors);
            check_index_field(source,"precinctColumnIndex",source.precinct_column_index,false,1000,errors);
            if config.output_settings.tabulate_by_precinct && source.precinct_column_index.is_none() {
                errors.push(ValidationError::PrecinctColumnRequired(source.file_path.clone()));
            }
        }
    }
}

fn check_index_field(source:&CvrSource,field:&'static str,value:Option<u32>,required:bool,max:u32,errors:&mut Vec<ValidationError>) {
    match value {
        None => if required { errors.push(ValidationError::MissingSourceField{path:source.file_path.clone(),field}); },
        Some(v) => if v<1||v>max { errors.push(ValidationError::SourceFieldOutOfRange{path:source.file_path.clone(),field,value:v,min:1,max}); },
    }
}

fn check_candidates(candidates:&[Candidate],errors:&mut Vec<ValidationError>) {
    if !candidates.iter().any(|c|!c.excluded) { errors.push(ValidationError::NoEligibleCandidates); }
    let mut names : HashSet<&str> = HashSet::new();
    for c in candidates {
        if !names.insert(c.name.as_str()) { errors.push(ValidationError::DuplicateCandidateName(c.name.clone())); }
    }
    let any_code = candidates.iter().any(|c|c.code.is_some());
    if any_code {
        let mut codes : HashSet<&str> = HashSet::new();
        for c in candidates {
            match c.code.as_deref() {
                Some(code) => { if !codes.insert(code) { errors.push(ValidationError::DuplicateCandidateCode(code.to_string())); } }
                None => errors.push(ValidationError::MissingCandidateCode(c.name.clone())),
            }
        }
    }
}

fn check_labels(config:&ContestConfig,errors:&mut Vec<ValidationError>) {
    let rules = &config.rules;
    let labels : Vec<&String> = [rules.overvote_label.as_ref(),rules.undervote_label.as_ref(),rules.undeclared_write_in_label.as_ref()].into_iter().flatten().collect();
    let mut seen : HashSet<&str> = HashSet::new();
    for label in &labels {
        if !seen.insert(label.as_str()) { errors.push(ValidationError::LabelsNotDistinct((*label).clone())); }
        if RESERVED_TALLY_STRINGS.contains(&label.as_str()) { errors.push(ValidationError::ReservedString((*label).clone())); }
        let collides = config.candidates.iter().any(|c|c.name==**label||c.code.as_deref()==Some(label.as_str()));
        if collides { errors.push(ValidationError::LabelCollidesWithCandidate((*label).clone())); }
    }
    for c in &config.candidates {
        if RESERVED_TALLY_STRINGS.contains(&c.name.as_str()) { errors.push(ValidationError::ReservedString(c.name.clone())); }
        if let Some(code) = c.code.as_deref() {
            if RESERVED_TALLY_STRINGS.contains(&code) { errors.push(ValidationError::ReservedString(code.to_string())); }
        }
    }
    if rules.overvote_label.is_some()
        && !matches!(rules.overvote_rule,OvervoteRule::ExhaustImmediately|OvervoteRule::AlwaysSkipToNextRank) {
        errors.push(ValidationError::OvervoteLabelNeedsSimpleRule);
    }
}

fn check_rules(rules:&Rules,num_declared:usize,errors:&mut Vec<ValidationError>) {
    if rules.tiebreak_mode==TieBreakMode::Unknown { errors.push(ValidationError::UnknownTiebreakMode); }
    if rules.overvote_rule==OvervoteRule::Unknown { errors.push(ValidationError::UnknownOvervoteRule); }
    if rules.winner_election_mode==WinnerElectionMode::Unknown { errors.push(ValidationError::UnknownWinnerElectionMode); }
    if rules.tiebreak_mode.uses_random_seed() && rules.random_seed.is_none() { errors.push(ValidationError::RandomSeedRequired); }
    if rules.number_of_winners<1 || rules.number_of_winners>num_declared.max(1) {
        errors.push(ValidationError::NumberOfWinnersOutOfRange{found:rules.number_of_winners,declared:num_declared});
    }
    if rules.decimal_places_for_vote_arithmetic<MIN_SCALE || rules.decimal_places_for_vote_arithmetic>MAX_SCALE {
        errors.push(ValidationError::DecimalPlacesOutOfRange(rules.decimal_places_for_vote_arithmetic));
    }
    if rules.minimum_vote_threshold>1_000_000 { errors.push(ValidationError::MinimumVoteThresholdOutOfRange(rules.minimum_vote_threshold)); }
    if rules.max_rankings_allowed==MaxRankings::UpTo(0) { errors.push(ValidationError::MaxRankingsNotPositive); }
    let multi = rules.number_of_winners>1;
    match rules.winner_election_mode {
        WinnerElectionMode::Unknown => {}
        mode if mode.is_multi_seat() && !multi => errors.push(ValidationError::MultiSeatModeNeedsMultipleWinners),
        mode if !mode.is_multi_seat() && multi => errors.push(ValidationError::SingleSeatModeNeedsOneWinner),
        _ => {}
    }
    if rules.batch_elimination && multi { errors.push(ValidationError::BatchEliminationNeedsSingleSeat); }
    if rules.batch_elimination && rules.winner_election_mode==WinnerElectionMode::MultiSeatBottomsUp {
        errors.push(ValidationError::BatchEliminationIncompatibleWithBottomsUp);
    }
    if rules.hare_quota && !multi { errors.push(ValidationError::HareQuotaNeedsMultipleWinners); }
    if rules.treat_blank_as_undeclared_write_in && rules.undeclared_write_in_label.is_none() {
        errors.push(ValidationError::UndeclaredWriteInLabelRequired);
    }
}
