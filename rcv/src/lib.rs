pub mod fixed_decimal;
pub mod ballot_metadata;
pub mod config;
pub mod config_validation;
pub mod cast_vote_record;
pub mod ballot_interpretation;
pub mod tally;
pub mod tie_resolution;
pub mod elimination;
pub mod tabulator;
pub mod transcript;

/// The engine version. A configuration names the version it was written for, and the
/// validator refuses to count under any other.
pub const TABULATOR_VERSION : &str = "0.1.0";

/// Strings with a fixed meaning in tally output; no candidate name, code or configured
/// label may use one.
pub const RESERVED_TALLY_STRINGS : [&str;3] = ["overvote","undervote","UWI"];

/// Why a tabulation run stopped without a result. Nothing is recovered inside the round
/// loop; whatever rounds were already recorded remain readable for post-mortem audit.
#[derive(thiserror::Error,Debug)]
pub enum TabulationError {
    #[error("configuration failed validation with {} violations",.0.len())]
    ConfigInvalid(Vec<crate::config_validation::ValidationError>),
    #[error("the tie between candidates {tied:?} in round {round} was not resolved")]
    TieBreakUnresolved{round:crate::ballot_metadata::RoundIndex,tied:Vec<crate::ballot_metadata::CandidateIndex>},
    /// A programming defect, not bad input: an internal assumption of the round loop failed.
    #[error("tabulation invariant violated: {0}")]
    Invariant(String),
}
