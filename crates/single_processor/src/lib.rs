//! Translate-verify-repair sessions and the batch driver built on them.

pub mod artifact;
pub mod batch;
pub mod pkg_config;
pub mod repair_loop;
pub mod session;

pub use artifact::{TranslationArtifact, read_translated_function};
pub use batch::{
    BatchOptions, BatchSummary, FileOutcome, FileStatus, run_batch, target_extension,
};
pub use pkg_config::RepairConfig;
pub use repair_loop::{Generated, RepairEngine, StageCallback};
pub use session::{
    AttemptRecord, Candidate, CandidateOrigin, SessionError, SessionState, TranslationOutcome,
    TranslationRequest,
};
