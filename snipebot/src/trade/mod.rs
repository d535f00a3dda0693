pub mod submission;
pub mod swap_intent;

pub use submission::{
    AttemptOutcome, AttemptRecord, RetrySettings, SubmissionEngine, SubmissionOutcome, SubmissionReport,
};
pub use swap_intent::SwapIntent;
