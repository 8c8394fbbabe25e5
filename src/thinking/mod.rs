//! Sequential thinking engine: processes, steps, revisions and branches.

pub mod store;
pub mod synthesis;
pub mod types;

pub use store::ThinkingStore;
pub use types::{
    ProcessMetadata, StartOptions, StepKind, ThinkingProcess, ThoughtContent, ThoughtKind,
    ThoughtNumber, ThoughtRequest, ThoughtStep, MAX_REVISIONS_PER_STEP,
};
