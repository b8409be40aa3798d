mod cancel;
pub mod report;
mod session;
pub mod worker;

pub use cancel::CancelToken;
pub use report::{FailedNote, ItemOutcome, ProgressEvent, RunReport, SkippedNote, WrittenNote};
pub use session::{RunHandle, Session};
pub use worker::{GenerationJob, generate};
