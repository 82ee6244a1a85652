//! Producer/consumer generation engine for bulk Opal video generation.
//!
//! One slow, fragile browser login at a time (the harvester) feeds bearer
//! tokens into a shared [`opal_pool::TokenPool`]; N generation workers
//! drain a shared [`opal_pool::JobQueue`], spending tokens on API calls and
//! classifying failures to decide whether a token goes back into
//! circulation or is discarded as dead.
//!
//! External collaborators (browser automation, the generation HTTP call,
//! the UI status feed) are trait seams: [`session::LoginProvider`],
//! [`generate::Generator`], [`report::StatusSink`].

pub mod batch;
pub mod config;
pub mod error;
pub mod generate;
pub mod generator;
pub mod harvester;
pub mod report;
pub mod retry;
pub mod session;
pub mod signal;

pub use batch::{BatchItem, BatchReport, BatchRunner};
pub use config::EngineConfig;
pub use error::{
    classify_message, EngineError, EngineResult, GenerateError, GenerateErrorKind, SessionError,
};
pub use generate::{GeneratedVideo, Generator};
pub use generator::GeneratorWorker;
pub use harvester::Harvester;
pub use report::{StatusSink, TracingStatusSink};
pub use session::{LoginProvider, LoginSession};
pub use signal::StopSignal;
