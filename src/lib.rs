#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::needless_pass_by_value,
    clippy::return_self_not_must_use,
    clippy::similar_names,
    clippy::uninlined_format_args
)]

pub mod agent;
pub mod config;
pub mod error;
pub mod providers;
pub mod search;

pub use agent::{Agent, AgentOutcome, AgentTrace, Classification};
pub use config::Config;
pub use error::{AgentError, SearchError};
