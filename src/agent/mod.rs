pub mod classifier;
pub mod loop_;
pub mod orchestrator;
pub mod synthesizer;
pub mod trace;

pub use classifier::{Classification, SearchDecision};
pub use loop_::{build_agent, process_message, run};
pub use orchestrator::{Agent, AgentBuilder};
pub use trace::{AgentOutcome, AgentTrace};
