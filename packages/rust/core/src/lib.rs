//! Content pipeline orchestration for boardshelf.
//!
//! Given a run request, the [`Orchestrator`] decides which catalog entries
//! to process, in what order, and which stages each still needs. Stages call
//! out to the [`collaborators`] and persist through `boardshelf-storage`.

pub mod collaborators;
pub mod context;
pub mod generator;
pub mod lock;
pub mod ordering;
pub mod orchestrator;
pub mod parser;
pub mod progress;
pub mod request;
pub mod skip;
pub mod stages;
pub mod steps;
pub mod taxonomy;

#[cfg(test)]
mod test_support;

pub use collaborators::{
    Classifier, Collaborators, ContentGenerator, GenerationRequest, RulebookParser,
};
pub use context::rebuild_family_context;
pub use generator::BridgeGenerator;
pub use lock::FamilyLock;
pub use orchestrator::Orchestrator;
pub use parser::HttpRulebookParser;
pub use progress::{ProgressEvent, ProgressSink, StepStatus};
pub use request::{EntityResult, RunOptions, RunReport, RunRequest, RunSummary};
pub use skip::{SkipDecision, should_skip};
pub use steps::required_stages;
pub use taxonomy::KeywordClassifier;
