//! Record pipeline: payer selection, lookup, and the loop that drives them

pub mod orchestrator;
pub mod payer;
pub mod processor;
pub mod report;

pub use orchestrator::{Orchestrator, Tick};
pub use payer::PayerSelector;
pub use processor::RecordProcessor;
pub use report::ReportResult;
