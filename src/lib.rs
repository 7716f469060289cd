//! Eligibility Bot
//!
//! Drives a session-authenticated eligibility portal from a spreadsheet work
//! queue. A language model plans which payer to pick and how to fill the
//! inquiry form; the browser executes the plan; results and a screenshot are
//! written back to the queue.

pub mod browser;
pub mod config;
pub mod constants;
pub mod error;
pub mod evidence;
pub mod google;
pub mod pipeline;
pub mod planner;
pub mod queue;
pub mod session;
