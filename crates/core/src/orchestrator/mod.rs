//! Run orchestration for invoice retrieval.
//!
//! One run: load the checkpoint, discover orders inside the date window,
//! fetch an invoice for every order not yet checkpointed, save the
//! checkpoint. Per-order failures are isolated; discovery and checkpoint
//! failures abort the run.

mod runner;
mod types;

pub use runner::InvoiceOrchestrator;
pub use types::{OrchestratorError, RunSummary};
