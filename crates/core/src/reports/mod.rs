//! Per-order invoice retrieval pipeline.
//!
//! The pipeline turns one order id into one invoice archive on disk:
//! - request a report scoped to the order,
//! - poll the report until it reaches a terminal status,
//! - resolve the finished document to a pre-signed download URL,
//! - stream the payload into the output directory.
//!
//! Every stage can fail independently; callers decide whether a failed order
//! aborts the run or is skipped.

mod pipeline;
mod types;

pub use pipeline::InvoicePipeline;
pub use types::{InvoiceFetcher, ProcessingStatus};

use thiserror::Error;

use crate::client::ApiError;

/// Errors that can occur while retrieving a single invoice.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An SP-API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The report reached a terminal status without a usable document.
    #[error("Report not completed: status {status}")]
    ReportFailed { status: String },

    /// The report never reached a terminal status within the poll budget.
    #[error("Report not ready after {attempts} status polls")]
    PollTimeout { attempts: u32 },

    /// The document download returned a non-success status.
    #[error("Download failed with status {status}")]
    Download { status: u16 },

    /// The document download request failed before a response arrived.
    #[error("Download request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Writing the artifact to disk failed.
    #[error("Failed to write invoice file: {0}")]
    Io(#[from] std::io::Error),
}
