//! Types for the invoice report pipeline.

use std::path::PathBuf;

use async_trait::async_trait;

use super::PipelineError;

/// Processing state of a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingStatus {
    /// Waiting for processing to start.
    InQueue,
    /// Processing is running.
    InProgress,
    /// Finished successfully; a document id should be available.
    Done,
    /// Processing failed.
    Fatal,
    /// Processing was cancelled, either by the seller or by the service.
    Cancelled,
    /// A status this crate does not know. Treated as still running.
    Other(String),
}

impl ProcessingStatus {
    /// Parse the wire status string.
    pub fn parse(status: &str) -> Self {
        match status {
            "IN_QUEUE" => ProcessingStatus::InQueue,
            "IN_PROGRESS" => ProcessingStatus::InProgress,
            "DONE" => ProcessingStatus::Done,
            "FATAL" => ProcessingStatus::Fatal,
            "CANCELLED" => ProcessingStatus::Cancelled,
            other => ProcessingStatus::Other(other.to_string()),
        }
    }

    /// Whether polling should stop at this status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProcessingStatus::Done | ProcessingStatus::Fatal | ProcessingStatus::Cancelled
        )
    }

    /// The wire representation of this status.
    pub fn as_str(&self) -> &str {
        match self {
            ProcessingStatus::InQueue => "IN_QUEUE",
            ProcessingStatus::InProgress => "IN_PROGRESS",
            ProcessingStatus::Done => "DONE",
            ProcessingStatus::Fatal => "FATAL",
            ProcessingStatus::Cancelled => "CANCELLED",
            ProcessingStatus::Other(status) => status,
        }
    }
}

/// Retrieves the invoice artifact for a single order.
#[async_trait]
pub trait InvoiceFetcher: Send + Sync {
    /// Fetch the invoice for `order_id`, returning the path of the written
    /// artifact.
    async fn fetch_invoice(&self, order_id: &str) -> Result<PathBuf, PipelineError>;
}
