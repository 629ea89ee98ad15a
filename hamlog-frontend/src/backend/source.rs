use async_trait::async_trait;
use hamlog_common::{HistoryEntry, Record, RecordId, RecordPage, UpdateFields};
use thiserror::Error;

/// Rows per page requested from the log server
pub const PAGE_SIZE: u32 = 25;

/// Failure reported by a [`RecordSource`].
///
/// `Rejected` and `NotFound` display the server's message verbatim so it can
/// be shown to the operator as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("{context} failed: HTTP status {status}")]
    Status { context: String, status: u16 },
    #[error("{0}")]
    Rejected(String),
    #[error("{0}")]
    NotFound(String),
    #[error("malformed response: {0}")]
    Decode(String),
}

/// The authoritative store of QSO records.
///
/// Every call is a plain request/response. Implementations never cache: the
/// controller re-reads after each mutation.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch one page (1-based) of `page_size` records plus the total count
    async fn list_page(&self, page: u32, page_size: u32) -> Result<RecordPage, SourceError>;

    async fn get_one(&self, id: RecordId) -> Result<Record, SourceError>;

    /// Log a new contact
    async fn create_one(&self, fields: &UpdateFields) -> Result<(), SourceError>;

    /// Overwrite every editable field of one record
    async fn update_one(&self, id: RecordId, fields: &UpdateFields) -> Result<(), SourceError>;

    /// Delete all `ids` in a single request
    async fn delete_many(&self, ids: &[RecordId]) -> Result<(), SourceError>;

    /// Most recent contacts with `callsign`, newest first
    async fn callsign_history(&self, callsign: &str) -> Result<Vec<HistoryEntry>, SourceError>;
}
