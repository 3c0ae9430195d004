use tably_table::ReconcileError;
use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service-level errors with user-facing messages
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("No table is loaded")]
    NoTableLoaded,

    #[error("Table load failed: {0}")]
    LoadFailed(String),

    #[error("Out of range: {0}")]
    OutOfRange(String),

    #[error("Submit failed: {0}")]
    SubmitFailed(#[from] ReconcileError),

    #[error("Export failed: {0}")]
    ExportFailed(String),

    #[error("Table operation failed: {0}")]
    TableOperationFailed(String),
}
