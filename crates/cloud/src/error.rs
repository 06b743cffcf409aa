#[derive(Debug, thiserror::Error)]
pub enum CloudError {
    #[error("Object not found: s3://{bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("Object storage error: {0}")]
    Storage(String),

    #[error("Tracking table error: {0}")]
    Table(String),

    #[error("Workflow engine error: {0}")]
    Workflow(String),

    #[error("Presigning failed: {0}")]
    Presign(String),

    #[error("Local I/O error: {0}")]
    Io(#[from] std::io::Error),
}
