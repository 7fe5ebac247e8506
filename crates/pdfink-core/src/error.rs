use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlattenError {
    #[error("Failed to open source document: {0}")]
    Open(String),

    #[error("PDF operation failed: {0}")]
    Operation(String),

    #[error("Failed to write output: {0}")]
    Write(String),
}
