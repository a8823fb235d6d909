use thiserror::Error;

/// Errors raised while building or decoding content documents
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed document: {0}")]
    Malformed(String),

    #[error("Invalid resource version: {0}")]
    InvalidVersion(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

impl From<String> for CommonError {
    fn from(s: String) -> Self {
        CommonError::Malformed(s)
    }
}

impl From<&str> for CommonError {
    fn from(s: &str) -> Self {
        CommonError::Malformed(s.to_string())
    }
}
