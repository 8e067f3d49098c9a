#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogueError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Malformed response from {url}: {message}")]
    Malformed { url: String, message: String },

    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    #[error("Request superseded")]
    Cancelled,

    #[error("All {failed} detail requests failed: {first}")]
    BatchFailed {
        failed: usize,
        first: Box<CatalogueError>,
    },
}

impl CatalogueError {
    /// Superseded requests are expected and never shown to the user
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CatalogueError::Cancelled)
    }
}
