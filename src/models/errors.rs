use thiserror::Error;

/// Errors surfaced to the HTTP layer
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Service not found: {id}")]
    ServiceNotFound { id: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Catalog error: {source}")]
    Catalog {
        #[from]
        source: CatalogError,
    },

    #[error("Repository error: {source}")]
    Repository {
        #[from]
        source: RepositoryError,
    },
}

/// Errors raised by the persistence backend and the cart storage port
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Storage I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    #[error("Invalid storage key: {key}")]
    InvalidKey { key: String },

    #[error("Storage quota exceeded for {key}: {size} bytes, quota={quota}")]
    QuotaExceeded { key: String, size: usize, quota: usize },

    #[error("Storage unavailable: {message}")]
    Unavailable { message: String },
}

/// Errors raised while fetching or normalizing the service catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog request failed: {source}")]
    Request {
        #[from]
        source: reqwest::Error,
    },

    #[error("Catalog responded with status {status}")]
    Status { status: u16 },

    #[error("Catalog reported an unsuccessful response")]
    Unsuccessful,

    #[error("Catalog record has no identifier: {name}")]
    MissingIdentifier { name: String },
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result type alias for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Result type alias for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;
