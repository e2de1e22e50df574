mod error;

pub use error::{DomainError, Precondition, ServiceError, StoreError, ValidationError};

/// Result type for state-store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for domain (actor-surface) operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Result type for service (pipeline-surface) operations
pub type ServiceResult<T> = Result<T, ServiceError>;
