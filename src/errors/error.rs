use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::types::ReferenceType;

/// State-store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Connection pool error: {0}")]
    Connection(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("State store error: {0}")]
    Other(String),
}

impl serde::Serialize for StoreError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("StoreError", 2)?;
        let (kind, message) = match self {
            StoreError::Sqlx(err) => ("Sqlx", err.to_string()),
            StoreError::Connection(s) => ("Connection", s.clone()),
            StoreError::Serialization(s) => ("Serialization", s.clone()),
            StoreError::Migration(s) => ("Migration", s.clone()),
            StoreError::Other(s) => ("Other", s.clone()),
        };
        state.serialize_field("type", kind)?;
        state.serialize_field("message", &message)?;
        state.end()
    }
}

/// Manual Clone implementation for StoreError
impl Clone for StoreError {
    fn clone(&self) -> Self {
        match self {
            StoreError::Sqlx(err) => StoreError::Other(format!("SQLx error: {}", err)),
            StoreError::Connection(s) => StoreError::Connection(s.clone()),
            StoreError::Serialization(s) => StoreError::Serialization(s.clone()),
            StoreError::Migration(s) => StoreError::Migration(s.clone()),
            StoreError::Other(s) => StoreError::Other(s.clone()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        StoreError::Serialization(error.to_string())
    }
}

/// Validation errors
#[derive(Debug, Error, Clone, Serialize)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required { field: String },

    #[error("Field '{field}' must be at least {min} characters")]
    MinLength { field: String, min: usize },

    #[error("Field '{field}' cannot exceed {max} characters")]
    MaxLength { field: String, max: usize },

    #[error("Field '{field}' must be between {min} and {max}")]
    Range {
        field: String,
        min: String,
        max: String,
    },

    #[error("Field '{field}' contains invalid format: {reason}")]
    Format { field: String, reason: String },

    #[error("Field '{field}' contains an invalid value: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Validation error: {0}")]
    Custom(String),
}

impl ValidationError {
    pub fn required(field: &str) -> Self {
        Self::Required {
            field: field.to_string(),
        }
    }

    pub fn min_length(field: &str, min: usize) -> Self {
        Self::MinLength {
            field: field.to_string(),
            min,
        }
    }

    pub fn max_length(field: &str, max: usize) -> Self {
        Self::MaxLength {
            field: field.to_string(),
            max,
        }
    }

    pub fn range<T: std::fmt::Display>(field: &str, min: T, max: T) -> Self {
        Self::Range {
            field: field.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        }
    }

    pub fn format(field: &str, reason: &str) -> Self {
        Self::Format {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn custom(message: &str) -> Self {
        Self::Custom(message.to_string())
    }
}

/// Precondition failures surfaced by entity actors when a command is
/// well-formed but the entity's current state refuses it.
#[derive(Debug, Error, Clone, Serialize, PartialEq)]
pub enum Precondition {
    #[error("{0} references are disabled on this branch")]
    ReferenceTypeDisabled(ReferenceType),

    #[error("branch is not based on the latest promotion of its parent")]
    NotBasedOnLatestPromotion,

    #[error("entity still has children in: {}", .0.join(", "))]
    ChildrenExist(Vec<String>),

    #[error("reference does not belong to this branch")]
    ForeignReference,

    #[error("rebase target is not a promotion reference")]
    RebaseTargetNotPromotion,
}

/// Domain-level errors: the surface every entity actor returns from
/// `handle` and its getters.
#[derive(Debug, Error, Clone, Serialize)]
pub enum DomainError {
    #[error("State store error: {0}")]
    Store(#[from] StoreError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Entity not found: {entity_type} with ID {id}")]
    NotFound { entity_type: String, id: Uuid },

    #[error("Entity already exists: {entity_type} with ID {id}")]
    AlreadyExists { entity_type: String, id: Uuid },

    #[error("Correlation ID {0} was already applied to this entity")]
    DuplicateCorrelationId(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Cannot perform operation on deleted entity: {entity_type} with ID {id}")]
    DeletedEntity { entity_type: String, id: Uuid },

    #[error("Precondition failed: {0}")]
    PreconditionFailed(Precondition),

    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("Dependency failure: {0}")]
    DependencyFailure(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(entity_type: &str, id: Uuid) -> Self {
        Self::NotFound {
            entity_type: entity_type.to_string(),
            id,
        }
    }

    pub fn already_exists(entity_type: &str, id: Uuid) -> Self {
        Self::AlreadyExists {
            entity_type: entity_type.to_string(),
            id,
        }
    }

    pub fn deleted(entity_type: &str, id: Uuid) -> Self {
        Self::DeletedEntity {
            entity_type: entity_type.to_string(),
            id,
        }
    }

    /// Stable string kind for the closed error-code enumeration.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "ValidationError",
            DomainError::NotFound { .. } => "NotFound",
            DomainError::AlreadyExists { .. }
            | DomainError::DuplicateCorrelationId(_)
            | DomainError::Conflict(_)
            | DomainError::DeletedEntity { .. } => "Conflict",
            DomainError::PreconditionFailed(_) => "PreconditionFailed",
            DomainError::Integrity(_) => "IntegrityError",
            DomainError::Store(_) | DomainError::DependencyFailure(_) => "DependencyFailure",
            DomainError::Internal(_) => "Internal",
        }
    }
}

/// Service-level errors: the pipeline surface returned by the
/// per-entity command services. Carries the correlation id and the
/// parameter snapshot so the transport can shape the failure body.
#[derive(Debug, Error, Clone, Serialize)]
pub enum ServiceError {
    #[error("{source}")]
    Command {
        source: DomainError,
        correlation_id: String,
        properties: std::collections::HashMap<String, String>,
    },

    #[error("Validation error: {source}")]
    Validation {
        source: ValidationError,
        correlation_id: String,
        properties: std::collections::HashMap<String, String>,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Command { source, .. } => source.code(),
            ServiceError::Validation { .. } => "ValidationError",
            ServiceError::Internal(_) => "Internal",
        }
    }

    /// HTTP status the transport layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::Validation { .. } => 400,
            ServiceError::Command { source, .. } => match source {
                DomainError::Store(_)
                | DomainError::DependencyFailure(_)
                | DomainError::Internal(_) => 500,
                _ => 400,
            },
            ServiceError::Internal(_) => 500,
        }
    }

    pub fn correlation_id(&self) -> Option<&str> {
        match self {
            ServiceError::Command { correlation_id, .. }
            | ServiceError::Validation { correlation_id, .. } => Some(correlation_id),
            ServiceError::Internal(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_error_codes_are_stable() {
        assert_eq!(
            DomainError::DuplicateCorrelationId("c-1".into()).code(),
            "Conflict"
        );
        assert_eq!(
            DomainError::not_found("branch", Uuid::nil()).code(),
            "NotFound"
        );
        assert_eq!(
            DomainError::PreconditionFailed(Precondition::ReferenceTypeDisabled(
                ReferenceType::Save
            ))
            .code(),
            "PreconditionFailed"
        );
        assert_eq!(
            DomainError::Integrity("size mismatch".into()).code(),
            "IntegrityError"
        );
        assert_eq!(
            DomainError::Store(StoreError::Connection("down".into())).code(),
            "DependencyFailure"
        );
    }

    #[test]
    fn test_http_status_mapping() {
        let conflict = ServiceError::Command {
            source: DomainError::Conflict("name already in use".into()),
            correlation_id: "c-1".into(),
            properties: Default::default(),
        };
        assert_eq!(conflict.http_status(), 400);

        let dependency = ServiceError::Command {
            source: DomainError::DependencyFailure("bus unreachable".into()),
            correlation_id: "c-2".into(),
            properties: Default::default(),
        };
        assert_eq!(dependency.http_status(), 500);
        assert_eq!(dependency.code(), "DependencyFailure");
    }
}
