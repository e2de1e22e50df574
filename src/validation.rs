use crate::errors::{DomainResult, DomainError, ValidationError};
use futures::future::join_all;
use regex::Regex;
use std::future::Future;
use std::pin::Pin;
use std::sync::OnceLock;
use uuid::Uuid;

// Common regex patterns
fn name_regex() -> &'static Regex {
    static NAME_REGEX: OnceLock<Regex> = OnceLock::new();
    NAME_REGEX.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9-]{1,63}$").unwrap())
}

fn uuid_regex() -> &'static Regex {
    static UUID_REGEX: OnceLock<Regex> = OnceLock::new();
    UUID_REGEX.get_or_init(|| {
        Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$").unwrap()
    })
}

fn sha256_regex() -> &'static Regex {
    static SHA256_REGEX: OnceLock<Regex> = OnceLock::new();
    SHA256_REGEX.get_or_init(|| Regex::new(r"^[0-9a-f]{64}$").unwrap())
}

/// Struct for configuring validations in a fluent style
#[derive(Default)]
pub struct ValidationBuilder<T> {
    field_name: String,
    value: Option<T>,
    errors: Vec<ValidationError>,
}

/// Generic validation implementations
impl<T> ValidationBuilder<T> {
    pub fn new(field_name: &str, value: Option<T>) -> Self {
        Self {
            field_name: field_name.to_string(),
            value,
            errors: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self
    where
        T: Default + PartialEq,
    {
        if self.value.is_none() || self.value == Some(T::default()) {
            self.errors.push(ValidationError::required(&self.field_name));
        }
        self
    }

    pub fn validate_with<F>(mut self, validator: F) -> Self
    where
        F: FnOnce(&T) -> Result<(), ValidationError>,
    {
        if let Some(value) = &self.value {
            if let Err(err) = validator(value) {
                self.errors.push(err);
            }
        }
        self
    }

    /// Complete validation and return result
    pub fn validate(self) -> DomainResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            // Return the first error for simplicity
            Err(DomainError::Validation(self.errors[0].clone()))
        }
    }

    /// Complete validation, returning the bare validation error
    pub fn check(self) -> Result<(), ValidationError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors[0].clone())
        }
    }
}

/// String-specific validations
impl ValidationBuilder<String> {
    pub fn min_length(mut self, min: usize) -> Self {
        if let Some(value) = &self.value {
            if value.len() < min {
                self.errors
                    .push(ValidationError::min_length(&self.field_name, min));
            }
        }
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        if let Some(value) = &self.value {
            if value.len() > max {
                self.errors
                    .push(ValidationError::max_length(&self.field_name, max));
            }
        }
        self
    }

    pub fn matches_pattern(mut self, pattern: &Regex, message: &str) -> Self {
        if let Some(value) = &self.value {
            if !pattern.is_match(value) {
                self.errors
                    .push(ValidationError::format(&self.field_name, message));
            }
        }
        self
    }

    /// Entity-name format: a letter followed by 1..=63 letters, digits
    /// or dashes.
    pub fn entity_name(self) -> Self {
        self.matches_pattern(
            name_regex(),
            "must start with a letter and contain only letters, digits, and dashes (2-64 characters)",
        )
    }

    pub fn uuid_string(self) -> Self {
        self.matches_pattern(uuid_regex(), "must be a valid lowercase hyphenated UUID")
    }

    pub fn sha256_string(self) -> Self {
        self.matches_pattern(sha256_regex(), "must be a 64-character lowercase hex SHA-256")
    }

    pub fn one_of(mut self, allowed_values: &[&str], message: Option<&str>) -> Self {
        if let Some(value) = &self.value {
            if !allowed_values.contains(&value.as_str()) {
                let reason = message.unwrap_or("must be one of the allowed values");
                self.errors
                    .push(ValidationError::invalid_value(&self.field_name, reason));
            }
        }
        self
    }
}

/// Numeric validations
impl<T> ValidationBuilder<T>
where
    T: PartialOrd + Clone + std::fmt::Display,
{
    pub fn min(mut self, min: T) -> Self {
        if let Some(value) = &self.value {
            if value < &min {
                self.errors.push(ValidationError::range(
                    &self.field_name,
                    min.to_string(),
                    "maximum".to_string(),
                ));
            }
        }
        self
    }

    pub fn max(mut self, max: T) -> Self {
        if let Some(value) = &self.value {
            if value > &max {
                self.errors.push(ValidationError::range(
                    &self.field_name,
                    "minimum".to_string(),
                    max.to_string(),
                ));
            }
        }
        self
    }

    pub fn range(mut self, min: T, max: T) -> Self {
        if let Some(value) = &self.value {
            if value < &min || value > &max {
                self.errors.push(ValidationError::range(
                    &self.field_name,
                    min.to_string(),
                    max.to_string(),
                ));
            }
        }
        self
    }
}

/// UUID validation helpers
impl ValidationBuilder<Uuid> {
    pub fn not_nil(mut self) -> Self {
        if let Some(value) = &self.value {
            if *value == Uuid::nil() {
                self.errors.push(ValidationError::invalid_value(
                    &self.field_name,
                    "cannot be a nil UUID",
                ));
            }
        }
        self
    }
}

/// Checks whether a string is an admissible entity name.
pub fn is_valid_entity_name(name: &str) -> bool {
    name_regex().is_match(name)
}

/// Checks whether a string is a well-formed lowercase SHA-256 digest.
pub fn is_valid_sha256(hash: &str) -> bool {
    sha256_regex().is_match(hash)
}

/// Parses a required UUID parameter from its wire form.
pub fn parse_uuid(field_name: &str, value: &str) -> Result<Uuid, ValidationError> {
    Uuid::parse_str(value)
        .map_err(|_| ValidationError::format(field_name, &format!("invalid UUID: {}", value)))
}

/// A single named validation, executed concurrently with its peers.
pub type Check<'a> = Pin<Box<dyn Future<Output = Result<(), ValidationError>> + Send + 'a>>;

/// Boxes a validation future into a [`Check`].
pub fn check<'a, F>(future: F) -> Check<'a>
where
    F: Future<Output = Result<(), ValidationError>> + Send + 'a,
{
    Box::pin(future)
}

/// Runs all checks concurrently; true iff every one passed.
pub async fn all_pass(checks: Vec<Check<'_>>) -> bool {
    join_all(checks).await.iter().all(|result| result.is_ok())
}

/// Runs all checks concurrently and returns the earliest (by
/// position, not completion order) error, if any.
pub async fn first_error(checks: Vec<Check<'_>>) -> Result<(), ValidationError> {
    let results = join_all(checks).await;
    for result in results {
        result?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_name_validation() {
        assert!(is_valid_entity_name("demo"));
        assert!(is_valid_entity_name("My-Repo-2"));
        assert!(is_valid_entity_name("ab"));
        assert!(!is_valid_entity_name("a")); // too short
        assert!(!is_valid_entity_name("1demo")); // must start with a letter
        assert!(!is_valid_entity_name("demo_repo")); // no underscores
        assert!(!is_valid_entity_name(&format!("a{}", "b".repeat(64)))); // too long
    }

    #[test]
    fn test_sha256_validation() {
        let hash = "a".repeat(64);
        assert!(is_valid_sha256(&hash));
        assert!(!is_valid_sha256("A".repeat(64).as_str())); // uppercase rejected
        assert!(!is_valid_sha256("abc123"));
    }

    #[test]
    fn test_uuid_validation() {
        assert!(parse_uuid("id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(parse_uuid("id", "not-a-uuid").is_err());
    }

    #[test]
    fn test_validation_builder() {
        let result = ValidationBuilder::new("name", Some("".to_string()))
            .required()
            .validate();
        assert!(result.is_err());

        let result = ValidationBuilder::new("name", Some("demo".to_string()))
            .required()
            .entity_name()
            .validate();
        assert!(result.is_ok());

        let result = ValidationBuilder::new("save_days", Some(400u32))
            .range(0, 365)
            .validate();
        assert!(result.is_err());

        let value: Option<String> = None;
        let result = ValidationBuilder::new("name", value).required().validate();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_first_error_returns_earliest_by_position() {
        let checks: Vec<Check> = vec![
            check(async { Ok(()) }),
            check(async {
                // Completes last but sits earlier in the array.
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                Err(ValidationError::required("owner_id"))
            }),
            check(async { Err(ValidationError::required("branch_name")) }),
        ];
        let err = first_error(checks).await.unwrap_err();
        assert!(matches!(err, ValidationError::Required { field } if field == "owner_id"));
    }

    #[tokio::test]
    async fn test_all_pass() {
        let checks: Vec<Check> = vec![check(async { Ok(()) }), check(async { Ok(()) })];
        assert!(all_pass(checks).await);

        let checks: Vec<Check> = vec![
            check(async { Ok(()) }),
            check(async { Err(ValidationError::custom("nope")) }),
        ];
        assert!(!all_pass(checks).await);
    }
}
