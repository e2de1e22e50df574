use crate::errors::{DomainError, DomainResult, ServiceError, ServiceResult};
use crate::resolver::ResolvedPath;
use crate::types::CommandOutcome;
use crate::validation::{self, check, Check, ValidationBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use uuid::Uuid;

/// Path addressing shared by every endpoint: any admissible mix of
/// ids and names, plus the required correlation id. Ids win over
/// names when both are present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathParameters {
    pub correlation_id: String,
    pub owner_id: Option<String>,
    pub owner_name: Option<String>,
    pub organization_id: Option<String>,
    pub organization_name: Option<String>,
    pub repository_id: Option<String>,
    pub repository_name: Option<String>,
    pub branch_id: Option<String>,
    pub branch_name: Option<String>,
}

/// Successful command reply: the actor's enriched outcome, the
/// correlation id, and a property bag carrying the resolved ancestor
/// ids alongside anything the actor minted.
#[derive(Debug, Clone, Serialize)]
pub struct CommandResponse {
    pub return_value: CommandOutcome,
    pub correlation_id: String,
    pub properties: HashMap<String, String>,
}

/// Flattens a parameter struct into the string property bag attached
/// to failure replies.
pub fn parameter_snapshot<T: Serialize>(parameters: &T) -> HashMap<String, String> {
    let mut snapshot = HashMap::new();
    if let Ok(serde_json::Value::Object(fields)) = serde_json::to_value(parameters) {
        for (key, value) in fields {
            match value {
                serde_json::Value::Null => {}
                serde_json::Value::String(s) => {
                    snapshot.insert(key, s);
                }
                other => {
                    snapshot.insert(key, other.to_string());
                }
            }
        }
    }
    snapshot
}

/// Baseline checks every endpoint runs over its path parameters:
/// required correlation id, well-formed ids, admissible names.
pub fn path_checks(path: &PathParameters) -> Vec<Check<'static>> {
    let mut checks: Vec<Check<'static>> = Vec::new();

    let correlation_id = path.correlation_id.clone();
    checks.push(check(async move {
        ValidationBuilder::new("correlation_id", Some(correlation_id))
            .required()
            .check()
    }));

    let id_fields = [
        ("owner_id", path.owner_id.clone()),
        ("organization_id", path.organization_id.clone()),
        ("repository_id", path.repository_id.clone()),
        ("branch_id", path.branch_id.clone()),
    ];
    for (field, value) in id_fields {
        if let Some(value) = value {
            checks.push(check(async move {
                ValidationBuilder::new(field, Some(value)).uuid_string().check()
            }));
        }
    }

    let name_fields = [
        ("owner_name", path.owner_name.clone()),
        ("organization_name", path.organization_name.clone()),
        ("repository_name", path.repository_name.clone()),
        ("branch_name", path.branch_name.clone()),
    ];
    for (field, value) in name_fields {
        if let Some(value) = value {
            checks.push(check(async move {
                ValidationBuilder::new(field, Some(value)).entity_name().check()
            }));
        }
    }

    checks
}

/// A missing id after resolution means the entity does not exist.
pub fn require_id(id: Option<Uuid>, entity_type: &'static str) -> DomainResult<Uuid> {
    id.ok_or_else(|| DomainError::not_found(entity_type, Uuid::nil()))
}

/// Generic mutating-endpoint pipeline: run the validation checks
/// concurrently, then the resolve-and-dispatch operation, then shape
/// the reply. Failures carry the parameter snapshot.
pub async fn run_command<F>(
    correlation_id: &str,
    snapshot: HashMap<String, String>,
    checks: Vec<Check<'_>>,
    operation: F,
) -> ServiceResult<CommandResponse>
where
    F: Future<Output = DomainResult<(CommandOutcome, ResolvedPath)>>,
{
    if let Err(source) = validation::first_error(checks).await {
        return Err(ServiceError::Validation {
            source,
            correlation_id: correlation_id.to_string(),
            properties: snapshot,
        });
    }

    match operation.await {
        Ok((outcome, resolved)) => {
            let mut properties = outcome.properties.clone();
            if let Some(owner_id) = resolved.owner_id {
                properties.insert("owner_id".to_string(), owner_id.to_string());
            }
            if let Some(organization_id) = resolved.organization_id {
                properties.insert("organization_id".to_string(), organization_id.to_string());
            }
            if let Some(repository_id) = resolved.repository_id {
                properties.insert("repository_id".to_string(), repository_id.to_string());
            }
            if let Some(branch_id) = resolved.branch_id {
                properties.insert("branch_id".to_string(), branch_id.to_string());
            }
            Ok(CommandResponse {
                return_value: outcome,
                correlation_id: correlation_id.to_string(),
                properties,
            })
        }
        Err(source) => Err(ServiceError::Command {
            source,
            correlation_id: correlation_id.to_string(),
            properties: snapshot,
        }),
    }
}

/// Read-only endpoint pipeline: the same validation gate, then a
/// read-only operation with no dispatch or reply enrichment.
pub async fn run_query<T, F>(
    correlation_id: &str,
    snapshot: HashMap<String, String>,
    checks: Vec<Check<'_>>,
    operation: F,
) -> ServiceResult<T>
where
    F: Future<Output = DomainResult<T>>,
{
    if let Err(source) = validation::first_error(checks).await {
        return Err(ServiceError::Validation {
            source,
            correlation_id: correlation_id.to_string(),
            properties: snapshot,
        });
    }
    operation.await.map_err(|source| ServiceError::Command {
        source,
        correlation_id: correlation_id.to_string(),
        properties: snapshot,
    })
}

/// The user-visible failure shape the transport serializes.
#[derive(Debug, Clone, Serialize)]
pub struct FailureBody {
    pub error: String,
    pub correlation_id: String,
    pub properties: HashMap<String, String>,
}

impl FailureBody {
    pub fn from_error(error: &ServiceError) -> Self {
        let (correlation_id, properties) = match error {
            ServiceError::Command {
                correlation_id,
                properties,
                ..
            }
            | ServiceError::Validation {
                correlation_id,
                properties,
                ..
            } => (correlation_id.clone(), properties.clone()),
            ServiceError::Internal(_) => (String::new(), HashMap::new()),
        };
        Self {
            error: error.to_string(),
            correlation_id,
            properties,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ValidationError;

    #[derive(Serialize)]
    struct SampleParams {
        correlation_id: String,
        repository_name: Option<String>,
        save_days: u32,
    }

    #[test]
    fn test_parameter_snapshot_flattens_scalars() {
        let snapshot = parameter_snapshot(&SampleParams {
            correlation_id: "c-1".into(),
            repository_name: Some("demo".into()),
            save_days: 30,
        });
        assert_eq!(snapshot.get("correlation_id").unwrap(), "c-1");
        assert_eq!(snapshot.get("repository_name").unwrap(), "demo");
        assert_eq!(snapshot.get("save_days").unwrap(), "30");
    }

    #[tokio::test]
    async fn test_path_checks_reject_bad_uuid_and_name() {
        let path = PathParameters {
            correlation_id: "c-1".into(),
            owner_id: Some("not-a-uuid".into()),
            ..Default::default()
        };
        assert!(validation::first_error(path_checks(&path)).await.is_err());

        let path = PathParameters {
            correlation_id: "c-1".into(),
            branch_name: Some("_bad_".into()),
            ..Default::default()
        };
        assert!(validation::first_error(path_checks(&path)).await.is_err());

        let path = PathParameters {
            correlation_id: "c-1".into(),
            branch_name: Some("main".into()),
            owner_id: Some(Uuid::new_v4().to_string()),
            ..Default::default()
        };
        assert!(validation::first_error(path_checks(&path)).await.is_ok());
    }

    #[tokio::test]
    async fn test_run_command_returns_validation_error_with_snapshot() {
        let mut snapshot = HashMap::new();
        snapshot.insert("repository_name".to_string(), "demo".to_string());
        let checks = vec![check(async {
            Err(ValidationError::required("correlation_id"))
        })];
        let result = run_command("", snapshot, checks, async {
            Ok((CommandOutcome::new("Noop", Uuid::nil()), ResolvedPath::default()))
        })
        .await;
        let error = result.unwrap_err();
        assert_eq!(error.code(), "ValidationError");
        assert_eq!(error.http_status(), 400);
        let body = FailureBody::from_error(&error);
        assert_eq!(body.properties.get("repository_name").unwrap(), "demo");
    }
}
