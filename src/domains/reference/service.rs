use crate::context::ApplicationContext;
use crate::domains::reference::types::{ReferenceCommand, ReferenceDto};
use crate::errors::{DomainError, ServiceResult};
use crate::pipeline::{
    self, parameter_snapshot, path_checks, require_id, CommandResponse, PathParameters,
};
use crate::resolver;
use crate::types::EventMetadata;
use crate::validation::{check, parse_uuid, ValidationBuilder};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceParameters {
    #[serde(flatten)]
    pub path: PathParameters,
    pub reference_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteReferenceParameters {
    #[serde(flatten)]
    pub path: PathParameters,
    pub reference_id: String,
    pub delete_reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListReferencesParameters {
    #[serde(flatten)]
    pub path: PathParameters,
    pub max_count: usize,
}

/// Query and lifecycle surface for reference entities. References are
/// created through branch commands; this service reads, deletes, and
/// undeletes them by id.
#[derive(Clone)]
pub struct ReferenceService {
    app: ApplicationContext,
}

impl ReferenceService {
    pub fn new(app: ApplicationContext) -> Self {
        Self { app }
    }

    fn reference_checks(params_reference_id: &str) -> crate::validation::Check<'static> {
        let value = params_reference_id.to_string();
        check(async move {
            ValidationBuilder::new("reference_id", Some(value))
                .required()
                .uuid_string()
                .check()
        })
    }

    pub async fn get(&self, params: ReferenceParameters) -> ServiceResult<ReferenceDto> {
        let snapshot = parameter_snapshot(&params);
        let correlation_id = params.path.correlation_id.clone();
        let mut checks = path_checks(&params.path);
        checks.push(Self::reference_checks(&params.reference_id));
        let app = &self.app;
        pipeline::run_query(&correlation_id, snapshot, checks, async {
            let reference_id = parse_uuid("reference_id", &params.reference_id)?;
            let proxy = app.host().reference(reference_id).await?;
            if !proxy.exists().await? {
                return Err(DomainError::not_found("reference", reference_id));
            }
            proxy.get().await
        })
        .await
    }

    /// Reference dtos of a branch in application order, bounded by
    /// `max_count`.
    pub async fn list(&self, params: ListReferencesParameters) -> ServiceResult<Vec<ReferenceDto>> {
        let snapshot = parameter_snapshot(&params);
        let correlation_id = params.path.correlation_id.clone();
        let app = &self.app;
        pipeline::run_query(&correlation_id, snapshot, path_checks(&params.path), async {
            let resolved =
                resolver::resolve_path(&app.cache, &app.actors, &params.path).await?;
            let branch_id = require_id(resolved.branch_id, "branch")?;
            let mut references = Vec::new();
            for summary in app.index().references_of(branch_id) {
                if references.len() >= params.max_count {
                    break;
                }
                let proxy = app.host().reference(summary.reference_id).await?;
                if proxy.exists().await? {
                    references.push(proxy.get().await?);
                }
            }
            Ok(references)
        })
        .await
    }

    pub async fn delete(&self, params: DeleteReferenceParameters) -> ServiceResult<CommandResponse> {
        let snapshot = parameter_snapshot(&params);
        let correlation_id = params.path.correlation_id.clone();
        let mut checks = path_checks(&params.path);
        checks.push(Self::reference_checks(&params.reference_id));
        let app = &self.app;
        pipeline::run_command(&correlation_id, snapshot, checks, async {
            let resolved =
                resolver::resolve_path(&app.cache, &app.actors, &params.path).await?;
            let reference_id = parse_uuid("reference_id", &params.reference_id)?;
            let metadata = EventMetadata::new(&correlation_id);
            let outcome = app
                .host()
                .reference(reference_id)
                .await?
                .handle(
                    ReferenceCommand::DeleteLogical {
                        delete_reason: params.delete_reason.clone(),
                        retention: None,
                    },
                    metadata,
                )
                .await?;
            Ok((outcome, resolved))
        })
        .await
    }

    pub async fn undelete(&self, params: ReferenceParameters) -> ServiceResult<CommandResponse> {
        let snapshot = parameter_snapshot(&params);
        let correlation_id = params.path.correlation_id.clone();
        let mut checks = path_checks(&params.path);
        checks.push(Self::reference_checks(&params.reference_id));
        let app = &self.app;
        pipeline::run_command(&correlation_id, snapshot, checks, async {
            let resolved =
                resolver::resolve_path(&app.cache, &app.actors, &params.path).await?;
            let reference_id = parse_uuid("reference_id", &params.reference_id)?;
            let metadata = EventMetadata::new(&correlation_id);
            let outcome = app
                .host()
                .reference(reference_id)
                .await?
                .handle(ReferenceCommand::Undelete, metadata)
                .await?;
            Ok((outcome, resolved))
        })
        .await
    }
}
