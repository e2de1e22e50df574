use crate::context::ApplicationContext;
use crate::domains::organization::types::{OrganizationCommand, OrganizationDto};
use crate::errors::{DomainError, ServiceResult};
use crate::pipeline::{
    self, parameter_snapshot, path_checks, require_id, CommandResponse, PathParameters,
};
use crate::resolver;
use crate::types::{EventMetadata, OrganizationType, SearchVisibility};
use crate::validation::{check, parse_uuid, ValidationBuilder};
use serde::{Deserialize, Serialize};

/// Parameters for creating an organization under an owner. The client
/// supplies the new id; the owner may be addressed by id or name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrganizationParameters {
    #[serde(flatten)]
    pub path: PathParameters,
    pub organization_id: String,
    pub new_organization_name: String,
    pub organization_type: OrganizationType,
    pub search_visibility: SearchVisibility,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetOrganizationNameParameters {
    #[serde(flatten)]
    pub path: PathParameters,
    pub new_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetOrganizationTypeParameters {
    #[serde(flatten)]
    pub path: PathParameters,
    pub organization_type: OrganizationType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetOrganizationSearchVisibilityParameters {
    #[serde(flatten)]
    pub path: PathParameters,
    pub search_visibility: SearchVisibility,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteOrganizationParameters {
    #[serde(flatten)]
    pub path: PathParameters,
    pub delete_reason: String,
    pub force: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationPathParameters {
    #[serde(flatten)]
    pub path: PathParameters,
}

/// Command/query surface for organization entities.
#[derive(Clone)]
pub struct OrganizationService {
    app: ApplicationContext,
}

impl OrganizationService {
    pub fn new(app: ApplicationContext) -> Self {
        Self { app }
    }

    pub async fn create(
        &self,
        params: CreateOrganizationParameters,
    ) -> ServiceResult<CommandResponse> {
        let snapshot = parameter_snapshot(&params);
        let correlation_id = params.path.correlation_id.clone();
        let mut checks = path_checks(&params.path);
        checks.push(check({
            let value = params.organization_id.clone();
            async move {
                ValidationBuilder::new("organization_id", Some(value))
                    .required()
                    .uuid_string()
                    .check()
            }
        }));
        checks.push(check({
            let value = params.new_organization_name.clone();
            async move {
                ValidationBuilder::new("new_organization_name", Some(value))
                    .required()
                    .entity_name()
                    .check()
            }
        }));
        let app = &self.app;
        pipeline::run_command(&correlation_id, snapshot, checks, async {
            let mut resolved =
                resolver::resolve_path(&app.cache, &app.actors, &params.path).await?;
            let owner_id = require_id(resolved.owner_id, "owner")?;
            let organization_id = parse_uuid("organization_id", &params.organization_id)?;
            if app
                .index()
                .organization_id_by_name(owner_id, &params.new_organization_name)
                .is_some()
            {
                return Err(DomainError::Conflict(format!(
                    "organization name {} is already in use under this owner",
                    params.new_organization_name
                )));
            }
            let metadata = EventMetadata::new(&correlation_id);
            let outcome = app
                .host()
                .organization(organization_id)
                .await?
                .handle(
                    OrganizationCommand::Create {
                        owner_id,
                        organization_name: params.new_organization_name.clone(),
                        organization_type: params.organization_type,
                        search_visibility: params.search_visibility,
                    },
                    metadata,
                )
                .await?;
            resolved.organization_id = Some(organization_id);
            Ok((outcome, resolved))
        })
        .await
    }

    pub async fn set_name(
        &self,
        params: SetOrganizationNameParameters,
    ) -> ServiceResult<CommandResponse> {
        let snapshot = parameter_snapshot(&params);
        let correlation_id = params.path.correlation_id.clone();
        let mut checks = path_checks(&params.path);
        checks.push(check({
            let value = params.new_name.clone();
            async move {
                ValidationBuilder::new("new_name", Some(value))
                    .required()
                    .entity_name()
                    .check()
            }
        }));
        let app = &self.app;
        pipeline::run_command(&correlation_id, snapshot, checks, async {
            let resolved =
                resolver::resolve_path(&app.cache, &app.actors, &params.path).await?;
            let organization_id = require_id(resolved.organization_id, "organization")?;
            if let Some(owner_id) = resolved.owner_id {
                if let Some(existing) =
                    app.index().organization_id_by_name(owner_id, &params.new_name)
                {
                    if existing != organization_id {
                        return Err(DomainError::Conflict(format!(
                            "organization name {} is already in use under this owner",
                            params.new_name
                        )));
                    }
                }
            }
            let metadata = EventMetadata::new(&correlation_id);
            let outcome = app
                .host()
                .organization(organization_id)
                .await?
                .handle(
                    OrganizationCommand::SetName {
                        organization_name: params.new_name.clone(),
                    },
                    metadata,
                )
                .await?;
            Ok((outcome, resolved))
        })
        .await
    }

    pub async fn set_type(
        &self,
        params: SetOrganizationTypeParameters,
    ) -> ServiceResult<CommandResponse> {
        let command = OrganizationCommand::SetType {
            organization_type: params.organization_type,
        };
        self.simple_command(&params.path, parameter_snapshot(&params), command)
            .await
    }

    pub async fn set_search_visibility(
        &self,
        params: SetOrganizationSearchVisibilityParameters,
    ) -> ServiceResult<CommandResponse> {
        let command = OrganizationCommand::SetSearchVisibility {
            search_visibility: params.search_visibility,
        };
        self.simple_command(&params.path, parameter_snapshot(&params), command)
            .await
    }

    pub async fn delete(
        &self,
        params: DeleteOrganizationParameters,
    ) -> ServiceResult<CommandResponse> {
        let command = OrganizationCommand::DeleteLogical {
            delete_reason: params.delete_reason.clone(),
            force: params.force,
        };
        self.simple_command(&params.path, parameter_snapshot(&params), command)
            .await
    }

    pub async fn undelete(
        &self,
        params: OrganizationPathParameters,
    ) -> ServiceResult<CommandResponse> {
        self.simple_command(
            &params.path,
            parameter_snapshot(&params),
            OrganizationCommand::Undelete,
        )
        .await
    }

    pub async fn get(&self, params: OrganizationPathParameters) -> ServiceResult<OrganizationDto> {
        let snapshot = parameter_snapshot(&params);
        let correlation_id = params.path.correlation_id.clone();
        let app = &self.app;
        pipeline::run_query(&correlation_id, snapshot, path_checks(&params.path), async {
            let resolved =
                resolver::resolve_path(&app.cache, &app.actors, &params.path).await?;
            let organization_id = require_id(resolved.organization_id, "organization")?;
            let proxy = app.host().organization(organization_id).await?;
            if !proxy.exists().await? {
                return Err(DomainError::not_found("organization", organization_id));
            }
            proxy.get().await
        })
        .await
    }

    async fn simple_command(
        &self,
        path: &PathParameters,
        snapshot: std::collections::HashMap<String, String>,
        command: OrganizationCommand,
    ) -> ServiceResult<CommandResponse> {
        let correlation_id = path.correlation_id.clone();
        let app = &self.app;
        pipeline::run_command(&correlation_id, snapshot, path_checks(path), async {
            let resolved = resolver::resolve_path(&app.cache, &app.actors, path).await?;
            let organization_id = require_id(resolved.organization_id, "organization")?;
            let metadata = EventMetadata::new(&correlation_id);
            let outcome = app
                .host()
                .organization(organization_id)
                .await?
                .handle(command, metadata)
                .await?;
            Ok((outcome, resolved))
        })
        .await
    }
}
