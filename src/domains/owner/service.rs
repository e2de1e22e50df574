use crate::context::ApplicationContext;
use crate::domains::owner::types::{OwnerCommand, OwnerDto};
use crate::errors::{DomainError, ServiceResult};
use crate::pipeline::{
    self, parameter_snapshot, path_checks, require_id, CommandResponse, PathParameters,
};
use crate::resolver;
use crate::types::{EventMetadata, OwnerType, SearchVisibility};
use crate::validation::{check, parse_uuid, ValidationBuilder};
use serde::{Deserialize, Serialize};

/// Parameters for creating an owner. The client supplies the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOwnerParameters {
    pub correlation_id: String,
    pub owner_id: String,
    pub owner_name: String,
    pub owner_type: OwnerType,
    pub search_visibility: SearchVisibility,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetOwnerNameParameters {
    #[serde(flatten)]
    pub path: PathParameters,
    pub new_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetOwnerDescriptionParameters {
    #[serde(flatten)]
    pub path: PathParameters,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetOwnerTypeParameters {
    #[serde(flatten)]
    pub path: PathParameters,
    pub owner_type: OwnerType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetOwnerSearchVisibilityParameters {
    #[serde(flatten)]
    pub path: PathParameters,
    pub search_visibility: SearchVisibility,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteOwnerParameters {
    #[serde(flatten)]
    pub path: PathParameters,
    pub delete_reason: String,
    pub force: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerPathParameters {
    #[serde(flatten)]
    pub path: PathParameters,
}

/// Command/query surface for owner entities.
#[derive(Clone)]
pub struct OwnerService {
    app: ApplicationContext,
}

impl OwnerService {
    pub fn new(app: ApplicationContext) -> Self {
        Self { app }
    }

    pub async fn create(&self, params: CreateOwnerParameters) -> ServiceResult<CommandResponse> {
        let snapshot = parameter_snapshot(&params);
        let correlation_id = params.correlation_id.clone();
        let checks = vec![
            check({
                let value = params.correlation_id.clone();
                async move {
                    ValidationBuilder::new("correlation_id", Some(value))
                        .required()
                        .check()
                }
            }),
            check({
                let value = params.owner_id.clone();
                async move {
                    ValidationBuilder::new("owner_id", Some(value))
                        .required()
                        .uuid_string()
                        .check()
                }
            }),
            check({
                let value = params.owner_name.clone();
                async move {
                    ValidationBuilder::new("owner_name", Some(value))
                        .required()
                        .entity_name()
                        .check()
                }
            }),
        ];
        let app = &self.app;
        pipeline::run_command(&correlation_id, snapshot, checks, async {
            let owner_id = parse_uuid("owner_id", &params.owner_id)?;
            if app.index().owner_id_by_name(&params.owner_name).is_some() {
                return Err(DomainError::Conflict(format!(
                    "owner name {} is already in use",
                    params.owner_name
                )));
            }
            let metadata = EventMetadata::new(&correlation_id);
            let outcome = app
                .host()
                .owner(owner_id)
                .await?
                .handle(
                    OwnerCommand::Create {
                        owner_name: params.owner_name.clone(),
                        owner_type: params.owner_type,
                        search_visibility: params.search_visibility,
                    },
                    metadata,
                )
                .await?;
            let resolved = resolver::ResolvedPath {
                owner_id: Some(owner_id),
                ..Default::default()
            };
            Ok((outcome, resolved))
        })
        .await
    }

    pub async fn set_name(&self, params: SetOwnerNameParameters) -> ServiceResult<CommandResponse> {
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
            let owner_id = require_id(resolved.owner_id, "owner")?;
            if let Some(existing) = app.index().owner_id_by_name(&params.new_name) {
                if existing != owner_id {
                    return Err(DomainError::Conflict(format!(
                        "owner name {} is already in use",
                        params.new_name
                    )));
                }
            }
            let metadata = EventMetadata::new(&correlation_id);
            let outcome = app
                .host()
                .owner(owner_id)
                .await?
                .handle(
                    OwnerCommand::SetName {
                        owner_name: params.new_name.clone(),
                    },
                    metadata,
                )
                .await?;
            Ok((outcome, resolved))
        })
        .await
    }

    pub async fn set_description(
        &self,
        params: SetOwnerDescriptionParameters,
    ) -> ServiceResult<CommandResponse> {
        let command = OwnerCommand::SetDescription {
            description: params.description.clone(),
        };
        self.simple_command(&params.path, parameter_snapshot(&params), command)
            .await
    }

    pub async fn set_type(&self, params: SetOwnerTypeParameters) -> ServiceResult<CommandResponse> {
        let command = OwnerCommand::SetType {
            owner_type: params.owner_type,
        };
        self.simple_command(&params.path, parameter_snapshot(&params), command)
            .await
    }

    pub async fn set_search_visibility(
        &self,
        params: SetOwnerSearchVisibilityParameters,
    ) -> ServiceResult<CommandResponse> {
        let command = OwnerCommand::SetSearchVisibility {
            search_visibility: params.search_visibility,
        };
        self.simple_command(&params.path, parameter_snapshot(&params), command)
            .await
    }

    pub async fn delete(&self, params: DeleteOwnerParameters) -> ServiceResult<CommandResponse> {
        let command = OwnerCommand::DeleteLogical {
            delete_reason: params.delete_reason.clone(),
            force: params.force,
        };
        self.simple_command(&params.path, parameter_snapshot(&params), command)
            .await
    }

    pub async fn undelete(&self, params: OwnerPathParameters) -> ServiceResult<CommandResponse> {
        self.simple_command(&params.path, parameter_snapshot(&params), OwnerCommand::Undelete)
            .await
    }

    pub async fn get(&self, params: OwnerPathParameters) -> ServiceResult<OwnerDto> {
        let snapshot = parameter_snapshot(&params);
        let correlation_id = params.path.correlation_id.clone();
        let app = &self.app;
        pipeline::run_query(&correlation_id, snapshot, path_checks(&params.path), async {
            let resolved =
                resolver::resolve_path(&app.cache, &app.actors, &params.path).await?;
            let owner_id = require_id(resolved.owner_id, "owner")?;
            let proxy = app.host().owner(owner_id).await?;
            if !proxy.exists().await? {
                return Err(DomainError::not_found("owner", owner_id));
            }
            proxy.get().await
        })
        .await
    }

    async fn simple_command(
        &self,
        path: &PathParameters,
        snapshot: std::collections::HashMap<String, String>,
        command: OwnerCommand,
    ) -> ServiceResult<CommandResponse> {
        let correlation_id = path.correlation_id.clone();
        let app = &self.app;
        pipeline::run_command(&correlation_id, snapshot, path_checks(path), async {
            let resolved = resolver::resolve_path(&app.cache, &app.actors, path).await?;
            let owner_id = require_id(resolved.owner_id, "owner")?;
            let metadata = EventMetadata::new(&correlation_id);
            let outcome = app
                .host()
                .owner(owner_id)
                .await?
                .handle(command, metadata)
                .await?;
            Ok((outcome, resolved))
        })
        .await
    }
}
