use crate::context::ApplicationContext;
use crate::domains::repo_name::actor::{repository_name_actor_id, RepositoryNameCommand};
use crate::domains::repository::types::{RepositoryCommand, RepositoryDto};
use crate::errors::{DomainError, ServiceResult};
use crate::pipeline::{
    self, parameter_snapshot, path_checks, require_id, CommandResponse, PathParameters,
};
use crate::resolver::{self, repository_name_cache_key};
use crate::types::{EventMetadata, RepositoryStatus, RepositoryVisibility};
use crate::validation::{check, parse_uuid, ValidationBuilder};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Parameters for creating a repository. The client supplies the id;
/// owner and organization may be addressed by id or name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRepositoryParameters {
    #[serde(flatten)]
    pub path: PathParameters,
    pub new_repository_id: String,
    pub new_repository_name: String,
    pub visibility: RepositoryVisibility,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetRepositoryNameParameters {
    #[serde(flatten)]
    pub path: PathParameters,
    pub new_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetRepositoryVisibilityParameters {
    #[serde(flatten)]
    pub path: PathParameters,
    pub visibility: RepositoryVisibility,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetRepositoryStatusParameters {
    #[serde(flatten)]
    pub path: PathParameters,
    pub status: RepositoryStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetRecordSavesParameters {
    #[serde(flatten)]
    pub path: PathParameters,
    pub record_saves: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetDefaultServerApiVersionParameters {
    #[serde(flatten)]
    pub path: PathParameters,
    pub default_server_api_version: String,
}

/// Shared parameters of the five retention setters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetRetentionDaysParameters {
    #[serde(flatten)]
    pub path: PathParameters,
    pub days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRepositoryParameters {
    #[serde(flatten)]
    pub path: PathParameters,
    pub delete_reason: String,
    pub force: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryPathParameters {
    #[serde(flatten)]
    pub path: PathParameters,
}

/// Command/query surface for repository entities. Creation and rename
/// also maintain the RepositoryName index actor, which backs
/// name-based resolution.
#[derive(Clone)]
pub struct RepositoryService {
    app: ApplicationContext,
}

impl RepositoryService {
    pub fn new(app: ApplicationContext) -> Self {
        Self { app }
    }

    async fn bind_repository_name(
        &self,
        name: &str,
        owner_id: Uuid,
        organization_id: Uuid,
        repository_id: Option<Uuid>,
        correlation_id: &str,
    ) -> Result<(), DomainError> {
        let actor_id = repository_name_actor_id(name, owner_id, organization_id);
        let command = match repository_id {
            Some(repository_id) => RepositoryNameCommand::SetRepositoryId { repository_id },
            None => RepositoryNameCommand::ClearRepositoryId,
        };
        self.app
            .host()
            .repository_name(actor_id)
            .await?
            .handle(command, EventMetadata::new(correlation_id))
            .await?;
        self.app
            .cache
            .invalidate(&repository_name_cache_key(name, owner_id, organization_id));
        Ok(())
    }

    pub async fn create(
        &self,
        params: CreateRepositoryParameters,
    ) -> ServiceResult<CommandResponse> {
        let snapshot = parameter_snapshot(&params);
        let correlation_id = params.path.correlation_id.clone();
        let mut checks = path_checks(&params.path);
        checks.push(check({
            let value = params.new_repository_id.clone();
            async move {
                ValidationBuilder::new("new_repository_id", Some(value))
                    .required()
                    .uuid_string()
                    .check()
            }
        }));
        checks.push(check({
            let value = params.new_repository_name.clone();
            async move {
                ValidationBuilder::new("new_repository_name", Some(value))
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
            let organization_id = require_id(resolved.organization_id, "organization")?;
            let repository_id = parse_uuid("new_repository_id", &params.new_repository_id)?;

            // (name, owner, organization) must be unique; the name
            // index actor is the authority.
            let name_actor_id = repository_name_actor_id(
                &params.new_repository_name,
                owner_id,
                organization_id,
            );
            let bound = app
                .host()
                .repository_name(name_actor_id)
                .await?
                .read(|a| a.repository_id())
                .await?;
            if bound.is_some() {
                return Err(DomainError::Conflict(format!(
                    "repository name {} is already in use",
                    params.new_repository_name
                )));
            }

            let metadata = EventMetadata::new(&correlation_id);
            let outcome = app
                .host()
                .repository(repository_id)
                .await?
                .handle(
                    RepositoryCommand::Create {
                        owner_id,
                        organization_id,
                        repository_name: params.new_repository_name.clone(),
                        visibility: params.visibility,
                        retention: app.config.default_retention,
                    },
                    metadata,
                )
                .await?;
            self.bind_repository_name(
                &params.new_repository_name,
                owner_id,
                organization_id,
                Some(repository_id),
                &correlation_id,
            )
            .await?;
            resolved.repository_id = Some(repository_id);
            Ok((outcome, resolved))
        })
        .await
    }

    pub async fn set_name(
        &self,
        params: SetRepositoryNameParameters,
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
            let repository_id = require_id(resolved.repository_id, "repository")?;
            let proxy = app.host().repository(repository_id).await?;
            if !proxy.exists().await? {
                return Err(DomainError::not_found("repository", repository_id));
            }
            let current = proxy.get().await?;

            let new_binding = repository_name_actor_id(
                &params.new_name,
                current.owner_id,
                current.organization_id,
            );
            let bound = app
                .host()
                .repository_name(new_binding)
                .await?
                .read(|a| a.repository_id())
                .await?;
            if let Some(existing) = bound {
                if existing != repository_id {
                    return Err(DomainError::Conflict(format!(
                        "repository name {} is already in use",
                        params.new_name
                    )));
                }
            }

            let metadata = EventMetadata::new(&correlation_id);
            let outcome = proxy
                .handle(
                    RepositoryCommand::SetName {
                        repository_name: params.new_name.clone(),
                    },
                    metadata,
                )
                .await?;
            // Rebind the name index: old name released, new name bound.
            self.bind_repository_name(
                &current.repository_name,
                current.owner_id,
                current.organization_id,
                None,
                &correlation_id,
            )
            .await?;
            self.bind_repository_name(
                &params.new_name,
                current.owner_id,
                current.organization_id,
                Some(repository_id),
                &correlation_id,
            )
            .await?;
            Ok((outcome, resolved))
        })
        .await
    }

    pub async fn set_visibility(
        &self,
        params: SetRepositoryVisibilityParameters,
    ) -> ServiceResult<CommandResponse> {
        let command = RepositoryCommand::SetVisibility {
            visibility: params.visibility,
        };
        self.simple_command(&params.path, parameter_snapshot(&params), command)
            .await
    }

    pub async fn set_status(
        &self,
        params: SetRepositoryStatusParameters,
    ) -> ServiceResult<CommandResponse> {
        let command = RepositoryCommand::SetStatus {
            status: params.status,
        };
        self.simple_command(&params.path, parameter_snapshot(&params), command)
            .await
    }

    pub async fn set_record_saves(
        &self,
        params: SetRecordSavesParameters,
    ) -> ServiceResult<CommandResponse> {
        let command = RepositoryCommand::SetRecordSaves {
            record_saves: params.record_saves,
        };
        self.simple_command(&params.path, parameter_snapshot(&params), command)
            .await
    }

    pub async fn set_default_server_api_version(
        &self,
        params: SetDefaultServerApiVersionParameters,
    ) -> ServiceResult<CommandResponse> {
        let command = RepositoryCommand::SetDefaultServerApiVersion {
            default_server_api_version: params.default_server_api_version.clone(),
        };
        self.simple_command(&params.path, parameter_snapshot(&params), command)
            .await
    }

    pub async fn set_save_days(
        &self,
        params: SetRetentionDaysParameters,
    ) -> ServiceResult<CommandResponse> {
        let command = RepositoryCommand::SetSaveDays {
            save_days: params.days,
        };
        self.retention_command(params, command).await
    }

    pub async fn set_checkpoint_days(
        &self,
        params: SetRetentionDaysParameters,
    ) -> ServiceResult<CommandResponse> {
        let command = RepositoryCommand::SetCheckpointDays {
            checkpoint_days: params.days,
        };
        self.retention_command(params, command).await
    }

    pub async fn set_diff_cache_days(
        &self,
        params: SetRetentionDaysParameters,
    ) -> ServiceResult<CommandResponse> {
        let command = RepositoryCommand::SetDiffCacheDays {
            diff_cache_days: params.days,
        };
        self.retention_command(params, command).await
    }

    pub async fn set_directory_version_cache_days(
        &self,
        params: SetRetentionDaysParameters,
    ) -> ServiceResult<CommandResponse> {
        let command = RepositoryCommand::SetDirectoryVersionCacheDays {
            directory_version_cache_days: params.days,
        };
        self.retention_command(params, command).await
    }

    pub async fn set_logical_delete_days(
        &self,
        params: SetRetentionDaysParameters,
    ) -> ServiceResult<CommandResponse> {
        let command = RepositoryCommand::SetLogicalDeleteDays {
            logical_delete_days: params.days,
        };
        self.retention_command(params, command).await
    }

    pub async fn delete(
        &self,
        params: DeleteRepositoryParameters,
    ) -> ServiceResult<CommandResponse> {
        let snapshot = parameter_snapshot(&params);
        let correlation_id = params.path.correlation_id.clone();
        let app = &self.app;
        pipeline::run_command(&correlation_id, snapshot, path_checks(&params.path), async {
            let resolved =
                resolver::resolve_path(&app.cache, &app.actors, &params.path).await?;
            let repository_id = require_id(resolved.repository_id, "repository")?;
            let proxy = app.host().repository(repository_id).await?;
            let current = proxy.get().await?;
            let metadata = EventMetadata::new(&correlation_id);
            let outcome = proxy
                .handle(
                    RepositoryCommand::DeleteLogical {
                        delete_reason: params.delete_reason.clone(),
                        force: params.force,
                    },
                    metadata,
                )
                .await?;
            // A logically deleted repository releases its name.
            self.bind_repository_name(
                &current.repository_name,
                current.owner_id,
                current.organization_id,
                None,
                &correlation_id,
            )
            .await?;
            Ok((outcome, resolved))
        })
        .await
    }

    pub async fn undelete(
        &self,
        params: RepositoryPathParameters,
    ) -> ServiceResult<CommandResponse> {
        let snapshot = parameter_snapshot(&params);
        let correlation_id = params.path.correlation_id.clone();
        let app = &self.app;
        pipeline::run_command(&correlation_id, snapshot, path_checks(&params.path), async {
            let resolved =
                resolver::resolve_path(&app.cache, &app.actors, &params.path).await?;
            let repository_id = require_id(resolved.repository_id, "repository")?;
            let proxy = app.host().repository(repository_id).await?;
            let metadata = EventMetadata::new(&correlation_id);
            let outcome = proxy.handle(RepositoryCommand::Undelete, metadata).await?;
            let current = proxy.get().await?;
            self.bind_repository_name(
                &current.repository_name,
                current.owner_id,
                current.organization_id,
                Some(repository_id),
                &correlation_id,
            )
            .await?;
            Ok((outcome, resolved))
        })
        .await
    }

    pub async fn get(&self, params: RepositoryPathParameters) -> ServiceResult<RepositoryDto> {
        let snapshot = parameter_snapshot(&params);
        let correlation_id = params.path.correlation_id.clone();
        let app = &self.app;
        pipeline::run_query(&correlation_id, snapshot, path_checks(&params.path), async {
            let resolved =
                resolver::resolve_path(&app.cache, &app.actors, &params.path).await?;
            let repository_id = require_id(resolved.repository_id, "repository")?;
            let proxy = app.host().repository(repository_id).await?;
            if !proxy.exists().await? {
                return Err(DomainError::not_found("repository", repository_id));
            }
            proxy.get().await
        })
        .await
    }

    async fn retention_command(
        &self,
        params: SetRetentionDaysParameters,
        command: RepositoryCommand,
    ) -> ServiceResult<CommandResponse> {
        let snapshot = parameter_snapshot(&params);
        let correlation_id = params.path.correlation_id.clone();
        let mut checks = path_checks(&params.path);
        checks.push(check({
            let days = params.days;
            async move {
                ValidationBuilder::new("days", Some(days))
                    .range(0, 3650)
                    .check()
            }
        }));
        let app = &self.app;
        pipeline::run_command(&correlation_id, snapshot, checks, async {
            let resolved =
                resolver::resolve_path(&app.cache, &app.actors, &params.path).await?;
            let repository_id = require_id(resolved.repository_id, "repository")?;
            let metadata = EventMetadata::new(&correlation_id);
            let outcome = app
                .host()
                .repository(repository_id)
                .await?
                .handle(command, metadata)
                .await?;
            Ok((outcome, resolved))
        })
        .await
    }

    async fn simple_command(
        &self,
        path: &PathParameters,
        snapshot: std::collections::HashMap<String, String>,
        command: RepositoryCommand,
    ) -> ServiceResult<CommandResponse> {
        let correlation_id = path.correlation_id.clone();
        let app = &self.app;
        pipeline::run_command(&correlation_id, snapshot, path_checks(path), async {
            let resolved = resolver::resolve_path(&app.cache, &app.actors, path).await?;
            let repository_id = require_id(resolved.repository_id, "repository")?;
            let metadata = EventMetadata::new(&correlation_id);
            let outcome = app
                .host()
                .repository(repository_id)
                .await?
                .handle(command, metadata)
                .await?;
            Ok((outcome, resolved))
        })
        .await
    }
}
