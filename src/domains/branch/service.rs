use crate::context::ApplicationContext;
use crate::domains::branch::types::{BranchCommand, BranchDto};
use crate::errors::{DomainError, ServiceResult};
use crate::pipeline::{
    self, parameter_snapshot, path_checks, require_id, CommandResponse, PathParameters,
};
use crate::resolver;
use crate::types::EventMetadata;
use crate::validation::{check, parse_uuid, ValidationBuilder};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Parameters for creating a branch. The client supplies the new id;
/// the repository is addressed through the path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBranchParameters {
    #[serde(flatten)]
    pub path: PathParameters,
    pub new_branch_id: String,
    pub new_branch_name: String,
    pub parent_branch_id: Option<String>,
    pub based_on: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetBranchNameParameters {
    #[serde(flatten)]
    pub path: PathParameters,
    pub new_name: String,
}

/// Parameters shared by every reference-producing command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReferenceParameters {
    #[serde(flatten)]
    pub path: PathParameters,
    pub directory_version_id: String,
    pub sha256_hash: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebaseParameters {
    #[serde(flatten)]
    pub path: PathParameters,
    pub reference_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnableFeatureParameters {
    #[serde(flatten)]
    pub path: PathParameters,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveReferenceParameters {
    #[serde(flatten)]
    pub path: PathParameters,
    pub reference_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteBranchParameters {
    #[serde(flatten)]
    pub path: PathParameters,
    pub delete_reason: String,
    pub force: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchPathParameters {
    #[serde(flatten)]
    pub path: PathParameters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListBranchesParameters {
    #[serde(flatten)]
    pub path: PathParameters,
    pub max_count: usize,
}

/// Command/query surface for branch entities, including every
/// reference-producing operation.
#[derive(Clone)]
pub struct BranchService {
    app: ApplicationContext,
}

impl BranchService {
    pub fn new(app: ApplicationContext) -> Self {
        Self { app }
    }

    pub async fn create(&self, params: CreateBranchParameters) -> ServiceResult<CommandResponse> {
        let snapshot = parameter_snapshot(&params);
        let correlation_id = params.path.correlation_id.clone();
        let mut checks = path_checks(&params.path);
        checks.push(check({
            let value = params.new_branch_id.clone();
            async move {
                ValidationBuilder::new("new_branch_id", Some(value))
                    .required()
                    .uuid_string()
                    .check()
            }
        }));
        checks.push(check({
            let value = params.new_branch_name.clone();
            async move {
                ValidationBuilder::new("new_branch_name", Some(value))
                    .required()
                    .entity_name()
                    .check()
            }
        }));
        if let Some(parent) = params.parent_branch_id.clone() {
            checks.push(check(async move {
                ValidationBuilder::new("parent_branch_id", Some(parent))
                    .uuid_string()
                    .check()
            }));
        }
        if let Some(based_on) = params.based_on.clone() {
            checks.push(check(async move {
                ValidationBuilder::new("based_on", Some(based_on))
                    .uuid_string()
                    .check()
            }));
        }
        let app = &self.app;
        pipeline::run_command(&correlation_id, snapshot, checks, async {
            let mut resolved =
                resolver::resolve_path(&app.cache, &app.actors, &params.path).await?;
            let repository_id = require_id(resolved.repository_id, "repository")?;
            let branch_id = parse_uuid("new_branch_id", &params.new_branch_id)?;
            if app
                .index()
                .branch_id_by_name(repository_id, &params.new_branch_name)
                .is_some()
            {
                return Err(DomainError::Conflict(format!(
                    "branch name {} is already in use in this repository",
                    params.new_branch_name
                )));
            }
            let parent_branch_id = params
                .parent_branch_id
                .as_deref()
                .map(|id| parse_uuid("parent_branch_id", id))
                .transpose()?;
            let based_on = params
                .based_on
                .as_deref()
                .map(|id| parse_uuid("based_on", id))
                .transpose()?;
            let metadata = EventMetadata::new(&correlation_id);
            let outcome = app
                .host()
                .branch(branch_id)
                .await?
                .handle(
                    BranchCommand::Create {
                        repository_id,
                        branch_name: params.new_branch_name.clone(),
                        parent_branch_id,
                        based_on,
                    },
                    metadata,
                )
                .await?;
            resolved.branch_id = Some(branch_id);
            Ok((outcome, resolved))
        })
        .await
    }

    pub async fn set_name(&self, params: SetBranchNameParameters) -> ServiceResult<CommandResponse> {
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
            let branch_id = require_id(resolved.branch_id, "branch")?;
            if let Some(repository_id) = resolved.repository_id {
                if let Some(existing) =
                    app.index().branch_id_by_name(repository_id, &params.new_name)
                {
                    if existing != branch_id {
                        return Err(DomainError::Conflict(format!(
                            "branch name {} is already in use in this repository",
                            params.new_name
                        )));
                    }
                }
            }
            let metadata = EventMetadata::new(&correlation_id);
            let outcome = app
                .host()
                .branch(branch_id)
                .await?
                .handle(
                    BranchCommand::SetName {
                        branch_name: params.new_name.clone(),
                    },
                    metadata,
                )
                .await?;
            Ok((outcome, resolved))
        })
        .await
    }

    pub async fn rebase(&self, params: RebaseParameters) -> ServiceResult<CommandResponse> {
        let snapshot = parameter_snapshot(&params);
        let correlation_id = params.path.correlation_id.clone();
        let mut checks = path_checks(&params.path);
        checks.push(check({
            let value = params.reference_id.clone();
            async move {
                ValidationBuilder::new("reference_id", Some(value))
                    .required()
                    .uuid_string()
                    .check()
            }
        }));
        let app = &self.app;
        pipeline::run_command(&correlation_id, snapshot, checks, async {
            let resolved =
                resolver::resolve_path(&app.cache, &app.actors, &params.path).await?;
            let branch_id = require_id(resolved.branch_id, "branch")?;
            let reference_id = parse_uuid("reference_id", &params.reference_id)?;
            let metadata = EventMetadata::new(&correlation_id);
            let outcome = app
                .host()
                .branch(branch_id)
                .await?
                .handle(BranchCommand::Rebase { reference_id }, metadata)
                .await?;
            Ok((outcome, resolved))
        })
        .await
    }

    pub async fn assign(&self, params: CreateReferenceParameters) -> ServiceResult<CommandResponse> {
        self.reference_command(params, |directory_version_id, sha256_hash, reference_text| {
            BranchCommand::Assign {
                directory_version_id,
                sha256_hash,
                reference_text,
            }
        })
        .await
    }

    pub async fn promote(&self, params: CreateReferenceParameters) -> ServiceResult<CommandResponse> {
        self.reference_command(params, |directory_version_id, sha256_hash, reference_text| {
            BranchCommand::Promote {
                directory_version_id,
                sha256_hash,
                reference_text,
            }
        })
        .await
    }

    pub async fn commit(&self, params: CreateReferenceParameters) -> ServiceResult<CommandResponse> {
        self.reference_command(params, |directory_version_id, sha256_hash, reference_text| {
            BranchCommand::Commit {
                directory_version_id,
                sha256_hash,
                reference_text,
            }
        })
        .await
    }

    pub async fn checkpoint(
        &self,
        params: CreateReferenceParameters,
    ) -> ServiceResult<CommandResponse> {
        self.reference_command(params, |directory_version_id, sha256_hash, reference_text| {
            BranchCommand::Checkpoint {
                directory_version_id,
                sha256_hash,
                reference_text,
            }
        })
        .await
    }

    pub async fn save(&self, params: CreateReferenceParameters) -> ServiceResult<CommandResponse> {
        self.reference_command(params, |directory_version_id, sha256_hash, reference_text| {
            BranchCommand::Save {
                directory_version_id,
                sha256_hash,
                reference_text,
            }
        })
        .await
    }

    pub async fn tag(&self, params: CreateReferenceParameters) -> ServiceResult<CommandResponse> {
        self.reference_command(params, |directory_version_id, sha256_hash, reference_text| {
            BranchCommand::Tag {
                directory_version_id,
                sha256_hash,
                reference_text,
            }
        })
        .await
    }

    pub async fn create_external(
        &self,
        params: CreateReferenceParameters,
    ) -> ServiceResult<CommandResponse> {
        self.reference_command(params, |directory_version_id, sha256_hash, reference_text| {
            BranchCommand::CreateExternal {
                directory_version_id,
                sha256_hash,
                reference_text,
            }
        })
        .await
    }

    pub async fn enable_assign(
        &self,
        params: EnableFeatureParameters,
    ) -> ServiceResult<CommandResponse> {
        let command = BranchCommand::EnableAssign {
            enabled: params.enabled,
        };
        self.simple_command(&params.path, parameter_snapshot(&params), command)
            .await
    }

    pub async fn enable_promotion(
        &self,
        params: EnableFeatureParameters,
    ) -> ServiceResult<CommandResponse> {
        let command = BranchCommand::EnablePromotion {
            enabled: params.enabled,
        };
        self.simple_command(&params.path, parameter_snapshot(&params), command)
            .await
    }

    pub async fn enable_commit(
        &self,
        params: EnableFeatureParameters,
    ) -> ServiceResult<CommandResponse> {
        let command = BranchCommand::EnableCommit {
            enabled: params.enabled,
        };
        self.simple_command(&params.path, parameter_snapshot(&params), command)
            .await
    }

    pub async fn enable_checkpoint(
        &self,
        params: EnableFeatureParameters,
    ) -> ServiceResult<CommandResponse> {
        let command = BranchCommand::EnableCheckpoint {
            enabled: params.enabled,
        };
        self.simple_command(&params.path, parameter_snapshot(&params), command)
            .await
    }

    pub async fn enable_save(
        &self,
        params: EnableFeatureParameters,
    ) -> ServiceResult<CommandResponse> {
        let command = BranchCommand::EnableSave {
            enabled: params.enabled,
        };
        self.simple_command(&params.path, parameter_snapshot(&params), command)
            .await
    }

    pub async fn enable_tag(
        &self,
        params: EnableFeatureParameters,
    ) -> ServiceResult<CommandResponse> {
        let command = BranchCommand::EnableTag {
            enabled: params.enabled,
        };
        self.simple_command(&params.path, parameter_snapshot(&params), command)
            .await
    }

    pub async fn enable_external(
        &self,
        params: EnableFeatureParameters,
    ) -> ServiceResult<CommandResponse> {
        let command = BranchCommand::EnableExternal {
            enabled: params.enabled,
        };
        self.simple_command(&params.path, parameter_snapshot(&params), command)
            .await
    }

    pub async fn enable_auto_rebase(
        &self,
        params: EnableFeatureParameters,
    ) -> ServiceResult<CommandResponse> {
        let command = BranchCommand::EnableAutoRebase {
            enabled: params.enabled,
        };
        self.simple_command(&params.path, parameter_snapshot(&params), command)
            .await
    }

    pub async fn remove_reference(
        &self,
        params: RemoveReferenceParameters,
    ) -> ServiceResult<CommandResponse> {
        let snapshot = parameter_snapshot(&params);
        let correlation_id = params.path.correlation_id.clone();
        let mut checks = path_checks(&params.path);
        checks.push(check({
            let value = params.reference_id.clone();
            async move {
                ValidationBuilder::new("reference_id", Some(value))
                    .required()
                    .uuid_string()
                    .check()
            }
        }));
        let app = &self.app;
        pipeline::run_command(&correlation_id, snapshot, checks, async {
            let resolved =
                resolver::resolve_path(&app.cache, &app.actors, &params.path).await?;
            let branch_id = require_id(resolved.branch_id, "branch")?;
            let reference_id = parse_uuid("reference_id", &params.reference_id)?;
            let metadata = EventMetadata::new(&correlation_id);
            let outcome = app
                .host()
                .branch(branch_id)
                .await?
                .handle(BranchCommand::RemoveReference { reference_id }, metadata)
                .await?;
            Ok((outcome, resolved))
        })
        .await
    }

    pub async fn delete(&self, params: DeleteBranchParameters) -> ServiceResult<CommandResponse> {
        let command = BranchCommand::DeleteLogical {
            delete_reason: params.delete_reason.clone(),
            force: params.force,
        };
        self.simple_command(&params.path, parameter_snapshot(&params), command)
            .await
    }

    pub async fn undelete(&self, params: BranchPathParameters) -> ServiceResult<CommandResponse> {
        self.simple_command(
            &params.path,
            parameter_snapshot(&params),
            BranchCommand::Undelete,
        )
        .await
    }

    pub async fn get(&self, params: BranchPathParameters) -> ServiceResult<BranchDto> {
        let snapshot = parameter_snapshot(&params);
        let correlation_id = params.path.correlation_id.clone();
        let app = &self.app;
        pipeline::run_query(&correlation_id, snapshot, path_checks(&params.path), async {
            let resolved =
                resolver::resolve_path(&app.cache, &app.actors, &params.path).await?;
            let branch_id = require_id(resolved.branch_id, "branch")?;
            let proxy = app.host().branch(branch_id).await?;
            if !proxy.exists().await? {
                return Err(DomainError::not_found("branch", branch_id));
            }
            proxy.get().await
        })
        .await
    }

    /// Branch dtos of a repository, bounded by `max_count`.
    pub async fn list(&self, params: ListBranchesParameters) -> ServiceResult<Vec<BranchDto>> {
        let snapshot = parameter_snapshot(&params);
        let correlation_id = params.path.correlation_id.clone();
        let app = &self.app;
        pipeline::run_query(&correlation_id, snapshot, path_checks(&params.path), async {
            let resolved =
                resolver::resolve_path(&app.cache, &app.actors, &params.path).await?;
            let repository_id = require_id(resolved.repository_id, "repository")?;
            let mut branches = Vec::new();
            for branch_id in app.index().branches_of(repository_id) {
                if branches.len() >= params.max_count {
                    break;
                }
                let proxy = app.host().branch(branch_id).await?;
                if proxy.exists().await? {
                    branches.push(proxy.get().await?);
                }
            }
            Ok(branches)
        })
        .await
    }

    async fn reference_command(
        &self,
        params: CreateReferenceParameters,
        make_command: fn(Uuid, String, String) -> BranchCommand,
    ) -> ServiceResult<CommandResponse> {
        let snapshot = parameter_snapshot(&params);
        let correlation_id = params.path.correlation_id.clone();
        let mut checks = path_checks(&params.path);
        checks.push(check({
            let value = params.directory_version_id.clone();
            async move {
                ValidationBuilder::new("directory_version_id", Some(value))
                    .required()
                    .uuid_string()
                    .check()
            }
        }));
        checks.push(check({
            let value = params.sha256_hash.clone();
            async move {
                ValidationBuilder::new("sha256_hash", Some(value))
                    .required()
                    .sha256_string()
                    .check()
            }
        }));
        let app = &self.app;
        pipeline::run_command(&correlation_id, snapshot, checks, async {
            let resolved =
                resolver::resolve_path(&app.cache, &app.actors, &params.path).await?;
            let branch_id = require_id(resolved.branch_id, "branch")?;
            let directory_version_id =
                parse_uuid("directory_version_id", &params.directory_version_id)?;
            let command = make_command(
                directory_version_id,
                params.sha256_hash.clone(),
                params.message.clone(),
            );
            let metadata = EventMetadata::new(&correlation_id);
            let outcome = app
                .host()
                .branch(branch_id)
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
        command: BranchCommand,
    ) -> ServiceResult<CommandResponse> {
        let correlation_id = path.correlation_id.clone();
        let app = &self.app;
        pipeline::run_command(&correlation_id, snapshot, path_checks(path), async {
            let resolved = resolver::resolve_path(&app.cache, &app.actors, path).await?;
            let branch_id = require_id(resolved.branch_id, "branch")?;
            let metadata = EventMetadata::new(&correlation_id);
            let outcome = app
                .host()
                .branch(branch_id)
                .await?
                .handle(command, metadata)
                .await?;
            Ok((outcome, resolved))
        })
        .await
    }
}
