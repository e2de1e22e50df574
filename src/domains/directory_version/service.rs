use crate::context::ApplicationContext;
use crate::domains::directory_version::types::{
    directory_version_actor_id, DirectoryVersionCommand, DirectoryVersionDto, FileEntry,
};
use crate::errors::{DomainError, ServiceResult};
use crate::pipeline::{
    self, parameter_snapshot, path_checks, require_id, CommandResponse, PathParameters,
};
use crate::resolver;
use crate::types::EventMetadata;
use crate::validation::{check, parse_uuid, ValidationBuilder};
use serde::{Deserialize, Serialize};

/// Parameters for caching a directory version. The actor is addressed
/// by (repository, sha256); the directory-version id is the client's
/// stable identifier for the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDirectoryVersionParameters {
    #[serde(flatten)]
    pub path: PathParameters,
    pub directory_version_id: String,
    pub sha256_hash: String,
    pub relative_path: String,
    pub files: Vec<FileEntry>,
    pub size: u64,
    pub directories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetDirectoryVersionParameters {
    #[serde(flatten)]
    pub path: PathParameters,
    pub sha256_hash: String,
}

/// Command/query surface for the content-addressed directory-version
/// cache.
#[derive(Clone)]
pub struct DirectoryVersionService {
    app: ApplicationContext,
}

impl DirectoryVersionService {
    pub fn new(app: ApplicationContext) -> Self {
        Self { app }
    }

    pub async fn create(
        &self,
        params: CreateDirectoryVersionParameters,
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
            let repository_id = require_id(resolved.repository_id, "repository")?;
            let directory_version_id =
                parse_uuid("directory_version_id", &params.directory_version_id)?;
            let directories = params
                .directories
                .iter()
                .map(|id| parse_uuid("directories", id))
                .collect::<Result<Vec<_>, _>>()?;
            let actor_id = directory_version_actor_id(repository_id, &params.sha256_hash);
            let metadata = EventMetadata::new(&correlation_id);
            let outcome = app
                .host()
                .directory_version(actor_id)
                .await?
                .handle(
                    DirectoryVersionCommand::Create {
                        directory_version_id,
                        repository_id,
                        sha256_hash: params.sha256_hash.clone(),
                        relative_path: params.relative_path.clone(),
                        files: params.files.clone(),
                        size: params.size,
                        directories,
                    },
                    metadata,
                )
                .await?;
            Ok((outcome, resolved))
        })
        .await
    }

    /// Content-addressed lookup by (repository, sha256).
    pub async fn get(
        &self,
        params: GetDirectoryVersionParameters,
    ) -> ServiceResult<DirectoryVersionDto> {
        let snapshot = parameter_snapshot(&params);
        let correlation_id = params.path.correlation_id.clone();
        let mut checks = path_checks(&params.path);
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
        pipeline::run_query(&correlation_id, snapshot, checks, async {
            let resolved =
                resolver::resolve_path(&app.cache, &app.actors, &params.path).await?;
            let repository_id = require_id(resolved.repository_id, "repository")?;
            let actor_id = directory_version_actor_id(repository_id, &params.sha256_hash);
            let proxy = app.host().directory_version(actor_id).await?;
            if !proxy.exists().await? {
                return Err(DomainError::not_found("directory_version", actor_id));
            }
            proxy.get().await
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraceConfig;
    use crate::context::ApplicationContext;
    use crate::domains::organization::service::CreateOrganizationParameters;
    use crate::domains::owner::service::CreateOwnerParameters;
    use crate::domains::repository::service::CreateRepositoryParameters;
    use crate::errors::ServiceError;
    use crate::types::{OrganizationType, OwnerType, RepositoryVisibility, SearchVisibility};
    use uuid::Uuid;

    fn cid() -> String {
        Uuid::new_v4().to_string()
    }

    async fn setup() -> (ApplicationContext, Uuid) {
        let app = ApplicationContext::initialize(GraceConfig::default())
            .await
            .unwrap();
        let owner_id = Uuid::new_v4();
        app.owners()
            .create(CreateOwnerParameters {
                correlation_id: cid(),
                owner_id: owner_id.to_string(),
                owner_name: "alice".to_string(),
                owner_type: OwnerType::User,
                search_visibility: SearchVisibility::Visible,
            })
            .await
            .unwrap();
        let organization_id = Uuid::new_v4();
        app.organizations()
            .create(CreateOrganizationParameters {
                path: PathParameters {
                    correlation_id: cid(),
                    owner_id: Some(owner_id.to_string()),
                    ..Default::default()
                },
                organization_id: organization_id.to_string(),
                new_organization_name: "engineering".to_string(),
                organization_type: OrganizationType::Private,
                search_visibility: SearchVisibility::Visible,
            })
            .await
            .unwrap();
        let repository_id = Uuid::new_v4();
        app.repositories()
            .create(CreateRepositoryParameters {
                path: PathParameters {
                    correlation_id: cid(),
                    owner_id: Some(owner_id.to_string()),
                    organization_id: Some(organization_id.to_string()),
                    ..Default::default()
                },
                new_repository_id: repository_id.to_string(),
                new_repository_name: "demo".to_string(),
                visibility: RepositoryVisibility::Private,
            })
            .await
            .unwrap();
        (app, repository_id)
    }

    fn create_params(repository_id: Uuid, sha: &str, size: u64) -> CreateDirectoryVersionParameters {
        CreateDirectoryVersionParameters {
            path: PathParameters {
                correlation_id: cid(),
                repository_id: Some(repository_id.to_string()),
                ..Default::default()
            },
            directory_version_id: Uuid::new_v4().to_string(),
            sha256_hash: sha.to_string(),
            relative_path: ".".to_string(),
            files: vec![
                FileEntry {
                    relative_path: "src/main.rs".to_string(),
                    sha256_hash: "cd".repeat(32),
                    size: 100,
                },
                FileEntry {
                    relative_path: "README.md".to_string(),
                    sha256_hash: "ef".repeat(32),
                    size: 20,
                },
            ],
            size,
            directories: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_create_and_content_addressed_lookup() {
        let (app, repository_id) = setup().await;
        let sha = "ab".repeat(32);
        app.directory_versions()
            .create(create_params(repository_id, &sha, 120))
            .await
            .unwrap();

        let dto = app
            .directory_versions()
            .get(GetDirectoryVersionParameters {
                path: PathParameters {
                    correlation_id: cid(),
                    repository_id: Some(repository_id.to_string()),
                    ..Default::default()
                },
                sha256_hash: sha.clone(),
            })
            .await
            .unwrap();
        assert_eq!(dto.sha256_hash, sha);
        assert_eq!(dto.size, 120);
        assert_eq!(dto.files.len(), 2);
    }

    #[tokio::test]
    async fn test_declared_size_must_match_file_sizes() {
        let (app, repository_id) = setup().await;
        let error = app
            .directory_versions()
            .create(create_params(repository_id, &"ab".repeat(32), 121))
            .await
            .unwrap_err();
        assert_eq!(error.code(), "IntegrityError");
    }

    #[tokio::test]
    async fn test_same_content_cannot_be_cached_twice() {
        let (app, repository_id) = setup().await;
        let sha = "ab".repeat(32);
        app.directory_versions()
            .create(create_params(repository_id, &sha, 120))
            .await
            .unwrap();
        let error = app
            .directory_versions()
            .create(create_params(repository_id, &sha, 120))
            .await
            .unwrap_err();
        match error {
            ServiceError::Command { source, .. } => assert_eq!(source.code(), "Conflict"),
            other => panic!("expected conflict, got {:?}", other),
        }
    }
}
