use crate::config::GraceConfig;
use crate::domains::branch::service::BranchService;
use crate::domains::core::index::ReadModelIndex;
use crate::domains::directory_version::service::DirectoryVersionService;
use crate::domains::organization::service::OrganizationService;
use crate::domains::owner::service::OwnerService;
use crate::domains::reference::service::ReferenceService;
use crate::domains::repository::service::RepositoryService;
use crate::errors::{ServiceError, ServiceResult};
use crate::platform::actor_host::{ActorContext, ActorHost};
use crate::platform::cache::MemoryCache;
use crate::platform::event_bus::{EventObserver, InProcessEventBus};
use crate::platform::reminders::ReminderService;
use crate::platform::state_store::SqliteStateStore;
use std::sync::Arc;

/// Handles to every platform service, built once at process start and
/// passed by value from there on. Construction doubles as the
/// readiness wait: the state store has connected and migrated before
/// a context is returned.
#[derive(Clone)]
pub struct ApplicationContext {
    pub config: Arc<GraceConfig>,
    pub cache: Arc<MemoryCache>,
    pub actors: ActorContext,
}

impl ApplicationContext {
    pub async fn initialize(config: GraceConfig) -> ServiceResult<Self> {
        let store = SqliteStateStore::connect(&config.database_url)
            .await
            .map_err(|e| ServiceError::Internal(format!("state store init failed: {}", e)))?;

        let index = Arc::new(ReadModelIndex::new());
        let observers: Vec<Arc<dyn EventObserver>> = vec![index.clone()];
        let bus = Arc::new(InProcessEventBus::new(config.event_bus_capacity, observers));
        let reminders = Arc::new(ReminderService::new());
        let host = ActorHost::new();

        let actors = ActorContext {
            host: host.clone(),
            store: Arc::new(store),
            bus,
            reminders: reminders.clone(),
            index,
            events_topic: Arc::from(config.events_topic.as_str()),
            retention_defaults: config.default_retention,
        };
        host.bind(actors.clone());
        reminders.bind(host);

        let cache = Arc::new(MemoryCache::new(config.cache_ttl));
        log::info!("grace server core initialized ({})", config.database_url);
        Ok(Self {
            config: Arc::new(config),
            cache,
            actors,
        })
    }

    pub fn host(&self) -> &ActorHost {
        &self.actors.host
    }

    pub fn index(&self) -> &Arc<ReadModelIndex> {
        &self.actors.index
    }

    // Per-entity command/query surfaces.

    pub fn owners(&self) -> OwnerService {
        OwnerService::new(self.clone())
    }

    pub fn organizations(&self) -> OrganizationService {
        OrganizationService::new(self.clone())
    }

    pub fn repositories(&self) -> RepositoryService {
        RepositoryService::new(self.clone())
    }

    pub fn branches(&self) -> BranchService {
        BranchService::new(self.clone())
    }

    pub fn references(&self) -> ReferenceService {
        ReferenceService::new(self.clone())
    }

    pub fn directory_versions(&self) -> DirectoryVersionService {
        DirectoryVersionService::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::branch::service::{
        CreateBranchParameters, CreateReferenceParameters, DeleteBranchParameters,
        EnableFeatureParameters, RebaseParameters, RemoveReferenceParameters,
    };
    use crate::domains::organization::service::CreateOrganizationParameters;
    use crate::domains::owner::service::{CreateOwnerParameters, SetOwnerNameParameters};
    use crate::domains::repository::service::{
        CreateRepositoryParameters, DeleteRepositoryParameters, RepositoryPathParameters,
        SetRetentionDaysParameters,
    };
    use crate::errors::{DomainError, Precondition, ServiceError};
    use crate::pipeline::PathParameters;
    use crate::types::{
        EntityKind, OrganizationType, OwnerType, ReferenceType, RepositoryStatus,
        RepositoryVisibility, SearchVisibility,
    };
    use std::future::Future;
    use std::time::Duration;
    use uuid::Uuid;

    fn cid() -> String {
        Uuid::new_v4().to_string()
    }

    fn sha() -> String {
        "ab".repeat(32)
    }

    async fn app() -> ApplicationContext {
        ApplicationContext::initialize(GraceConfig::default())
            .await
            .unwrap()
    }

    async fn eventually<F, Fut>(mut condition: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        for _ in 0..100 {
            if condition().await {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    /// Creates owner -> organization -> repository and returns their ids.
    async fn setup_repository(app: &ApplicationContext) -> (Uuid, Uuid, Uuid) {
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

        (owner_id, organization_id, repository_id)
    }

    async fn setup_branch(
        app: &ApplicationContext,
        repository_id: Uuid,
        name: &str,
        parent: Option<Uuid>,
    ) -> Uuid {
        let branch_id = Uuid::new_v4();
        app.branches()
            .create(CreateBranchParameters {
                path: PathParameters {
                    correlation_id: cid(),
                    repository_id: Some(repository_id.to_string()),
                    ..Default::default()
                },
                new_branch_id: branch_id.to_string(),
                new_branch_name: name.to_string(),
                parent_branch_id: parent.map(|p| p.to_string()),
                based_on: None,
            })
            .await
            .unwrap();
        branch_id
    }

    fn branch_path(branch_id: Uuid) -> PathParameters {
        PathParameters {
            correlation_id: cid(),
            branch_id: Some(branch_id.to_string()),
            ..Default::default()
        }
    }

    fn repository_path(repository_id: Uuid) -> PathParameters {
        PathParameters {
            correlation_id: cid(),
            repository_id: Some(repository_id.to_string()),
            ..Default::default()
        }
    }

    fn save_params(branch_id: Uuid) -> CreateReferenceParameters {
        CreateReferenceParameters {
            path: branch_path(branch_id),
            directory_version_id: Uuid::new_v4().to_string(),
            sha256_hash: sha(),
            message: "work in progress".to_string(),
        }
    }

    // Scenario A: Create -> Get returns the created read-model.
    #[tokio::test]
    async fn test_create_then_get_repository() {
        let app = app().await;
        let (owner_id, organization_id, repository_id) = setup_repository(&app).await;

        let dto = app
            .repositories()
            .get(RepositoryPathParameters {
                path: repository_path(repository_id),
            })
            .await
            .unwrap();
        assert_eq!(dto.repository_name, "demo");
        assert_eq!(dto.owner_id, owner_id);
        assert_eq!(dto.organization_id, organization_id);
        assert_eq!(dto.status, RepositoryStatus::Active);
        assert!(dto.deleted_at.is_none());
        assert_eq!(dto.retention, app.config.default_retention);
    }

    // Name resolution: the same repository is reachable by names alone.
    #[tokio::test]
    async fn test_resolution_by_names() {
        let app = app().await;
        let (_, _, repository_id) = setup_repository(&app).await;

        let dto = app
            .repositories()
            .get(RepositoryPathParameters {
                path: PathParameters {
                    correlation_id: cid(),
                    owner_name: Some("alice".to_string()),
                    organization_name: Some("engineering".to_string()),
                    repository_name: Some("demo".to_string()),
                    ..Default::default()
                },
            })
            .await
            .unwrap();
        assert_eq!(dto.repository_id, repository_id);
    }

    // Scenario B: a correlation id may not be applied twice.
    #[tokio::test]
    async fn test_duplicate_correlation_id_is_rejected() {
        let app = app().await;
        let (_, _, repository_id) = setup_repository(&app).await;

        let correlation_id = "c-1".to_string();
        let params = |days| SetRetentionDaysParameters {
            path: PathParameters {
                correlation_id: correlation_id.clone(),
                repository_id: Some(repository_id.to_string()),
                ..Default::default()
            },
            days,
        };
        app.repositories().set_save_days(params(30)).await.unwrap();
        let error = app.repositories().set_save_days(params(60)).await.unwrap_err();
        match error {
            ServiceError::Command {
                source: DomainError::DuplicateCorrelationId(id),
                ..
            } => assert_eq!(id, "c-1"),
            other => panic!("expected DuplicateCorrelationId, got {:?}", other),
        }

        // Exactly one application survives.
        let dto = app
            .repositories()
            .get(RepositoryPathParameters {
                path: repository_path(repository_id),
            })
            .await
            .unwrap();
        assert_eq!(dto.retention.save_days, 30);
    }

    // Scenario C: with save-days = 0 a save is physically deleted as
    // soon as its retention reminder fires, and its event log is gone.
    #[tokio::test]
    async fn test_save_retention_expires_reference() {
        let app = app().await;
        let (_, _, repository_id) = setup_repository(&app).await;
        let branch_id = setup_branch(&app, repository_id, "main", None).await;

        app.repositories()
            .set_save_days(SetRetentionDaysParameters {
                path: repository_path(repository_id),
                days: 0,
            })
            .await
            .unwrap();

        let response = app.branches().save(save_params(branch_id)).await.unwrap();
        let reference_id: Uuid = response.return_value.properties["reference_id"]
            .parse()
            .unwrap();

        let host = app.host().clone();
        let expired = eventually(|| {
            let host = host.clone();
            async move {
                let proxy = host.reference(reference_id).await.unwrap();
                !proxy.exists().await.unwrap()
            }
        })
        .await;
        assert!(expired, "save reference should expire with save_days = 0");

        let stored = app
            .actors
            .store
            .retrieve(&format!("reference/{}", reference_id), "events")
            .await
            .unwrap();
        assert!(stored.is_none(), "event log must be deleted from the store");

        // A fired one-shot leaves nothing behind in the reminder table.
        let reminders = app.actors.reminders.clone();
        let drained = eventually(|| {
            let reminders = reminders.clone();
            async move { reminders.pending_count() == 0 }
        })
        .await;
        assert!(drained, "completed reminders must drop out of the table");
    }

    // Scenario D: a disabled reference type rejects the command and
    // creates nothing.
    #[tokio::test]
    async fn test_disabled_save_is_rejected() {
        let app = app().await;
        let (_, _, repository_id) = setup_repository(&app).await;
        let branch_id = setup_branch(&app, repository_id, "main", None).await;

        app.branches()
            .enable_save(EnableFeatureParameters {
                path: branch_path(branch_id),
                enabled: false,
            })
            .await
            .unwrap();

        let error = app.branches().save(save_params(branch_id)).await.unwrap_err();
        match error {
            ServiceError::Command {
                source:
                    DomainError::PreconditionFailed(Precondition::ReferenceTypeDisabled(
                        ReferenceType::Save,
                    )),
                ..
            } => {}
            other => panic!("expected SaveIsDisabled, got {:?}", other),
        }
        assert!(app.index().references_of(branch_id).is_empty());
    }

    // Scenario E: force-deleting a repository cascades through
    // branches and references once the timers fire.
    #[tokio::test]
    async fn test_cascade_delete_repository() {
        let app = app().await;
        let (_, _, repository_id) = setup_repository(&app).await;
        app.repositories()
            .set_logical_delete_days(SetRetentionDaysParameters {
                path: repository_path(repository_id),
                days: 0,
            })
            .await
            .unwrap();

        let main = setup_branch(&app, repository_id, "main", None).await;
        let feature = setup_branch(&app, repository_id, "feature", Some(main)).await;
        let mut references = Vec::new();
        for branch_id in [main, feature] {
            for _ in 0..2 {
                let response = app.branches().commit(save_params(branch_id)).await.unwrap();
                let reference_id: Uuid = response.return_value.properties["reference_id"]
                    .parse()
                    .unwrap();
                references.push(reference_id);
            }
        }

        app.repositories()
            .delete(DeleteRepositoryParameters {
                path: repository_path(repository_id),
                delete_reason: "retire".to_string(),
                force: true,
            })
            .await
            .unwrap();

        let host = app.host().clone();
        let gone = eventually(|| {
            let host = host.clone();
            let references = references.clone();
            async move {
                if host.repository(repository_id).await.unwrap().exists().await.unwrap() {
                    return false;
                }
                for branch_id in [main, feature] {
                    if host.branch(branch_id).await.unwrap().exists().await.unwrap() {
                        return false;
                    }
                }
                for reference_id in references {
                    if host.reference(reference_id).await.unwrap().exists().await.unwrap() {
                        return false;
                    }
                }
                true
            }
        })
        .await;
        assert!(gone, "repository, branches, and references should all be physically deleted");
    }

    // Scenario F: rebase creates a rebase reference mirroring the
    // parent promotion and moves based_on without touching latest_*.
    #[tokio::test]
    async fn test_rebase_onto_parent_promotion() {
        let app = app().await;
        let (_, _, repository_id) = setup_repository(&app).await;
        let main = setup_branch(&app, repository_id, "main", None).await;
        let feature = setup_branch(&app, repository_id, "feature", Some(main)).await;

        let promotion = app.branches().promote(save_params(main)).await.unwrap();
        let promotion_id: Uuid = promotion.return_value.properties["reference_id"]
            .parse()
            .unwrap();
        let promotion_dto = app.host().reference(promotion_id).await.unwrap().get().await.unwrap();

        let before = app
            .branches()
            .get(crate::domains::branch::service::BranchPathParameters {
                path: branch_path(feature),
            })
            .await
            .unwrap();

        let rebase = app
            .branches()
            .rebase(RebaseParameters {
                path: branch_path(feature),
                reference_id: promotion_id.to_string(),
            })
            .await
            .unwrap();
        let rebase_reference_id: Uuid = rebase.return_value.properties["reference_id"]
            .parse()
            .unwrap();

        let rebase_proxy = app.host().reference(rebase_reference_id).await.unwrap();
        assert_eq!(
            rebase_proxy.read(|r| r.reference_type()).await.unwrap(),
            ReferenceType::Rebase
        );
        let feature_proxy = app.host().branch(feature).await.unwrap();
        assert_eq!(
            feature_proxy.read(|b| b.parent_branch()).await.unwrap(),
            Some(main)
        );

        let rebase_dto = rebase_proxy.get().await.unwrap();
        assert_eq!(rebase_dto.reference_type, ReferenceType::Rebase);
        assert_eq!(rebase_dto.directory_version_id, promotion_dto.directory_version_id);
        assert_eq!(rebase_dto.sha256_hash, promotion_dto.sha256_hash);
        assert_eq!(rebase_dto.reference_text, promotion_dto.reference_text);

        let after = app
            .branches()
            .get(crate::domains::branch::service::BranchPathParameters {
                path: branch_path(feature),
            })
            .await
            .unwrap();
        assert_eq!(after.based_on, Some(promotion_id));
        assert_eq!(after.latest_promotion, before.latest_promotion);
        assert_eq!(after.latest_commit, before.latest_commit);
        assert_eq!(after.latest_save, before.latest_save);
        assert_eq!(after.latest_checkpoint, before.latest_checkpoint);
    }

    // Property 7: promote updates both the latest-promotion pointer
    // and based_on.
    #[tokio::test]
    async fn test_promote_moves_latest_promotion_and_based_on() {
        let app = app().await;
        let (_, _, repository_id) = setup_repository(&app).await;
        let main = setup_branch(&app, repository_id, "main", None).await;

        let response = app.branches().promote(save_params(main)).await.unwrap();
        let promotion_id: Uuid = response.return_value.properties["reference_id"]
            .parse()
            .unwrap();

        let dto = app
            .branches()
            .get(crate::domains::branch::service::BranchPathParameters {
                path: branch_path(main),
            })
            .await
            .unwrap();
        assert_eq!(dto.latest_promotion, Some(promotion_id));
        assert_eq!(dto.based_on, Some(promotion_id));
    }

    // Property 4: after DeletePhysical the actor answers with the
    // default dto and exists() is false.
    #[tokio::test]
    async fn test_physical_delete_resets_to_default() {
        let app = app().await;
        let (_, _, repository_id) = setup_repository(&app).await;
        let branch_id = setup_branch(&app, repository_id, "main", None).await;

        let proxy = app.host().branch(branch_id).await.unwrap();
        proxy
            .handle(
                crate::domains::branch::types::BranchCommand::DeletePhysical,
                crate::types::EventMetadata::new(&cid()),
            )
            .await
            .unwrap();

        let proxy = app.host().branch(branch_id).await.unwrap();
        assert!(!proxy.exists().await.unwrap());
        let dto = proxy.get().await.unwrap();
        assert_eq!(dto.branch_id, Uuid::nil());
        assert!(dto.branch_name.is_empty());
    }

    // Property 5: at most one active entity of a name under the same
    // ancestors.
    #[tokio::test]
    async fn test_duplicate_names_are_rejected() {
        let app = app().await;
        let (_, _, repository_id) = setup_repository(&app).await;
        setup_branch(&app, repository_id, "main", None).await;

        let error = app
            .branches()
            .create(CreateBranchParameters {
                path: repository_path(repository_id),
                new_branch_id: Uuid::new_v4().to_string(),
                new_branch_name: "main".to_string(),
                parent_branch_id: None,
                based_on: None,
            })
            .await
            .unwrap_err();
        assert_eq!(error.code(), "Conflict");

        let error = app
            .repositories()
            .create(CreateRepositoryParameters {
                path: PathParameters {
                    correlation_id: cid(),
                    owner_name: Some("alice".to_string()),
                    organization_name: Some("engineering".to_string()),
                    ..Default::default()
                },
                new_repository_id: Uuid::new_v4().to_string(),
                new_repository_name: "demo".to_string(),
                visibility: RepositoryVisibility::Private,
            })
            .await
            .unwrap_err();
        assert_eq!(error.code(), "Conflict");
    }

    // Property 6: rename is reversible and the final name wins.
    #[tokio::test]
    async fn test_rename_owner_round_trip() {
        let app = app().await;
        let (owner_id, _, _) = setup_repository(&app).await;

        let rename = |name: &str| SetOwnerNameParameters {
            path: PathParameters {
                correlation_id: cid(),
                owner_id: Some(owner_id.to_string()),
                ..Default::default()
            },
            new_name: name.to_string(),
        };
        app.owners().set_name(rename("carol")).await.unwrap();
        app.owners().set_name(rename("alice")).await.unwrap();

        let dto = app
            .owners()
            .get(crate::domains::owner::service::OwnerPathParameters {
                path: PathParameters {
                    correlation_id: cid(),
                    owner_id: Some(owner_id.to_string()),
                    ..Default::default()
                },
            })
            .await
            .unwrap();
        assert_eq!(dto.owner_name, "alice");
        assert_eq!(app.index().owner_id_by_name("alice"), Some(owner_id));
        assert_eq!(app.index().owner_id_by_name("carol"), None);
    }

    // Property 1: the read-model is a pure fold of the persisted
    // events; a fresh activation replays to the same dto.
    #[tokio::test]
    async fn test_reactivation_replays_to_same_dto() {
        let app = app().await;
        let (_, _, repository_id) = setup_repository(&app).await;
        app.repositories()
            .set_save_days(SetRetentionDaysParameters {
                path: repository_path(repository_id),
                days: 14,
            })
            .await
            .unwrap();

        let before = app
            .repositories()
            .get(RepositoryPathParameters {
                path: repository_path(repository_id),
            })
            .await
            .unwrap();

        // Evict the resident instance; the next call reactivates from
        // the store and must fold to the identical read-model.
        app.host().evict(EntityKind::Repository, repository_id).await;
        let after = app
            .repositories()
            .get(RepositoryPathParameters {
                path: repository_path(repository_id),
            })
            .await
            .unwrap();
        assert_eq!(before.repository_name, after.repository_name);
        assert_eq!(before.retention, after.retention);
        assert_eq!(before.created_at, after.created_at);
    }

    // Latest pointers survive eviction through the activate-time
    // read-model repair even though pointer events are not persisted.
    #[tokio::test]
    async fn test_latest_pointers_repaired_on_activation() {
        let app = app().await;
        let (_, _, repository_id) = setup_repository(&app).await;
        let main = setup_branch(&app, repository_id, "main", None).await;

        let commit = app.branches().commit(save_params(main)).await.unwrap();
        let commit_id: Uuid = commit.return_value.properties["reference_id"].parse().unwrap();
        let save = app.branches().save(save_params(main)).await.unwrap();
        let save_id: Uuid = save.return_value.properties["reference_id"].parse().unwrap();

        app.host().evict(EntityKind::Branch, main).await;

        let dto = app
            .branches()
            .get(crate::domains::branch::service::BranchPathParameters {
                path: branch_path(main),
            })
            .await
            .unwrap();
        assert_eq!(dto.latest_commit, Some(commit_id));
        assert_eq!(dto.latest_save, Some(save_id));

        let proxy = app.host().branch(main).await.unwrap();
        assert_eq!(proxy.read(|b| b.latest_commit()).await.unwrap(), Some(commit_id));
    }

    // Undelete wins while the physical-deletion timer has not fired.
    #[tokio::test]
    async fn test_undelete_restores_branch() {
        let app = app().await;
        let (_, _, repository_id) = setup_repository(&app).await;
        let branch_id = setup_branch(&app, repository_id, "main", None).await;

        app.branches()
            .delete(DeleteBranchParameters {
                path: branch_path(branch_id),
                delete_reason: "cleanup".to_string(),
                force: true,
            })
            .await
            .unwrap();
        let deleted = app.host().branch(branch_id).await.unwrap();
        assert!(deleted.is_deleted().await.unwrap());

        app.branches()
            .undelete(crate::domains::branch::service::BranchPathParameters {
                path: branch_path(branch_id),
            })
            .await
            .unwrap();
        let restored = app.host().branch(branch_id).await.unwrap();
        assert!(!restored.is_deleted().await.unwrap());
        assert!(restored.exists().await.unwrap());
    }

    // A retried reference-producing command stays idempotent even
    // after the branch rebuilt from durable state and forgot its
    // transient pointer events: the derived reference id lands the
    // retry on the original reference actor, which rejects it.
    #[tokio::test]
    async fn test_reference_command_retry_after_reactivation() {
        let app = app().await;
        let (_, _, repository_id) = setup_repository(&app).await;
        let main = setup_branch(&app, repository_id, "main", None).await;

        let correlation_id = "c-commit-1".to_string();
        let params = || CreateReferenceParameters {
            path: PathParameters {
                correlation_id: correlation_id.clone(),
                branch_id: Some(main.to_string()),
                ..Default::default()
            },
            directory_version_id: Uuid::new_v4().to_string(),
            sha256_hash: sha(),
            message: "first".to_string(),
        };
        let first = app.branches().commit(params()).await.unwrap();
        let reference_id: Uuid = first.return_value.properties["reference_id"]
            .parse()
            .unwrap();

        // Reactivation drops the in-memory pointer events together
        // with their correlation ids.
        app.host().evict(EntityKind::Branch, main).await;

        let error = app.branches().commit(params()).await.unwrap_err();
        match error {
            ServiceError::Command {
                source: DomainError::DuplicateCorrelationId(id),
                ..
            } => assert_eq!(id, correlation_id),
            other => panic!("expected DuplicateCorrelationId, got {:?}", other),
        }

        let references = app.index().references_of(main);
        assert_eq!(references.len(), 1);
        assert_eq!(references[0].reference_id, reference_id);
    }

    // RemoveReference logically deletes the target and refuses
    // references that belong to another branch.
    #[tokio::test]
    async fn test_remove_reference() {
        let app = app().await;
        let (_, _, repository_id) = setup_repository(&app).await;
        let main = setup_branch(&app, repository_id, "main", None).await;
        let other = setup_branch(&app, repository_id, "other", None).await;

        let commit = app.branches().commit(save_params(main)).await.unwrap();
        let reference_id: Uuid = commit.return_value.properties["reference_id"]
            .parse()
            .unwrap();

        app.branches()
            .remove_reference(RemoveReferenceParameters {
                path: branch_path(main),
                reference_id: reference_id.to_string(),
            })
            .await
            .unwrap();
        let proxy = app.host().reference(reference_id).await.unwrap();
        assert!(proxy.exists().await.unwrap());
        assert!(proxy.is_deleted().await.unwrap());

        let foreign = app.branches().commit(save_params(other)).await.unwrap();
        let foreign_id = &foreign.return_value.properties["reference_id"];
        let error = app
            .branches()
            .remove_reference(RemoveReferenceParameters {
                path: branch_path(main),
                reference_id: foreign_id.clone(),
            })
            .await
            .unwrap_err();
        match error {
            ServiceError::Command {
                source: DomainError::PreconditionFailed(Precondition::ForeignReference),
                ..
            } => {}
            other => panic!("expected ForeignReference, got {:?}", other),
        }
    }

    // A branch with live references refuses deletion without force.
    #[tokio::test]
    async fn test_delete_with_children_requires_force() {
        let app = app().await;
        let (_, _, repository_id) = setup_repository(&app).await;
        let branch_id = setup_branch(&app, repository_id, "main", None).await;
        app.branches().commit(save_params(branch_id)).await.unwrap();

        let error = app
            .branches()
            .delete(DeleteBranchParameters {
                path: branch_path(branch_id),
                delete_reason: "cleanup".to_string(),
                force: false,
            })
            .await
            .unwrap_err();
        match error {
            ServiceError::Command {
                source: DomainError::PreconditionFailed(Precondition::ChildrenExist(children)),
                ..
            } => assert_eq!(children, vec!["references".to_string()]),
            other => panic!("expected ChildrenExist, got {:?}", other),
        }
    }
}
