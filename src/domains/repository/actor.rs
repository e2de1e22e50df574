use crate::domains::branch::types::BranchCommand;
use crate::domains::core::actor_state::EntityState;
use crate::domains::core::deletion::{DeletionPayload, PHYSICAL_DELETION_REMINDER};
use crate::domains::repository::types::{RepositoryCommand, RepositoryDto, RepositoryEvent};
use crate::errors::{DomainError, DomainResult, Precondition};
use crate::platform::actor_host::{ActorContext, EntityActor};
use crate::platform::reminders::ReminderDelivery;
use crate::types::{CommandOutcome, EntityKind, EventMetadata, RetentionPolicy};
use async_trait::async_trait;
use uuid::Uuid;

/// Repository entity actor. Carries the retention policy consulted by
/// reference and directory-version actors; children are branches.
pub struct RepositoryActor {
    state: EntityState<RepositoryDto>,
}

impl RepositoryActor {
    /// Retention policy getter used by reference actors when
    /// scheduling their own physical deletion.
    pub fn retention(&self) -> RetentionPolicy {
        self.state.dto.retention
    }

    async fn cascade_delete_logical(
        &self,
        ctx: &ActorContext,
        delete_reason: &str,
        metadata: &EventMetadata,
    ) {
        let retention = self.state.dto.retention;
        for branch_id in ctx.index.branches_of(self.state.id) {
            let command = BranchCommand::DeleteLogicalCascade {
                delete_reason: delete_reason.to_string(),
                retention,
            };
            let result = match ctx.host.branch(branch_id).await {
                Ok(proxy) => proxy.handle(command, metadata.clone()).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                log::warn!(
                    "cascading logical delete of branch {} failed: {}",
                    branch_id,
                    e
                );
            }
        }
    }

    async fn delete_physically(
        &mut self,
        ctx: &ActorContext,
        metadata: &EventMetadata,
    ) -> DomainResult<CommandOutcome> {
        // Branches delete their own references first, so the order
        // repository -> branch -> reference keeps the child-before-
        // parent rule intact.
        for branch_id in ctx.index.branches_of(self.state.id) {
            let result = match ctx.host.branch(branch_id).await {
                Ok(proxy) => {
                    proxy
                        .handle(BranchCommand::DeletePhysical, metadata.clone())
                        .await
                }
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                log::warn!(
                    "cascading physical delete of branch {} failed: {}",
                    branch_id,
                    e
                );
            }
        }
        ctx.reminders.unregister(
            EntityKind::Repository,
            self.state.id,
            PHYSICAL_DELETION_REMINDER,
        );
        let event_name = self
            .state
            .physically_delete(ctx, RepositoryEvent::PhysicalDeleted, metadata)
            .await?;
        ctx.host.evict(EntityKind::Repository, self.state.id).await;
        Ok(CommandOutcome::new(event_name, self.state.id))
    }

    async fn apply_simple(
        &mut self,
        ctx: &ActorContext,
        event: RepositoryEvent,
        metadata: &EventMetadata,
    ) -> DomainResult<CommandOutcome> {
        self.state.guard_exists()?;
        self.state.guard_not_deleted(self.state.dto.deleted_at)?;
        let event_name = self.state.apply(ctx, event, metadata).await?;
        Ok(CommandOutcome::new(event_name, self.state.id))
    }
}

#[async_trait]
impl EntityActor for RepositoryActor {
    const KIND: EntityKind = EntityKind::Repository;
    type Command = RepositoryCommand;
    type Dto = RepositoryDto;

    fn new(id: Uuid) -> Self {
        Self {
            state: EntityState::new(id),
        }
    }

    fn activated(&self) -> bool {
        self.state.activated
    }

    fn poisoned(&self) -> bool {
        self.state.poisoned
    }

    async fn activate(&mut self, ctx: &ActorContext) -> DomainResult<()> {
        self.state.load(ctx).await
    }

    async fn handle(
        &mut self,
        ctx: &ActorContext,
        command: RepositoryCommand,
        metadata: EventMetadata,
    ) -> DomainResult<CommandOutcome> {
        self.state.guard_correlation(&metadata)?;
        let id = self.state.id;
        match command {
            RepositoryCommand::Create {
                owner_id,
                organization_id,
                repository_name,
                visibility,
                retention,
            } => {
                self.state.guard_not_exists()?;
                let event = RepositoryEvent::Created {
                    repository_id: id,
                    owner_id,
                    organization_id,
                    repository_name,
                    visibility,
                    retention,
                };
                let event_name = self.state.apply(ctx, event, &metadata).await?;
                Ok(CommandOutcome::new(event_name, id)
                    .with_property("owner_id", &owner_id.to_string())
                    .with_property("organization_id", &organization_id.to_string()))
            }
            RepositoryCommand::SetName { repository_name } => {
                self.apply_simple(ctx, RepositoryEvent::NameSet { repository_name }, &metadata)
                    .await
            }
            RepositoryCommand::SetVisibility { visibility } => {
                self.apply_simple(ctx, RepositoryEvent::VisibilitySet { visibility }, &metadata)
                    .await
            }
            RepositoryCommand::SetStatus { status } => {
                self.apply_simple(ctx, RepositoryEvent::StatusSet { status }, &metadata)
                    .await
            }
            RepositoryCommand::SetRecordSaves { record_saves } => {
                self.apply_simple(
                    ctx,
                    RepositoryEvent::RecordSavesSet { record_saves },
                    &metadata,
                )
                .await
            }
            RepositoryCommand::SetDefaultServerApiVersion {
                default_server_api_version,
            } => {
                self.apply_simple(
                    ctx,
                    RepositoryEvent::DefaultServerApiVersionSet {
                        default_server_api_version,
                    },
                    &metadata,
                )
                .await
            }
            RepositoryCommand::SetSaveDays { save_days } => {
                self.apply_simple(ctx, RepositoryEvent::SaveDaysSet { save_days }, &metadata)
                    .await
            }
            RepositoryCommand::SetCheckpointDays { checkpoint_days } => {
                self.apply_simple(
                    ctx,
                    RepositoryEvent::CheckpointDaysSet { checkpoint_days },
                    &metadata,
                )
                .await
            }
            RepositoryCommand::SetDiffCacheDays { diff_cache_days } => {
                self.apply_simple(
                    ctx,
                    RepositoryEvent::DiffCacheDaysSet { diff_cache_days },
                    &metadata,
                )
                .await
            }
            RepositoryCommand::SetDirectoryVersionCacheDays {
                directory_version_cache_days,
            } => {
                self.apply_simple(
                    ctx,
                    RepositoryEvent::DirectoryVersionCacheDaysSet {
                        directory_version_cache_days,
                    },
                    &metadata,
                )
                .await
            }
            RepositoryCommand::SetLogicalDeleteDays {
                logical_delete_days,
            } => {
                self.apply_simple(
                    ctx,
                    RepositoryEvent::LogicalDeleteDaysSet {
                        logical_delete_days,
                    },
                    &metadata,
                )
                .await
            }
            RepositoryCommand::DeleteLogical {
                delete_reason,
                force,
            } => {
                self.state.guard_exists()?;
                self.state.guard_not_deleted(self.state.dto.deleted_at)?;
                let branches = ctx.index.branches_of(id);
                if !branches.is_empty() && !force {
                    return Err(DomainError::PreconditionFailed(Precondition::ChildrenExist(
                        vec!["branches".to_string()],
                    )));
                }
                if !branches.is_empty() {
                    self.cascade_delete_logical(ctx, &delete_reason, &metadata).await;
                }
                let event = RepositoryEvent::LogicalDeleted {
                    delete_reason: delete_reason.clone(),
                };
                let event_name = self.state.apply(ctx, event, &metadata).await?;
                let payload = DeletionPayload::new(&delete_reason, &metadata.correlation_id)
                    .with_owner(self.state.dto.owner_id)
                    .with_organization(self.state.dto.organization_id)
                    .with_repository(id);
                ctx.reminders.register(
                    EntityKind::Repository,
                    id,
                    PHYSICAL_DELETION_REMINDER,
                    serde_json::to_value(payload)
                        .map_err(|e| DomainError::Internal(e.to_string()))?,
                    chrono::Duration::days(self.state.dto.retention.logical_delete_days as i64),
                    None,
                )?;
                Ok(CommandOutcome::new(event_name, id))
            }
            RepositoryCommand::Undelete => {
                self.state.guard_exists()?;
                if self.state.dto.deleted_at.is_none() {
                    return Err(DomainError::Conflict(
                        "repository is not logically deleted".to_string(),
                    ));
                }
                ctx.reminders
                    .unregister(EntityKind::Repository, id, PHYSICAL_DELETION_REMINDER);
                let event_name = self
                    .state
                    .apply(ctx, RepositoryEvent::Undeleted, &metadata)
                    .await?;
                Ok(CommandOutcome::new(event_name, id))
            }
            RepositoryCommand::DeletePhysical => {
                self.state.guard_exists()?;
                self.delete_physically(ctx, &metadata).await
            }
        }
    }

    async fn receive_reminder(
        &mut self,
        ctx: &ActorContext,
        reminder: ReminderDelivery,
    ) -> DomainResult<()> {
        if reminder.name != PHYSICAL_DELETION_REMINDER {
            log::warn!(
                "repository {} received unknown reminder {}",
                self.state.id,
                reminder.name
            );
            return Ok(());
        }
        if !self.state.exists() {
            return Ok(());
        }
        let payload: DeletionPayload = serde_json::from_value(reminder.payload)
            .map_err(|e| DomainError::Internal(format!("deletion payload decode: {}", e)))?;
        let metadata = EventMetadata::new(&payload.correlation_id);
        self.delete_physically(ctx, &metadata).await.map(|_| ())
    }

    fn exists(&self) -> bool {
        self.state.exists()
    }

    fn is_deleted(&self) -> bool {
        self.state.dto.deleted_at.is_some()
    }

    fn dto(&self) -> RepositoryDto {
        self.state.dto.clone()
    }
}
