use crate::domains::core::actor_state::EntityState;
use crate::domains::core::deletion::{DeletionPayload, PHYSICAL_DELETION_REMINDER};
use crate::domains::reference::types::{ReferenceCommand, ReferenceDto, ReferenceEvent};
use crate::errors::{DomainError, DomainResult, ValidationError};
use crate::platform::actor_host::{ActorContext, EntityActor};
use crate::platform::reminders::ReminderDelivery;
use crate::types::{CommandOutcome, EntityKind, EventMetadata, ReferenceType, RetentionPolicy};
use crate::validation::is_valid_sha256;
use async_trait::async_trait;
use uuid::Uuid;

/// Reference entity actor. Saves and checkpoints schedule their own
/// physical deletion from the owning repository's retention policy as
/// soon as they are created.
pub struct ReferenceActor {
    state: EntityState<ReferenceDto>,
}

impl ReferenceActor {
    /// Reference-type getter used by branch validation paths.
    pub fn reference_type(&self) -> ReferenceType {
        self.state.dto.reference_type
    }

    async fn repository_retention(&self, ctx: &ActorContext) -> RetentionPolicy {
        let repository_id = self.state.dto.repository_id;
        match ctx.host.repository(repository_id).await {
            Ok(proxy) => match proxy.read(|r| r.retention()).await {
                Ok(retention) => retention,
                Err(e) => {
                    log::warn!(
                        "retention lookup on repository {} failed, using defaults: {}",
                        repository_id,
                        e
                    );
                    ctx.retention_defaults
                }
            },
            Err(e) => {
                log::warn!(
                    "repository proxy {} unavailable, using default retention: {}",
                    repository_id,
                    e
                );
                ctx.retention_defaults
            }
        }
    }

    fn schedule_physical_deletion(
        &self,
        ctx: &ActorContext,
        delete_reason: &str,
        correlation_id: &str,
        days: u32,
    ) -> DomainResult<()> {
        let payload = DeletionPayload::new(delete_reason, correlation_id)
            .with_repository(self.state.dto.repository_id)
            .with_branch(self.state.dto.branch_id);
        ctx.reminders.register(
            EntityKind::Reference,
            self.state.id,
            PHYSICAL_DELETION_REMINDER,
            serde_json::to_value(payload).map_err(|e| DomainError::Internal(e.to_string()))?,
            chrono::Duration::days(days as i64),
            None,
        )
    }

    async fn delete_physically(
        &mut self,
        ctx: &ActorContext,
        metadata: &EventMetadata,
    ) -> DomainResult<CommandOutcome> {
        ctx.reminders.unregister(
            EntityKind::Reference,
            self.state.id,
            PHYSICAL_DELETION_REMINDER,
        );
        let event_name = self
            .state
            .physically_delete(ctx, ReferenceEvent::PhysicalDeleted, metadata)
            .await?;
        ctx.host.evict(EntityKind::Reference, self.state.id).await;
        Ok(CommandOutcome::new(event_name, self.state.id))
    }
}

#[async_trait]
impl EntityActor for ReferenceActor {
    const KIND: EntityKind = EntityKind::Reference;
    type Command = ReferenceCommand;
    type Dto = ReferenceDto;

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
        command: ReferenceCommand,
        metadata: EventMetadata,
    ) -> DomainResult<CommandOutcome> {
        self.state.guard_correlation(&metadata)?;
        let id = self.state.id;
        match command {
            ReferenceCommand::Create {
                repository_id,
                branch_id,
                directory_version_id,
                sha256_hash,
                reference_type,
                reference_text,
            } => {
                self.state.guard_not_exists()?;
                if !is_valid_sha256(&sha256_hash) {
                    return Err(DomainError::Validation(ValidationError::format(
                        "sha256_hash",
                        "must be a 64-character lowercase hex SHA-256",
                    )));
                }
                let event = ReferenceEvent::Created {
                    reference_id: id,
                    repository_id,
                    branch_id,
                    directory_version_id,
                    sha256_hash: sha256_hash.clone(),
                    reference_type,
                    reference_text,
                };
                let event_name = self.state.apply(ctx, event, &metadata).await?;

                // Saves and checkpoints expire on the repository's
                // retention clock, starting now.
                let retention_days = match reference_type {
                    ReferenceType::Save => {
                        Some(self.repository_retention(ctx).await.save_days)
                    }
                    ReferenceType::Checkpoint => {
                        Some(self.repository_retention(ctx).await.checkpoint_days)
                    }
                    _ => None,
                };
                if let Some(days) = retention_days {
                    self.schedule_physical_deletion(
                        ctx,
                        "retention expired",
                        &metadata.correlation_id,
                        days,
                    )?;
                }
                Ok(CommandOutcome::new(event_name, id)
                    .with_property("branch_id", &branch_id.to_string())
                    .with_property("directory_version_id", &directory_version_id.to_string())
                    .with_property("sha256_hash", &sha256_hash))
            }
            ReferenceCommand::DeleteLogical {
                delete_reason,
                retention,
            } => {
                self.state.guard_exists()?;
                self.state.guard_not_deleted(self.state.dto.deleted_at)?;
                let event = ReferenceEvent::LogicalDeleted {
                    delete_reason: delete_reason.clone(),
                };
                let event_name = self.state.apply(ctx, event, &metadata).await?;
                let retention = match retention {
                    Some(retention) => retention,
                    None => self.repository_retention(ctx).await,
                };
                self.schedule_physical_deletion(
                    ctx,
                    &delete_reason,
                    &metadata.correlation_id,
                    retention.logical_delete_days,
                )?;
                Ok(CommandOutcome::new(event_name, id))
            }
            ReferenceCommand::Undelete => {
                self.state.guard_exists()?;
                if self.state.dto.deleted_at.is_none() {
                    return Err(DomainError::Conflict(
                        "reference is not logically deleted".to_string(),
                    ));
                }
                ctx.reminders
                    .unregister(EntityKind::Reference, id, PHYSICAL_DELETION_REMINDER);
                let event_name = self
                    .state
                    .apply(ctx, ReferenceEvent::Undeleted, &metadata)
                    .await?;
                Ok(CommandOutcome::new(event_name, id))
            }
            ReferenceCommand::DeletePhysical => {
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
                "reference {} received unknown reminder {}",
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

    fn dto(&self) -> ReferenceDto {
        self.state.dto.clone()
    }
}
