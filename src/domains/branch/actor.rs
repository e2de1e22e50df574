use crate::domains::branch::types::{BranchCommand, BranchDto, BranchEvent};
use crate::domains::core::actor_state::EntityState;
use crate::domains::core::deletion::{DeletionPayload, PHYSICAL_DELETION_REMINDER};
use crate::domains::reference::types::ReferenceCommand;
use crate::errors::{DomainError, DomainResult, Precondition};
use crate::platform::actor_host::{ActorContext, EntityActor};
use crate::platform::reminders::ReminderDelivery;
use crate::types::{
    derived_actor_id, CommandOutcome, EntityKind, EventMetadata, ReferenceType, RetentionPolicy,
};
use async_trait::async_trait;
use uuid::Uuid;

/// Branch entity actor. Reference-producing commands mint a new
/// reference id, create the reference actor, and only on success
/// apply the branch's own pointer event in memory.
pub struct BranchActor {
    state: EntityState<BranchDto>,
}

impl BranchActor {
    /// Parent-branch getter used by promotion and rebase paths.
    pub fn parent_branch(&self) -> Option<Uuid> {
        self.state.dto.parent_branch_id
    }

    pub fn latest_commit(&self) -> Option<Uuid> {
        self.state.dto.latest_commit
    }

    fn mint_reference_id(&self, metadata: &EventMetadata) -> Uuid {
        derived_actor_id(&format!("{}|{}", self.state.id, metadata.correlation_id))
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

    /// Shared path of every reference-producing command: gate on the
    /// per-type enable flag, create the reference actor, then apply
    /// the in-memory pointer event.
    #[allow(clippy::too_many_arguments)]
    async fn create_reference(
        &mut self,
        ctx: &ActorContext,
        reference_type: ReferenceType,
        enabled: bool,
        directory_version_id: Uuid,
        sha256_hash: String,
        reference_text: String,
        metadata: &EventMetadata,
        pointer_event: fn(Uuid) -> BranchEvent,
    ) -> DomainResult<CommandOutcome> {
        self.state.guard_exists()?;
        self.state.guard_not_deleted(self.state.dto.deleted_at)?;
        if !enabled {
            return Err(DomainError::PreconditionFailed(
                Precondition::ReferenceTypeDisabled(reference_type),
            ));
        }
        // The reference id is derived from (branch, correlation id):
        // the branch's pointer events are transient and vanish on
        // reactivation, so a client retry after a poisoned-actor
        // recovery must land on the same reference actor, whose own
        // guards reject the duplicate.
        let reference_id = self.mint_reference_id(metadata);
        let proxy = ctx.host.reference(reference_id).await?;
        proxy
            .handle(
                ReferenceCommand::Create {
                    repository_id: self.state.dto.repository_id,
                    branch_id: self.state.id,
                    directory_version_id,
                    sha256_hash: sha256_hash.clone(),
                    reference_type,
                    reference_text,
                },
                metadata.clone(),
            )
            .await?;
        let event_name = self
            .state
            .apply_transient(pointer_event(reference_id), metadata);
        Ok(CommandOutcome::new(event_name, self.state.id)
            .with_property("reference_id", &reference_id.to_string())
            .with_property("directory_version_id", &directory_version_id.to_string())
            .with_property("sha256_hash", &sha256_hash))
    }

    async fn apply_simple(
        &mut self,
        ctx: &ActorContext,
        event: BranchEvent,
        metadata: &EventMetadata,
    ) -> DomainResult<CommandOutcome> {
        self.state.guard_exists()?;
        self.state.guard_not_deleted(self.state.dto.deleted_at)?;
        let event_name = self.state.apply(ctx, event, metadata).await?;
        Ok(CommandOutcome::new(event_name, self.state.id))
    }

    async fn delete_logically(
        &mut self,
        ctx: &ActorContext,
        delete_reason: String,
        force: bool,
        retention: RetentionPolicy,
        metadata: &EventMetadata,
    ) -> DomainResult<CommandOutcome> {
        self.state.guard_exists()?;
        self.state.guard_not_deleted(self.state.dto.deleted_at)?;
        let id = self.state.id;
        let live_references: Vec<_> = ctx
            .index
            .references_of(id)
            .into_iter()
            .filter(|r| !r.deleted)
            .collect();
        if !live_references.is_empty() && !force {
            return Err(DomainError::PreconditionFailed(Precondition::ChildrenExist(
                vec!["references".to_string()],
            )));
        }
        for reference in live_references {
            let command = ReferenceCommand::DeleteLogical {
                delete_reason: delete_reason.clone(),
                retention: Some(retention),
            };
            let result = match ctx.host.reference(reference.reference_id).await {
                Ok(proxy) => proxy.handle(command, metadata.clone()).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                log::warn!(
                    "cascading logical delete of reference {} failed: {}",
                    reference.reference_id,
                    e
                );
            }
        }
        let event = BranchEvent::LogicalDeleted {
            delete_reason: delete_reason.clone(),
        };
        let event_name = self.state.apply(ctx, event, metadata).await?;
        let payload = DeletionPayload::new(&delete_reason, &metadata.correlation_id)
            .with_repository(self.state.dto.repository_id)
            .with_branch(id);
        ctx.reminders.register(
            EntityKind::Branch,
            id,
            PHYSICAL_DELETION_REMINDER,
            serde_json::to_value(payload).map_err(|e| DomainError::Internal(e.to_string()))?,
            chrono::Duration::days(retention.logical_delete_days as i64),
            None,
        )?;
        Ok(CommandOutcome::new(event_name, id))
    }

    async fn delete_physically(
        &mut self,
        ctx: &ActorContext,
        metadata: &EventMetadata,
    ) -> DomainResult<CommandOutcome> {
        // References go first; a branch may only disappear after its
        // references have (invariant of the deletion protocol).
        for reference in ctx.index.references_of(self.state.id) {
            let result = match ctx.host.reference(reference.reference_id).await {
                Ok(proxy) => {
                    proxy
                        .handle(ReferenceCommand::DeletePhysical, metadata.clone())
                        .await
                }
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                log::warn!(
                    "cascading physical delete of reference {} failed: {}",
                    reference.reference_id,
                    e
                );
            }
        }
        ctx.reminders
            .unregister(EntityKind::Branch, self.state.id, PHYSICAL_DELETION_REMINDER);
        let event_name = self
            .state
            .physically_delete(ctx, BranchEvent::PhysicalDeleted, metadata)
            .await?;
        ctx.host.evict(EntityKind::Branch, self.state.id).await;
        Ok(CommandOutcome::new(event_name, self.state.id))
    }
}

#[async_trait]
impl EntityActor for BranchActor {
    const KIND: EntityKind = EntityKind::Branch;
    type Command = BranchCommand;
    type Dto = BranchDto;

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

    /// Replay, then repair the latest-reference pointers from the
    /// read-model index: the pointer events are never persisted, so
    /// the fold alone cannot restore them.
    async fn activate(&mut self, ctx: &ActorContext) -> DomainResult<()> {
        self.state.load(ctx).await?;
        if self.state.exists() {
            let id = self.state.id;
            let latest_promotion = ctx.index.latest_reference(id, ReferenceType::Promotion);
            let dto = &mut self.state.dto;
            dto.latest_commit = ctx
                .index
                .latest_reference(id, ReferenceType::Commit)
                .map(|r| r.reference_id);
            dto.latest_checkpoint = ctx
                .index
                .latest_reference(id, ReferenceType::Checkpoint)
                .map(|r| r.reference_id);
            dto.latest_save = ctx
                .index
                .latest_reference(id, ReferenceType::Save)
                .map(|r| r.reference_id);
            dto.latest_promotion = latest_promotion.as_ref().map(|r| r.reference_id);
            // Promotions also move based_on, and they do it through a
            // non-persisted event; re-point when the promotion is
            // newer than the last persisted based_on change.
            if let Some(promotion) = latest_promotion {
                let newer = dto
                    .based_on_changed_at
                    .map(|changed_at| promotion.created_at > changed_at)
                    .unwrap_or(true);
                if newer {
                    dto.based_on = Some(promotion.reference_id);
                }
            }
        }
        Ok(())
    }

    async fn handle(
        &mut self,
        ctx: &ActorContext,
        command: BranchCommand,
        metadata: EventMetadata,
    ) -> DomainResult<CommandOutcome> {
        self.state.guard_correlation(&metadata)?;
        let id = self.state.id;
        match command {
            BranchCommand::Create {
                repository_id,
                branch_name,
                parent_branch_id,
                based_on,
            } => {
                self.state.guard_not_exists()?;
                let event = BranchEvent::Created {
                    branch_id: id,
                    repository_id,
                    branch_name,
                    parent_branch_id,
                    based_on,
                };
                let event_name = self.state.apply(ctx, event, &metadata).await?;
                Ok(CommandOutcome::new(event_name, id)
                    .with_property("repository_id", &repository_id.to_string()))
            }
            BranchCommand::Rebase { reference_id } => {
                self.state.guard_exists()?;
                self.state.guard_not_deleted(self.state.dto.deleted_at)?;
                let target = ctx.host.reference(reference_id).await?;
                if !target.exists().await? {
                    return Err(DomainError::not_found("reference", reference_id));
                }
                let target_dto = target.get().await?;
                if target_dto.reference_type != ReferenceType::Promotion {
                    return Err(DomainError::PreconditionFailed(
                        Precondition::RebaseTargetNotPromotion,
                    ));
                }
                if let Some(parent_branch_id) = self.state.dto.parent_branch_id {
                    if target_dto.branch_id != parent_branch_id {
                        return Err(DomainError::PreconditionFailed(
                            Precondition::ForeignReference,
                        ));
                    }
                }
                // The rebase reference snapshots the promotion's
                // content on this branch. Its id is derived from the
                // correlation id so a retry cannot mint a second one.
                let rebase_reference_id = self.mint_reference_id(&metadata);
                let proxy = ctx.host.reference(rebase_reference_id).await?;
                proxy
                    .handle(
                        ReferenceCommand::Create {
                            repository_id: self.state.dto.repository_id,
                            branch_id: id,
                            directory_version_id: target_dto.directory_version_id,
                            sha256_hash: target_dto.sha256_hash.clone(),
                            reference_type: ReferenceType::Rebase,
                            reference_text: target_dto.reference_text.clone(),
                        },
                        metadata.clone(),
                    )
                    .await?;
                let event = BranchEvent::Rebased {
                    based_on: reference_id,
                    rebase_reference_id,
                };
                let event_name = self.state.apply(ctx, event, &metadata).await?;
                Ok(CommandOutcome::new(event_name, id)
                    .with_property("reference_id", &rebase_reference_id.to_string())
                    .with_property("based_on", &reference_id.to_string()))
            }
            BranchCommand::SetName { branch_name } => {
                self.apply_simple(ctx, BranchEvent::NameSet { branch_name }, &metadata)
                    .await
            }
            BranchCommand::EnableAssign { enabled } => {
                self.apply_simple(ctx, BranchEvent::AssignEnabledSet { enabled }, &metadata)
                    .await
            }
            BranchCommand::EnablePromotion { enabled } => {
                self.apply_simple(ctx, BranchEvent::PromotionEnabledSet { enabled }, &metadata)
                    .await
            }
            BranchCommand::EnableCommit { enabled } => {
                self.apply_simple(ctx, BranchEvent::CommitEnabledSet { enabled }, &metadata)
                    .await
            }
            BranchCommand::EnableCheckpoint { enabled } => {
                self.apply_simple(
                    ctx,
                    BranchEvent::CheckpointEnabledSet { enabled },
                    &metadata,
                )
                .await
            }
            BranchCommand::EnableSave { enabled } => {
                self.apply_simple(ctx, BranchEvent::SaveEnabledSet { enabled }, &metadata)
                    .await
            }
            BranchCommand::EnableTag { enabled } => {
                self.apply_simple(ctx, BranchEvent::TagEnabledSet { enabled }, &metadata)
                    .await
            }
            BranchCommand::EnableExternal { enabled } => {
                self.apply_simple(ctx, BranchEvent::ExternalEnabledSet { enabled }, &metadata)
                    .await
            }
            BranchCommand::EnableAutoRebase { enabled } => {
                self.apply_simple(
                    ctx,
                    BranchEvent::AutoRebaseEnabledSet { enabled },
                    &metadata,
                )
                .await
            }
            BranchCommand::Assign {
                directory_version_id,
                sha256_hash,
                reference_text,
            } => {
                let enabled = self.state.dto.assign_enabled;
                self.create_reference(
                    ctx,
                    ReferenceType::Promotion,
                    enabled,
                    directory_version_id,
                    sha256_hash,
                    reference_text,
                    &metadata,
                    |reference_id| BranchEvent::Assigned { reference_id },
                )
                .await
            }
            BranchCommand::Promote {
                directory_version_id,
                sha256_hash,
                reference_text,
            } => {
                self.state.guard_exists()?;
                // A branch with a parent may only promote while based
                // on the parent's latest promotion.
                if let Some(parent_branch_id) = self.state.dto.parent_branch_id {
                    if let Some(parent_promotion) = ctx
                        .index
                        .latest_reference(parent_branch_id, ReferenceType::Promotion)
                    {
                        if self.state.dto.based_on != Some(parent_promotion.reference_id) {
                            return Err(DomainError::PreconditionFailed(
                                Precondition::NotBasedOnLatestPromotion,
                            ));
                        }
                    }
                }
                let enabled = self.state.dto.promotion_enabled;
                self.create_reference(
                    ctx,
                    ReferenceType::Promotion,
                    enabled,
                    directory_version_id,
                    sha256_hash,
                    reference_text,
                    &metadata,
                    |reference_id| BranchEvent::Promoted { reference_id },
                )
                .await
            }
            BranchCommand::Commit {
                directory_version_id,
                sha256_hash,
                reference_text,
            } => {
                let enabled = self.state.dto.commit_enabled;
                self.create_reference(
                    ctx,
                    ReferenceType::Commit,
                    enabled,
                    directory_version_id,
                    sha256_hash,
                    reference_text,
                    &metadata,
                    |reference_id| BranchEvent::Committed { reference_id },
                )
                .await
            }
            BranchCommand::Checkpoint {
                directory_version_id,
                sha256_hash,
                reference_text,
            } => {
                let enabled = self.state.dto.checkpoint_enabled;
                self.create_reference(
                    ctx,
                    ReferenceType::Checkpoint,
                    enabled,
                    directory_version_id,
                    sha256_hash,
                    reference_text,
                    &metadata,
                    |reference_id| BranchEvent::Checkpointed { reference_id },
                )
                .await
            }
            BranchCommand::Save {
                directory_version_id,
                sha256_hash,
                reference_text,
            } => {
                let enabled = self.state.dto.save_enabled;
                self.create_reference(
                    ctx,
                    ReferenceType::Save,
                    enabled,
                    directory_version_id,
                    sha256_hash,
                    reference_text,
                    &metadata,
                    |reference_id| BranchEvent::Saved { reference_id },
                )
                .await
            }
            BranchCommand::Tag {
                directory_version_id,
                sha256_hash,
                reference_text,
            } => {
                let enabled = self.state.dto.tag_enabled;
                self.create_reference(
                    ctx,
                    ReferenceType::Tag,
                    enabled,
                    directory_version_id,
                    sha256_hash,
                    reference_text,
                    &metadata,
                    |reference_id| BranchEvent::Tagged { reference_id },
                )
                .await
            }
            BranchCommand::CreateExternal {
                directory_version_id,
                sha256_hash,
                reference_text,
            } => {
                let enabled = self.state.dto.external_enabled;
                self.create_reference(
                    ctx,
                    ReferenceType::External,
                    enabled,
                    directory_version_id,
                    sha256_hash,
                    reference_text,
                    &metadata,
                    |reference_id| BranchEvent::ExternalCreated { reference_id },
                )
                .await
            }
            BranchCommand::RemoveReference { reference_id } => {
                self.state.guard_exists()?;
                self.state.guard_not_deleted(self.state.dto.deleted_at)?;
                let proxy = ctx.host.reference(reference_id).await?;
                if !proxy.exists().await? {
                    return Err(DomainError::not_found("reference", reference_id));
                }
                let reference_dto = proxy.get().await?;
                if reference_dto.branch_id != id {
                    return Err(DomainError::PreconditionFailed(
                        Precondition::ForeignReference,
                    ));
                }
                proxy
                    .handle(
                        ReferenceCommand::DeleteLogical {
                            delete_reason: "removed from branch".to_string(),
                            retention: None,
                        },
                        metadata.clone(),
                    )
                    .await?;
                let event = BranchEvent::ReferenceRemoved { reference_id };
                let event_name = self.state.apply(ctx, event, &metadata).await?;
                Ok(CommandOutcome::new(event_name, id)
                    .with_property("reference_id", &reference_id.to_string()))
            }
            BranchCommand::DeleteLogical {
                delete_reason,
                force,
            } => {
                let retention = self.repository_retention(ctx).await;
                self.delete_logically(ctx, delete_reason, force, retention, &metadata)
                    .await
            }
            BranchCommand::DeleteLogicalCascade {
                delete_reason,
                retention,
            } => {
                self.delete_logically(ctx, delete_reason, true, retention, &metadata)
                    .await
            }
            BranchCommand::Undelete => {
                self.state.guard_exists()?;
                if self.state.dto.deleted_at.is_none() {
                    return Err(DomainError::Conflict(
                        "branch is not logically deleted".to_string(),
                    ));
                }
                ctx.reminders
                    .unregister(EntityKind::Branch, id, PHYSICAL_DELETION_REMINDER);
                let event_name = self
                    .state
                    .apply(ctx, BranchEvent::Undeleted, &metadata)
                    .await?;
                Ok(CommandOutcome::new(event_name, id))
            }
            BranchCommand::DeletePhysical => {
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
                "branch {} received unknown reminder {}",
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

    fn dto(&self) -> BranchDto {
        self.state.dto.clone()
    }
}
