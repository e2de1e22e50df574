use crate::domains::core::actor_state::EntityState;
use crate::domains::core::deletion::{DeletionPayload, PHYSICAL_DELETION_REMINDER};
use crate::domains::organization::types::OrganizationCommand;
use crate::domains::owner::types::{OwnerCommand, OwnerDto, OwnerEvent};
use crate::errors::{DomainError, DomainResult, Precondition};
use crate::platform::actor_host::{ActorContext, EntityActor};
use crate::platform::reminders::ReminderDelivery;
use crate::types::{CommandOutcome, EntityKind, EventMetadata};
use async_trait::async_trait;
use uuid::Uuid;

/// Owner entity actor. Owners sit at the top of the hierarchy; their
/// children are organizations, enumerated through the read-model
/// index for cascades and delete guards.
pub struct OwnerActor {
    state: EntityState<OwnerDto>,
}

impl OwnerActor {
    async fn cascade_delete_logical(
        &self,
        ctx: &ActorContext,
        delete_reason: &str,
        metadata: &EventMetadata,
    ) {
        for organization_id in ctx.index.organizations_of(self.state.id) {
            let command = OrganizationCommand::DeleteLogical {
                delete_reason: delete_reason.to_string(),
                force: true,
            };
            let result = match ctx.host.organization(organization_id).await {
                Ok(proxy) => proxy.handle(command, metadata.clone()).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                log::warn!(
                    "cascading logical delete of organization {} failed: {}",
                    organization_id,
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
        for organization_id in ctx.index.organizations_of(self.state.id) {
            let result = match ctx.host.organization(organization_id).await {
                Ok(proxy) => {
                    proxy
                        .handle(OrganizationCommand::DeletePhysical, metadata.clone())
                        .await
                }
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                log::warn!(
                    "cascading physical delete of organization {} failed: {}",
                    organization_id,
                    e
                );
            }
        }
        ctx.reminders
            .unregister(EntityKind::Owner, self.state.id, PHYSICAL_DELETION_REMINDER);
        let event_name = self
            .state
            .physically_delete(ctx, OwnerEvent::PhysicalDeleted, metadata)
            .await?;
        ctx.host.evict(EntityKind::Owner, self.state.id).await;
        Ok(CommandOutcome::new(event_name, self.state.id))
    }
}

#[async_trait]
impl EntityActor for OwnerActor {
    const KIND: EntityKind = EntityKind::Owner;
    type Command = OwnerCommand;
    type Dto = OwnerDto;

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
        command: OwnerCommand,
        metadata: EventMetadata,
    ) -> DomainResult<CommandOutcome> {
        self.state.guard_correlation(&metadata)?;
        let id = self.state.id;
        match command {
            OwnerCommand::Create {
                owner_name,
                owner_type,
                search_visibility,
            } => {
                self.state.guard_not_exists()?;
                let event = OwnerEvent::Created {
                    owner_id: id,
                    owner_name,
                    owner_type,
                    search_visibility,
                };
                let event_name = self.state.apply(ctx, event, &metadata).await?;
                Ok(CommandOutcome::new(event_name, id))
            }
            OwnerCommand::SetName { owner_name } => {
                self.state.guard_exists()?;
                self.state.guard_not_deleted(self.state.dto.deleted_at)?;
                let event_name = self
                    .state
                    .apply(ctx, OwnerEvent::NameSet { owner_name }, &metadata)
                    .await?;
                Ok(CommandOutcome::new(event_name, id))
            }
            OwnerCommand::SetType { owner_type } => {
                self.state.guard_exists()?;
                self.state.guard_not_deleted(self.state.dto.deleted_at)?;
                let event_name = self
                    .state
                    .apply(ctx, OwnerEvent::TypeSet { owner_type }, &metadata)
                    .await?;
                Ok(CommandOutcome::new(event_name, id))
            }
            OwnerCommand::SetDescription { description } => {
                self.state.guard_exists()?;
                self.state.guard_not_deleted(self.state.dto.deleted_at)?;
                let event_name = self
                    .state
                    .apply(ctx, OwnerEvent::DescriptionSet { description }, &metadata)
                    .await?;
                Ok(CommandOutcome::new(event_name, id))
            }
            OwnerCommand::SetSearchVisibility { search_visibility } => {
                self.state.guard_exists()?;
                self.state.guard_not_deleted(self.state.dto.deleted_at)?;
                let event = OwnerEvent::SearchVisibilitySet { search_visibility };
                let event_name = self.state.apply(ctx, event, &metadata).await?;
                Ok(CommandOutcome::new(event_name, id))
            }
            OwnerCommand::DeleteLogical {
                delete_reason,
                force,
            } => {
                self.state.guard_exists()?;
                self.state.guard_not_deleted(self.state.dto.deleted_at)?;
                let organizations = ctx.index.organizations_of(id);
                if !organizations.is_empty() && !force {
                    return Err(DomainError::PreconditionFailed(Precondition::ChildrenExist(
                        vec!["organizations".to_string()],
                    )));
                }
                if !organizations.is_empty() {
                    self.cascade_delete_logical(ctx, &delete_reason, &metadata).await;
                }
                let event = OwnerEvent::LogicalDeleted {
                    delete_reason: delete_reason.clone(),
                };
                let event_name = self.state.apply(ctx, event, &metadata).await?;
                let payload = DeletionPayload::new(&delete_reason, &metadata.correlation_id)
                    .with_owner(id);
                ctx.reminders.register(
                    EntityKind::Owner,
                    id,
                    PHYSICAL_DELETION_REMINDER,
                    serde_json::to_value(payload)
                        .map_err(|e| DomainError::Internal(e.to_string()))?,
                    chrono::Duration::days(ctx.retention_defaults.logical_delete_days as i64),
                    None,
                )?;
                Ok(CommandOutcome::new(event_name, id))
            }
            OwnerCommand::Undelete => {
                self.state.guard_exists()?;
                if self.state.dto.deleted_at.is_none() {
                    return Err(DomainError::Conflict(
                        "owner is not logically deleted".to_string(),
                    ));
                }
                ctx.reminders
                    .unregister(EntityKind::Owner, id, PHYSICAL_DELETION_REMINDER);
                let event_name = self
                    .state
                    .apply(ctx, OwnerEvent::Undeleted, &metadata)
                    .await?;
                Ok(CommandOutcome::new(event_name, id))
            }
            OwnerCommand::DeletePhysical => {
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
            log::warn!("owner {} received unknown reminder {}", self.state.id, reminder.name);
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

    fn dto(&self) -> OwnerDto {
        self.state.dto.clone()
    }
}
