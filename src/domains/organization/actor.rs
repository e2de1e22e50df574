use crate::domains::core::actor_state::EntityState;
use crate::domains::core::deletion::{DeletionPayload, PHYSICAL_DELETION_REMINDER};
use crate::domains::organization::types::{
    OrganizationCommand, OrganizationDto, OrganizationEvent,
};
use crate::domains::repository::types::RepositoryCommand;
use crate::errors::{DomainError, DomainResult, Precondition};
use crate::platform::actor_host::{ActorContext, EntityActor};
use crate::platform::reminders::ReminderDelivery;
use crate::types::{CommandOutcome, EntityKind, EventMetadata};
use async_trait::async_trait;
use uuid::Uuid;

/// Organization entity actor. Children are repositories, enumerated
/// through the read-model index.
pub struct OrganizationActor {
    state: EntityState<OrganizationDto>,
}

impl OrganizationActor {
    async fn cascade_delete_logical(
        &self,
        ctx: &ActorContext,
        delete_reason: &str,
        metadata: &EventMetadata,
    ) {
        for repository_id in ctx.index.repositories_of(self.state.id) {
            let command = RepositoryCommand::DeleteLogical {
                delete_reason: delete_reason.to_string(),
                force: true,
            };
            let result = match ctx.host.repository(repository_id).await {
                Ok(proxy) => proxy.handle(command, metadata.clone()).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                log::warn!(
                    "cascading logical delete of repository {} failed: {}",
                    repository_id,
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
        for repository_id in ctx.index.repositories_of(self.state.id) {
            let result = match ctx.host.repository(repository_id).await {
                Ok(proxy) => {
                    proxy
                        .handle(RepositoryCommand::DeletePhysical, metadata.clone())
                        .await
                }
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                log::warn!(
                    "cascading physical delete of repository {} failed: {}",
                    repository_id,
                    e
                );
            }
        }
        ctx.reminders.unregister(
            EntityKind::Organization,
            self.state.id,
            PHYSICAL_DELETION_REMINDER,
        );
        let event_name = self
            .state
            .physically_delete(ctx, OrganizationEvent::PhysicalDeleted, metadata)
            .await?;
        ctx.host.evict(EntityKind::Organization, self.state.id).await;
        Ok(CommandOutcome::new(event_name, self.state.id))
    }
}

#[async_trait]
impl EntityActor for OrganizationActor {
    const KIND: EntityKind = EntityKind::Organization;
    type Command = OrganizationCommand;
    type Dto = OrganizationDto;

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
        command: OrganizationCommand,
        metadata: EventMetadata,
    ) -> DomainResult<CommandOutcome> {
        self.state.guard_correlation(&metadata)?;
        let id = self.state.id;
        match command {
            OrganizationCommand::Create {
                owner_id,
                organization_name,
                organization_type,
                search_visibility,
            } => {
                self.state.guard_not_exists()?;
                let event = OrganizationEvent::Created {
                    organization_id: id,
                    owner_id,
                    organization_name,
                    organization_type,
                    search_visibility,
                };
                let event_name = self.state.apply(ctx, event, &metadata).await?;
                Ok(CommandOutcome::new(event_name, id)
                    .with_property("owner_id", &owner_id.to_string()))
            }
            OrganizationCommand::SetName { organization_name } => {
                self.state.guard_exists()?;
                self.state.guard_not_deleted(self.state.dto.deleted_at)?;
                let event = OrganizationEvent::NameSet { organization_name };
                let event_name = self.state.apply(ctx, event, &metadata).await?;
                Ok(CommandOutcome::new(event_name, id))
            }
            OrganizationCommand::SetType { organization_type } => {
                self.state.guard_exists()?;
                self.state.guard_not_deleted(self.state.dto.deleted_at)?;
                let event = OrganizationEvent::TypeSet { organization_type };
                let event_name = self.state.apply(ctx, event, &metadata).await?;
                Ok(CommandOutcome::new(event_name, id))
            }
            OrganizationCommand::SetSearchVisibility { search_visibility } => {
                self.state.guard_exists()?;
                self.state.guard_not_deleted(self.state.dto.deleted_at)?;
                let event = OrganizationEvent::SearchVisibilitySet { search_visibility };
                let event_name = self.state.apply(ctx, event, &metadata).await?;
                Ok(CommandOutcome::new(event_name, id))
            }
            OrganizationCommand::DeleteLogical {
                delete_reason,
                force,
            } => {
                self.state.guard_exists()?;
                self.state.guard_not_deleted(self.state.dto.deleted_at)?;
                let repositories = ctx.index.repositories_of(id);
                if !repositories.is_empty() && !force {
                    return Err(DomainError::PreconditionFailed(Precondition::ChildrenExist(
                        vec!["repositories".to_string()],
                    )));
                }
                if !repositories.is_empty() {
                    self.cascade_delete_logical(ctx, &delete_reason, &metadata).await;
                }
                let event = OrganizationEvent::LogicalDeleted {
                    delete_reason: delete_reason.clone(),
                };
                let event_name = self.state.apply(ctx, event, &metadata).await?;
                let payload = DeletionPayload::new(&delete_reason, &metadata.correlation_id)
                    .with_owner(self.state.dto.owner_id)
                    .with_organization(id);
                ctx.reminders.register(
                    EntityKind::Organization,
                    id,
                    PHYSICAL_DELETION_REMINDER,
                    serde_json::to_value(payload)
                        .map_err(|e| DomainError::Internal(e.to_string()))?,
                    chrono::Duration::days(ctx.retention_defaults.logical_delete_days as i64),
                    None,
                )?;
                Ok(CommandOutcome::new(event_name, id))
            }
            OrganizationCommand::Undelete => {
                self.state.guard_exists()?;
                if self.state.dto.deleted_at.is_none() {
                    return Err(DomainError::Conflict(
                        "organization is not logically deleted".to_string(),
                    ));
                }
                ctx.reminders
                    .unregister(EntityKind::Organization, id, PHYSICAL_DELETION_REMINDER);
                let event_name = self
                    .state
                    .apply(ctx, OrganizationEvent::Undeleted, &metadata)
                    .await?;
                Ok(CommandOutcome::new(event_name, id))
            }
            OrganizationCommand::DeletePhysical => {
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
                "organization {} received unknown reminder {}",
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

    fn dto(&self) -> OrganizationDto {
        self.state.dto.clone()
    }
}
