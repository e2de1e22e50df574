use crate::errors::{DomainError, DomainResult, StoreError};
use crate::platform::actor_host::{ActorContext, EntityActor};
use crate::platform::reminders::ReminderDelivery;
use crate::types::{derived_actor_id, CommandOutcome, EntityKind, EventMetadata};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Read-model of the repository-name index actor: a single cached
/// repository id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryNameDto {
    pub repository_id: Option<Uuid>,
}

/// Commands accepted by the repository-name index actor
#[derive(Debug, Clone)]
pub enum RepositoryNameCommand {
    SetRepositoryId { repository_id: Uuid },
    ClearRepositoryId,
}

/// Actor id of the name-index entry for
/// `{repository-name}|{owner-id}|{organization-id}`.
pub fn repository_name_actor_id(
    repository_name: &str,
    owner_id: Uuid,
    organization_id: Uuid,
) -> Uuid {
    derived_actor_id(&format!(
        "{}|{}|{}",
        repository_name, owner_id, organization_id
    ))
}

const VALUE_KEY: &str = "repository_id";

/// Lookup actor mapping a repository name (scoped to owner and
/// organization) to its stable id. Not event-sourced: the single
/// value is set by whoever created or renamed the repository.
pub struct RepositoryNameActor {
    id: Uuid,
    dto: RepositoryNameDto,
    activated: bool,
    poisoned: bool,
}

impl RepositoryNameActor {
    /// Cached repository id, if one has been bound to this name.
    pub fn repository_id(&self) -> Option<Uuid> {
        self.dto.repository_id
    }

    fn actor_id(&self) -> String {
        format!("{}/{}", EntityKind::RepositoryName, self.id)
    }
}

#[async_trait]
impl EntityActor for RepositoryNameActor {
    const KIND: EntityKind = EntityKind::RepositoryName;
    type Command = RepositoryNameCommand;
    type Dto = RepositoryNameDto;

    fn new(id: Uuid) -> Self {
        Self {
            id,
            dto: RepositoryNameDto::default(),
            activated: false,
            poisoned: false,
        }
    }

    fn activated(&self) -> bool {
        self.activated
    }

    fn poisoned(&self) -> bool {
        self.poisoned
    }

    async fn activate(&mut self, ctx: &ActorContext) -> DomainResult<()> {
        let bytes = ctx.store.retrieve(&self.actor_id(), VALUE_KEY).await?;
        self.dto = match bytes {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| DomainError::Store(StoreError::Serialization(e.to_string())))?,
            None => RepositoryNameDto::default(),
        };
        self.activated = true;
        self.poisoned = false;
        Ok(())
    }

    async fn handle(
        &mut self,
        ctx: &ActorContext,
        command: RepositoryNameCommand,
        _metadata: EventMetadata,
    ) -> DomainResult<CommandOutcome> {
        match command {
            RepositoryNameCommand::SetRepositoryId { repository_id } => {
                self.dto.repository_id = Some(repository_id);
                let bytes = serde_json::to_vec(&self.dto)
                    .map_err(|e| DomainError::Store(StoreError::Serialization(e.to_string())))?;
                if let Err(e) = ctx.store.save(&self.actor_id(), VALUE_KEY, &bytes).await {
                    self.poisoned = true;
                    return Err(DomainError::DependencyFailure(format!(
                        "failed to persist repository-name entry {}: {}",
                        self.actor_id(),
                        e
                    )));
                }
                Ok(CommandOutcome::new("RepositoryIdSet", self.id)
                    .with_property("repository_id", &repository_id.to_string()))
            }
            RepositoryNameCommand::ClearRepositoryId => {
                self.dto.repository_id = None;
                if let Err(e) = ctx.store.delete(&self.actor_id(), VALUE_KEY).await {
                    self.poisoned = true;
                    return Err(DomainError::DependencyFailure(format!(
                        "failed to clear repository-name entry {}: {}",
                        self.actor_id(),
                        e
                    )));
                }
                Ok(CommandOutcome::new("RepositoryIdCleared", self.id))
            }
        }
    }

    async fn receive_reminder(
        &mut self,
        _ctx: &ActorContext,
        reminder: ReminderDelivery,
    ) -> DomainResult<()> {
        log::warn!(
            "repository-name index {} received unexpected reminder {}",
            self.id,
            reminder.name
        );
        Ok(())
    }

    fn exists(&self) -> bool {
        self.dto.repository_id.is_some()
    }

    fn is_deleted(&self) -> bool {
        false
    }

    fn dto(&self) -> RepositoryNameDto {
        self.dto.clone()
    }
}
