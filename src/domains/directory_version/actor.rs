use crate::domains::core::actor_state::EntityState;
use crate::domains::core::deletion::{DeletionPayload, CACHE_EXPIRATION_REMINDER};
use crate::domains::directory_version::types::{
    DirectoryVersionCommand, DirectoryVersionDto, DirectoryVersionEvent,
};
use crate::errors::{DomainError, DomainResult, ValidationError};
use crate::platform::actor_host::{ActorContext, EntityActor};
use crate::platform::reminders::ReminderDelivery;
use crate::types::{CommandOutcome, EntityKind, EventMetadata};
use crate::validation::is_valid_sha256;
use async_trait::async_trait;
use uuid::Uuid;

/// DirectoryVersion entity actor: a content-addressed cache entry.
/// The blob store remains the source of truth; cached state expires
/// on the repository's directory-version retention clock.
pub struct DirectoryVersionActor {
    state: EntityState<DirectoryVersionDto>,
}

impl DirectoryVersionActor {
    async fn delete_physically(
        &mut self,
        ctx: &ActorContext,
        metadata: &EventMetadata,
    ) -> DomainResult<CommandOutcome> {
        ctx.reminders.unregister(
            EntityKind::DirectoryVersion,
            self.state.id,
            CACHE_EXPIRATION_REMINDER,
        );
        let event_name = self
            .state
            .physically_delete(ctx, DirectoryVersionEvent::PhysicalDeleted, metadata)
            .await?;
        ctx.host
            .evict(EntityKind::DirectoryVersion, self.state.id)
            .await;
        Ok(CommandOutcome::new(event_name, self.state.id))
    }
}

#[async_trait]
impl EntityActor for DirectoryVersionActor {
    const KIND: EntityKind = EntityKind::DirectoryVersion;
    type Command = DirectoryVersionCommand;
    type Dto = DirectoryVersionDto;

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
        command: DirectoryVersionCommand,
        metadata: EventMetadata,
    ) -> DomainResult<CommandOutcome> {
        self.state.guard_correlation(&metadata)?;
        let id = self.state.id;
        match command {
            DirectoryVersionCommand::Create {
                directory_version_id,
                repository_id,
                sha256_hash,
                relative_path,
                files,
                size,
                directories,
            } => {
                self.state.guard_not_exists()?;
                if !is_valid_sha256(&sha256_hash) {
                    return Err(DomainError::Validation(ValidationError::format(
                        "sha256_hash",
                        "must be a 64-character lowercase hex SHA-256",
                    )));
                }
                // The declared aggregate size must equal the sum of
                // the file sizes it references.
                let computed: u64 = files.iter().map(|f| f.size).sum();
                if computed != size {
                    return Err(DomainError::Integrity(format!(
                        "declared size {} does not match sum of file sizes {}",
                        size, computed
                    )));
                }
                let event = DirectoryVersionEvent::Created {
                    directory_version_id,
                    repository_id,
                    sha256_hash: sha256_hash.clone(),
                    relative_path,
                    files,
                    size,
                    directories,
                };
                let event_name = self.state.apply(ctx, event, &metadata).await?;

                let cache_days = match ctx.host.repository(repository_id).await {
                    Ok(proxy) => match proxy.read(|r| r.retention()).await {
                        Ok(retention) => retention.directory_version_cache_days,
                        Err(_) => ctx.retention_defaults.directory_version_cache_days,
                    },
                    Err(_) => ctx.retention_defaults.directory_version_cache_days,
                };
                let payload = DeletionPayload::new("cache expired", &metadata.correlation_id)
                    .with_repository(repository_id);
                ctx.reminders.register(
                    EntityKind::DirectoryVersion,
                    id,
                    CACHE_EXPIRATION_REMINDER,
                    serde_json::to_value(payload)
                        .map_err(|e| DomainError::Internal(e.to_string()))?,
                    chrono::Duration::days(cache_days as i64),
                    None,
                )?;
                Ok(CommandOutcome::new(event_name, id)
                    .with_property("directory_version_id", &directory_version_id.to_string())
                    .with_property("sha256_hash", &sha256_hash))
            }
            DirectoryVersionCommand::DeletePhysical => {
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
        if reminder.name != CACHE_EXPIRATION_REMINDER {
            log::warn!(
                "directory version {} received unknown reminder {}",
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
        false
    }

    fn dto(&self) -> DirectoryVersionDto {
        self.state.dto.clone()
    }
}
