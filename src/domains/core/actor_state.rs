use crate::domains::core::events::{EventEnvelope, GraceEvent};
use crate::errors::{DomainError, DomainResult, StoreError, ValidationError};
use crate::platform::actor_host::ActorContext;
use crate::types::{EntityKind, EventMetadata};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ties an entity's read-model type to its event union and pure fold.
pub trait EventSourcedDto: Default + Clone + Send + Sync + 'static {
    type Event: Clone + Serialize + DeserializeOwned + Send + Sync + 'static;

    const KIND: EntityKind;

    /// Pure fold: the read-model after a sequence of events is
    /// exactly `events.fold(Default, update_dto)`.
    fn update_dto(dto: Self, event: &RecordedEvent<Self::Event>) -> Self;

    /// Stable name of the event variant, surfaced in command replies.
    fn event_name(event: &Self::Event) -> &'static str;

    /// Wraps the event into the tagged wire union.
    fn wrap(event: Self::Event) -> GraceEvent;
}

/// One applied event together with the metadata of the command that
/// produced it. `transient` marks in-memory-only events (the branch
/// pointer updates); they are skipped when the list is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedEvent<E> {
    pub event: E,
    pub metadata: EventMetadata,
    #[serde(skip)]
    pub transient: bool,
}

/// The shared state machine skeleton embedded in every entity actor:
/// the current dto, the ordered event list, and the activation /
/// poisoning flags the host consults.
pub struct EntityState<D: EventSourcedDto> {
    pub id: Uuid,
    pub dto: D,
    pub events: Vec<RecordedEvent<D::Event>>,
    pub activated: bool,
    pub poisoned: bool,
}

const EVENTS_KEY: &str = "events";

impl<D: EventSourcedDto> EntityState<D> {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            dto: D::default(),
            events: Vec::new(),
            activated: false,
            poisoned: false,
        }
    }

    pub fn actor_id(&self) -> String {
        format!("{}/{}", D::KIND, self.id)
    }

    fn entity_type(&self) -> &'static str {
        D::KIND.as_str()
    }

    /// Rebuilds dto and events from the store by replaying the
    /// persisted list through the pure fold. Clears poisoning.
    pub async fn load(&mut self, ctx: &ActorContext) -> DomainResult<()> {
        let bytes = ctx.store.retrieve(&self.actor_id(), EVENTS_KEY).await?;
        let events: Vec<RecordedEvent<D::Event>> = match bytes {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| DomainError::Store(StoreError::Serialization(e.to_string())))?,
            None => Vec::new(),
        };
        self.dto = events
            .iter()
            .fold(D::default(), |dto, event| D::update_dto(dto, event));
        self.events = events;
        self.activated = true;
        self.poisoned = false;
        Ok(())
    }

    pub fn exists(&self) -> bool {
        !self.events.is_empty()
    }

    /// Idempotency guard: a correlation id may not be reused to apply
    /// a second command against the same entity. A missing id is a
    /// validation failure.
    pub fn guard_correlation(&self, metadata: &EventMetadata) -> DomainResult<()> {
        if metadata.correlation_id.trim().is_empty() {
            return Err(DomainError::Validation(ValidationError::required(
                "correlation_id",
            )));
        }
        if self
            .events
            .iter()
            .any(|recorded| recorded.metadata.correlation_id == metadata.correlation_id)
        {
            return Err(DomainError::DuplicateCorrelationId(
                metadata.correlation_id.clone(),
            ));
        }
        Ok(())
    }

    pub fn guard_exists(&self) -> DomainResult<()> {
        if self.exists() {
            Ok(())
        } else {
            Err(DomainError::not_found(self.entity_type(), self.id))
        }
    }

    pub fn guard_not_exists(&self) -> DomainResult<()> {
        if self.exists() {
            Err(DomainError::already_exists(self.entity_type(), self.id))
        } else {
            Ok(())
        }
    }

    pub fn guard_not_deleted(&self, deleted_at: Option<chrono::DateTime<chrono::Utc>>) -> DomainResult<()> {
        if deleted_at.is_some() {
            Err(DomainError::deleted(self.entity_type(), self.id))
        } else {
            Ok(())
        }
    }

    async fn persist(&self, ctx: &ActorContext) -> DomainResult<()> {
        let durable: Vec<&RecordedEvent<D::Event>> =
            self.events.iter().filter(|e| !e.transient).collect();
        let bytes = serde_json::to_vec(&durable)
            .map_err(|e| DomainError::Store(StoreError::Serialization(e.to_string())))?;
        ctx.store.save(&self.actor_id(), EVENTS_KEY, &bytes).await?;
        Ok(())
    }

    /// Applies an event: fold into the dto, append to the list, then
    /// persist the list and publish the envelope. A persistence or
    /// publication failure poisons the actor so the next turn rebuilds
    /// from durable state instead of trusting the in-memory copy.
    pub async fn apply(
        &mut self,
        ctx: &ActorContext,
        event: D::Event,
        metadata: &EventMetadata,
    ) -> DomainResult<&'static str> {
        let event_name = D::event_name(&event);
        let recorded = RecordedEvent {
            event: event.clone(),
            metadata: metadata.clone(),
            transient: false,
        };
        self.dto = D::update_dto(self.dto.clone(), &recorded);
        self.events.push(recorded);

        if let Err(e) = self.persist(ctx).await {
            self.poisoned = true;
            return Err(DomainError::DependencyFailure(format!(
                "failed to persist {} for {}: {}",
                event_name,
                self.actor_id(),
                e
            )));
        }
        let envelope = EventEnvelope::new(D::wrap(event), self.id, metadata.clone());
        if let Err(e) = ctx.bus.publish(&ctx.events_topic, envelope).await {
            self.poisoned = true;
            return Err(DomainError::DependencyFailure(format!(
                "failed to publish {} for {}: {}",
                event_name,
                self.actor_id(),
                e
            )));
        }
        Ok(event_name)
    }

    /// Applies an in-memory-only event: folded into the dto and
    /// appended, but neither persisted nor republished. Used for the
    /// branch pointer updates whose authoritative event was already
    /// published by the reference actor.
    pub fn apply_transient(
        &mut self,
        event: D::Event,
        metadata: &EventMetadata,
    ) -> &'static str {
        let event_name = D::event_name(&event);
        let recorded = RecordedEvent {
            event,
            metadata: metadata.clone(),
            transient: true,
        };
        self.dto = D::update_dto(self.dto.clone(), &recorded);
        self.events.push(recorded);
        event_name
    }

    /// Physical deletion: removes the persisted event list, publishes
    /// the final event, resets in-memory state to defaults, and marks
    /// the actor disposed so the next turn reactivates from the (now
    /// empty) store.
    pub async fn physically_delete(
        &mut self,
        ctx: &ActorContext,
        event: D::Event,
        metadata: &EventMetadata,
    ) -> DomainResult<&'static str> {
        let event_name = D::event_name(&event);
        if let Err(e) = ctx.store.delete(&self.actor_id(), EVENTS_KEY).await {
            self.poisoned = true;
            return Err(DomainError::DependencyFailure(format!(
                "failed to delete state of {}: {}",
                self.actor_id(),
                e
            )));
        }
        let envelope = EventEnvelope::new(D::wrap(event), self.id, metadata.clone());
        if let Err(e) = ctx.bus.publish(&ctx.events_topic, envelope).await {
            // State is already gone; the lost publish is accepted, as
            // with any crash between persist and publish.
            log::warn!(
                "publish of {} for {} failed after state deletion: {}",
                event_name,
                self.actor_id(),
                e
            );
        }
        self.dto = D::default();
        self.events.clear();
        self.poisoned = true;
        log::info!("physically deleted {}", self.actor_id());
        Ok(event_name)
    }
}
