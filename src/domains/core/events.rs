use crate::domains::branch::types::BranchEvent;
use crate::domains::directory_version::types::DirectoryVersionEvent;
use crate::domains::organization::types::OrganizationEvent;
use crate::domains::owner::types::OwnerEvent;
use crate::domains::reference::types::ReferenceEvent;
use crate::domains::repository::types::RepositoryEvent;
use crate::types::EventMetadata;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Discriminated union of every domain event, keyed by a stable tag
/// string on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "tag", content = "event")]
pub enum GraceEvent {
    OwnerEvent(OwnerEvent),
    OrganizationEvent(OrganizationEvent),
    RepositoryEvent(RepositoryEvent),
    BranchEvent(BranchEvent),
    ReferenceEvent(ReferenceEvent),
    DirectoryVersionEvent(DirectoryVersionEvent),
}

impl GraceEvent {
    pub fn tag(&self) -> &'static str {
        match self {
            GraceEvent::OwnerEvent(_) => "OwnerEvent",
            GraceEvent::OrganizationEvent(_) => "OrganizationEvent",
            GraceEvent::RepositoryEvent(_) => "RepositoryEvent",
            GraceEvent::BranchEvent(_) => "BranchEvent",
            GraceEvent::ReferenceEvent(_) => "ReferenceEvent",
            GraceEvent::DirectoryVersionEvent(_) => "DirectoryVersionEvent",
        }
    }
}

/// The wire envelope published for every applied event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(flatten)]
    pub event: GraceEvent,
    pub entity_id: Uuid,
    pub metadata: EventMetadata,
}

impl EventEnvelope {
    pub fn new(event: GraceEvent, entity_id: Uuid, metadata: EventMetadata) -> Self {
        Self {
            event,
            entity_id,
            metadata,
        }
    }
}
