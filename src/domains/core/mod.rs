pub mod actor_state;
pub mod deletion;
pub mod events;
pub mod index;

pub use actor_state::{EntityState, EventSourcedDto, RecordedEvent};
pub use deletion::{DeletionPayload, CACHE_EXPIRATION_REMINDER, PHYSICAL_DELETION_REMINDER};
pub use events::{EventEnvelope, GraceEvent};
pub use index::{ReadModelIndex, ReferenceSummary};
