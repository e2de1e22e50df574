pub mod actor_host;
pub mod cache;
pub mod event_bus;
pub mod reminders;
pub mod state_store;

pub use actor_host::{ActorContext, ActorHost, ActorRef, EntityActor};
pub use cache::{CachedValue, MemoryCache};
pub use event_bus::{EventBus, EventObserver, InProcessEventBus, PublishedEvent};
pub use reminders::{ReminderDelivery, ReminderService};
pub use state_store::{SqliteStateStore, StateStore};
