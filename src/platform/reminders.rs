use crate::errors::{DomainError, DomainResult};
use crate::platform::actor_host::ActorHost;
use crate::types::EntityKind;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// A reminder being delivered back into its owning actor.
#[derive(Debug, Clone)]
pub struct ReminderDelivery {
    pub name: String,
    pub payload: serde_json::Value,
    pub due_time: DateTime<Utc>,
    pub period: Option<chrono::Duration>,
}

type ReminderKey = (EntityKind, Uuid, String);

struct ReminderTask {
    /// Distinguishes this registration from a later one under the
    /// same key, so a completed task only removes its own entry.
    generation: u64,
    handle: JoinHandle<()>,
}

/// Named, per-actor reminders that re-enter the owning actor after a
/// delay, under the same turn discipline as regular calls. A `None`
/// period means one-shot. Registering a name that already exists
/// replaces the pending reminder.
pub struct ReminderService {
    host: OnceLock<ActorHost>,
    generations: AtomicU64,
    tasks: Mutex<HashMap<ReminderKey, ReminderTask>>,
}

impl ReminderService {
    pub fn new() -> Self {
        Self {
            host: OnceLock::new(),
            generations: AtomicU64::new(0),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Binds the actor host reminders are delivered through. One-shot,
    /// called during context construction.
    pub fn bind(&self, host: ActorHost) {
        let _ = self.host.set(host);
    }

    pub fn register(
        self: &Arc<Self>,
        kind: EntityKind,
        actor_id: Uuid,
        name: &str,
        payload: serde_json::Value,
        due_in: chrono::Duration,
        period: Option<chrono::Duration>,
    ) -> DomainResult<()> {
        let host = self
            .host
            .get()
            .cloned()
            .ok_or_else(|| DomainError::Internal("reminder service has no actor host".into()))?;
        let key: ReminderKey = (kind, actor_id, name.to_string());
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let due_time = Utc::now() + due_in;
        let reminder_name = name.to_string();
        let service = Arc::clone(self);
        let task_key = key.clone();

        // Held across spawn + insert: an immediately-due task calling
        // finished() must observe its own entry.
        let mut tasks = self
            .tasks
            .lock()
            .map_err(|_| DomainError::Internal("reminder table lock poisoned".into()))?;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(due_in.to_std().unwrap_or_default()).await;
            loop {
                let delivery = ReminderDelivery {
                    name: reminder_name.clone(),
                    payload: payload.clone(),
                    due_time,
                    period,
                };
                log::debug!(
                    "delivering reminder {} to {}/{}",
                    reminder_name,
                    kind,
                    actor_id
                );
                if let Err(e) = host.deliver_reminder(kind, actor_id, delivery).await {
                    // Reminder-delivered failures are logged and
                    // swallowed; the reminder is not rescheduled.
                    log::error!(
                        "reminder {} for {}/{} failed: {}",
                        reminder_name,
                        kind,
                        actor_id,
                        e
                    );
                }
                match period.and_then(|p| p.to_std().ok()) {
                    Some(interval) if !interval.is_zero() => tokio::time::sleep(interval).await,
                    _ => break,
                }
            }
            service.finished(&task_key, generation);
        });

        if let Some(previous) = tasks.insert(key, ReminderTask { generation, handle }) {
            previous.handle.abort();
        }
        Ok(())
    }

    /// Cancels a pending reminder. Returns true when one was pending.
    pub fn unregister(&self, kind: EntityKind, actor_id: Uuid, name: &str) -> bool {
        let key: ReminderKey = (kind, actor_id, name.to_string());
        let removed = self.tasks.lock().ok().and_then(|mut tasks| tasks.remove(&key));
        match removed {
            Some(task) => {
                task.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Drops the table entry of a completed task, unconditionally for
    /// its own generation. A replacement registered under the same key
    /// carries a newer generation and is left in place.
    fn finished(&self, key: &ReminderKey, generation: u64) {
        if let Ok(mut tasks) = self.tasks.lock() {
            if tasks.get(key).map(|t| t.generation) == Some(generation) {
                tasks.remove(key);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn pending_count(&self) -> usize {
        self.tasks.lock().map(|tasks| tasks.len()).unwrap_or(0)
    }
}

impl Default for ReminderService {
    fn default() -> Self {
        Self::new()
    }
}
