use crate::domains::branch::actor::BranchActor;
use crate::domains::core::index::ReadModelIndex;
use crate::domains::directory_version::actor::DirectoryVersionActor;
use crate::domains::organization::actor::OrganizationActor;
use crate::domains::owner::actor::OwnerActor;
use crate::domains::reference::actor::ReferenceActor;
use crate::domains::repo_name::actor::RepositoryNameActor;
use crate::domains::repository::actor::RepositoryActor;
use crate::errors::{DomainError, DomainResult};
use crate::platform::event_bus::EventBus;
use crate::platform::reminders::{ReminderDelivery, ReminderService};
use crate::platform::state_store::StateStore;
use crate::types::{CommandOutcome, EntityKind, EventMetadata, RetentionPolicy};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Platform handles passed into every actor turn.
#[derive(Clone)]
pub struct ActorContext {
    pub host: ActorHost,
    pub store: Arc<dyn StateStore>,
    pub bus: Arc<dyn EventBus>,
    pub reminders: Arc<ReminderService>,
    pub index: Arc<ReadModelIndex>,
    pub events_topic: Arc<str>,
    /// Fallback retention for entities that sit above the repository
    /// level (owners, organizations) and for repositories created
    /// without overrides.
    pub retention_defaults: RetentionPolicy,
}

/// One event-sourced entity state machine, hosted behind a turn-based
/// dispatch cell. Implementations rebuild `dto` and `events` inside
/// `activate` by replaying the persisted event list.
#[async_trait]
pub trait EntityActor: Send + 'static {
    const KIND: EntityKind;
    type Command: Send + 'static;
    type Dto: Clone + Send + Sync + 'static;

    fn new(id: Uuid) -> Self;

    /// Whether activation has run since construction or the last
    /// poisoning.
    fn activated(&self) -> bool;

    /// Set when a turn failed with uncertain state effects; the next
    /// turn re-runs `activate` before executing.
    fn poisoned(&self) -> bool;

    async fn activate(&mut self, ctx: &ActorContext) -> DomainResult<()>;

    async fn handle(
        &mut self,
        ctx: &ActorContext,
        command: Self::Command,
        metadata: EventMetadata,
    ) -> DomainResult<CommandOutcome>;

    async fn receive_reminder(
        &mut self,
        ctx: &ActorContext,
        reminder: ReminderDelivery,
    ) -> DomainResult<()>;

    fn exists(&self) -> bool;
    fn is_deleted(&self) -> bool;
    fn dto(&self) -> Self::Dto;
}

struct ActorCell<A> {
    actor: Mutex<A>,
}

type ActorMap<A> = RwLock<HashMap<Uuid, Arc<ActorCell<A>>>>;

/// Typed invocation handle for one actor instance. Every call locks
/// the cell, giving strict one-turn-at-a-time execution in arrival
/// order, and brackets the turn with the pre/post hooks.
pub struct ActorRef<A: EntityActor> {
    id: Uuid,
    cell: Arc<ActorCell<A>>,
    ctx: ActorContext,
}

impl<A: EntityActor> ActorRef<A> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    async fn ensure_active(&self, actor: &mut A) -> DomainResult<()> {
        if !actor.activated() || actor.poisoned() {
            actor.activate(&self.ctx).await?;
        }
        Ok(())
    }

    pub async fn handle(
        &self,
        command: A::Command,
        metadata: EventMetadata,
    ) -> DomainResult<CommandOutcome> {
        let mut actor = self.cell.actor.lock().await;
        let correlation_id = metadata.correlation_id.clone();
        let started = Instant::now();
        log::debug!(
            "{}/{} turn start (correlation {})",
            A::KIND,
            self.id,
            correlation_id
        );
        self.ensure_active(&mut actor).await?;
        let result = actor.handle(&self.ctx, command, metadata).await;
        log::debug!(
            "{}/{} turn end in {:?} (correlation {}, {})",
            A::KIND,
            self.id,
            started.elapsed(),
            correlation_id,
            if result.is_ok() { "ok" } else { "error" }
        );
        result
    }

    /// Runs a read-only closure against the activated actor.
    pub async fn read<R, F>(&self, f: F) -> DomainResult<R>
    where
        F: FnOnce(&A) -> R + Send,
        R: Send,
    {
        let mut actor = self.cell.actor.lock().await;
        self.ensure_active(&mut actor).await?;
        Ok(f(&actor))
    }

    pub async fn exists(&self) -> DomainResult<bool> {
        self.read(|a| a.exists()).await
    }

    pub async fn is_deleted(&self) -> DomainResult<bool> {
        self.read(|a| a.is_deleted()).await
    }

    pub async fn get(&self) -> DomainResult<A::Dto> {
        self.read(|a| a.dto()).await
    }

    pub(crate) async fn deliver_reminder(&self, delivery: ReminderDelivery) -> DomainResult<()> {
        let mut actor = self.cell.actor.lock().await;
        self.ensure_active(&mut actor).await?;
        actor.receive_reminder(&self.ctx, delivery).await
    }
}

struct HostInner {
    ctx: OnceLock<ActorContext>,
    owners: ActorMap<OwnerActor>,
    organizations: ActorMap<OrganizationActor>,
    repositories: ActorMap<RepositoryActor>,
    branches: ActorMap<BranchActor>,
    references: ActorMap<ReferenceActor>,
    directory_versions: ActorMap<DirectoryVersionActor>,
    repository_names: ActorMap<RepositoryNameActor>,
}

/// Single-process actor host: at most one live instance per
/// (kind, id), materialized on first use.
#[derive(Clone)]
pub struct ActorHost {
    inner: Arc<HostInner>,
}

impl ActorHost {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HostInner {
                ctx: OnceLock::new(),
                owners: RwLock::new(HashMap::new()),
                organizations: RwLock::new(HashMap::new()),
                repositories: RwLock::new(HashMap::new()),
                branches: RwLock::new(HashMap::new()),
                references: RwLock::new(HashMap::new()),
                directory_versions: RwLock::new(HashMap::new()),
                repository_names: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Binds the platform context actors run against. One-shot,
    /// called during application-context construction.
    pub fn bind(&self, ctx: ActorContext) {
        let _ = self.inner.ctx.set(ctx);
    }

    fn context(&self) -> DomainResult<ActorContext> {
        self.inner
            .ctx
            .get()
            .cloned()
            .ok_or_else(|| DomainError::Internal("actor host is not bound to a context".into()))
    }

    async fn proxy<A: EntityActor>(
        &self,
        map: &ActorMap<A>,
        id: Uuid,
    ) -> DomainResult<ActorRef<A>> {
        let ctx = self.context()?;
        if let Some(cell) = map.read().await.get(&id) {
            return Ok(ActorRef {
                id,
                cell: Arc::clone(cell),
                ctx,
            });
        }
        let mut cells = map.write().await;
        let cell = cells.entry(id).or_insert_with(|| {
            Arc::new(ActorCell {
                actor: Mutex::new(A::new(id)),
            })
        });
        Ok(ActorRef {
            id,
            cell: Arc::clone(cell),
            ctx,
        })
    }

    pub async fn owner(&self, id: Uuid) -> DomainResult<ActorRef<OwnerActor>> {
        self.proxy(&self.inner.owners, id).await
    }

    pub async fn organization(&self, id: Uuid) -> DomainResult<ActorRef<OrganizationActor>> {
        self.proxy(&self.inner.organizations, id).await
    }

    pub async fn repository(&self, id: Uuid) -> DomainResult<ActorRef<RepositoryActor>> {
        self.proxy(&self.inner.repositories, id).await
    }

    pub async fn branch(&self, id: Uuid) -> DomainResult<ActorRef<BranchActor>> {
        self.proxy(&self.inner.branches, id).await
    }

    pub async fn reference(&self, id: Uuid) -> DomainResult<ActorRef<ReferenceActor>> {
        self.proxy(&self.inner.references, id).await
    }

    pub async fn directory_version(
        &self,
        id: Uuid,
    ) -> DomainResult<ActorRef<DirectoryVersionActor>> {
        self.proxy(&self.inner.directory_versions, id).await
    }

    pub async fn repository_name(&self, id: Uuid) -> DomainResult<ActorRef<RepositoryNameActor>> {
        self.proxy(&self.inner.repository_names, id).await
    }

    /// Routes a fired reminder into the owning actor under the normal
    /// turn discipline.
    pub async fn deliver_reminder(
        &self,
        kind: EntityKind,
        id: Uuid,
        delivery: ReminderDelivery,
    ) -> DomainResult<()> {
        match kind {
            EntityKind::Owner => self.owner(id).await?.deliver_reminder(delivery).await,
            EntityKind::Organization => {
                self.organization(id).await?.deliver_reminder(delivery).await
            }
            EntityKind::Repository => self.repository(id).await?.deliver_reminder(delivery).await,
            EntityKind::Branch => self.branch(id).await?.deliver_reminder(delivery).await,
            EntityKind::Reference => self.reference(id).await?.deliver_reminder(delivery).await,
            EntityKind::DirectoryVersion => {
                self.directory_version(id)
                    .await?
                    .deliver_reminder(delivery)
                    .await
            }
            EntityKind::RepositoryName => {
                self.repository_name(id)
                    .await?
                    .deliver_reminder(delivery)
                    .await
            }
        }
    }

    /// Drops the resident cell of a physically deleted actor. A later
    /// call materializes a fresh instance that activates from the
    /// (now empty) state store.
    pub async fn evict(&self, kind: EntityKind, id: Uuid) {
        match kind {
            EntityKind::Owner => {
                self.inner.owners.write().await.remove(&id);
            }
            EntityKind::Organization => {
                self.inner.organizations.write().await.remove(&id);
            }
            EntityKind::Repository => {
                self.inner.repositories.write().await.remove(&id);
            }
            EntityKind::Branch => {
                self.inner.branches.write().await.remove(&id);
            }
            EntityKind::Reference => {
                self.inner.references.write().await.remove(&id);
            }
            EntityKind::DirectoryVersion => {
                self.inner.directory_versions.write().await.remove(&id);
            }
            EntityKind::RepositoryName => {
                self.inner.repository_names.write().await.remove(&id);
            }
        }
    }
}

impl Default for ActorHost {
    fn default() -> Self {
        Self::new()
    }
}
