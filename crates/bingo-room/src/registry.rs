//! Room registry: finds or creates rooms by id and lists them for the lobby.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use bingo_protocol::RoomId;
use tokio::sync::{RwLock, watch};

use crate::room::spawn_room;
use crate::{GameConfig, RoomError, RoomHandle, RoomInfo, RoomInstance};

struct RegistryInner {
    config: Arc<GameConfig>,
    rooms: RwLock<HashMap<RoomId, RoomHandle>>,
    /// Bumped whenever the lobby listing may have changed.
    changes: watch::Sender<u64>,
    next_instance: AtomicU64,
}

impl RegistryInner {
    fn notify_changed(&self) {
        self.changes.send_modify(|version| *version = version.wrapping_add(1));
    }

    async fn remove_instance(&self, room_id: &RoomId, instance: RoomInstance) -> bool {
        let mut rooms = self.rooms.write().await;
        let matches = rooms
            .get(room_id)
            .is_some_and(|handle| handle.instance() == instance);
        if matches {
            rooms.remove(room_id);
            drop(rooms);
            tracing::info!(%room_id, "room removed from registry");
            self.notify_changed();
        }
        matches
    }
}

/// The way back from a room actor to its registry.
///
/// Weak so a registry dropped by its owner does not live on through its
/// rooms.
#[derive(Clone)]
pub(crate) struct RegistryLink(Weak<RegistryInner>);

impl RegistryLink {
    pub fn notify_changed(&self) {
        if let Some(inner) = self.0.upgrade() {
            inner.notify_changed();
        }
    }

    pub async fn remove_instance(&self, room_id: &RoomId, instance: RoomInstance) {
        if let Some(inner) = self.0.upgrade() {
            inner.remove_instance(room_id, instance).await;
        }
    }
}

/// Every live room on the server, keyed by normalized id.
///
/// Rooms are created on first join and remove themselves when their last
/// member leaves. Cheap to clone; clones share the same rooms.
#[derive(Clone)]
pub struct RoomRegistry {
    inner: Arc<RegistryInner>,
}

impl RoomRegistry {
    /// Creates an empty registry whose rooms use `config`.
    ///
    /// # Errors
    /// Whatever [`GameConfig::validate`] rejects.
    pub fn new(config: GameConfig) -> Result<Self, RoomError> {
        config.validate()?;
        let (changes, _) = watch::channel(0);
        Ok(Self {
            inner: Arc::new(RegistryInner {
                config: Arc::new(config),
                rooms: RwLock::new(HashMap::new()),
                changes,
                next_instance: AtomicU64::new(1),
            }),
        })
    }

    /// The configuration every room is built from.
    pub fn config(&self) -> &GameConfig {
        &self.inner.config
    }

    /// Returns the live room for `room_id`, spawning it if there is none.
    ///
    /// `limit` only applies when the room is created here; an existing
    /// room keeps the limit its creator chose. Concurrent callers for the
    /// same id all get the same room.
    ///
    /// # Errors
    /// [`RoomError::InvalidLimit`] if a room has to be created and `limit`
    /// is out of range.
    pub async fn get_or_create(
        &self,
        room_id: RoomId,
        limit: Option<u32>,
    ) -> Result<RoomHandle, RoomError> {
        if let Some(handle) = self.get(&room_id).await {
            return Ok(handle);
        }

        let mut rooms = self.inner.rooms.write().await;
        // Someone may have created it between our read and write locks.
        if let Some(handle) = rooms.get(&room_id).filter(|h| !h.is_closed()) {
            return Ok(handle.clone());
        }

        let limit = self.inner.config.resolve_limit(limit)?;
        let instance = RoomInstance::new(self.inner.next_instance.fetch_add(1, Ordering::Relaxed));
        let handle = spawn_room(
            room_id.clone(),
            instance,
            limit,
            Arc::clone(&self.inner.config),
            RegistryLink(Arc::downgrade(&self.inner)),
        );
        rooms.insert(room_id.clone(), handle.clone());
        tracing::info!(%room_id, limit, instance = instance.into_inner(), "room created");
        Ok(handle)
    }

    /// Returns the live room for `room_id`, if any.
    pub async fn get(&self, room_id: &RoomId) -> Option<RoomHandle> {
        self.inner
            .rooms
            .read()
            .await
            .get(room_id)
            .filter(|h| !h.is_closed())
            .cloned()
    }

    /// Drops the registry's entry for `room_id`. Idempotent.
    ///
    /// The actor itself keeps running until its members leave; new joins
    /// for the id get a fresh room.
    pub async fn remove(&self, room_id: &RoomId) -> Option<RoomHandle> {
        let removed = self.inner.rooms.write().await.remove(room_id);
        if removed.is_some() {
            tracing::debug!(%room_id, "room entry removed");
            self.inner.notify_changed();
        }
        removed
    }

    /// Removes the entry for `room_id` only if it still points at
    /// `instance`. Returns whether it did.
    pub async fn remove_instance(&self, room_id: &RoomId, instance: RoomInstance) -> bool {
        self.inner.remove_instance(room_id, instance).await
    }

    /// Number of registered rooms.
    pub async fn len(&self) -> usize {
        self.inner.rooms.read().await.len()
    }

    /// `true` when no rooms are registered.
    pub async fn is_empty(&self) -> bool {
        self.inner.rooms.read().await.is_empty()
    }

    /// Ids of all registered rooms, sorted.
    pub async fn room_ids(&self) -> Vec<RoomId> {
        let mut ids: Vec<_> = self.inner.rooms.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Snapshot of every room with at least one member, sorted by id.
    ///
    /// Reads each room's published info; never waits on a room actor.
    pub async fn list_active(&self) -> Vec<RoomInfo> {
        let mut infos: Vec<RoomInfo> = self
            .inner
            .rooms
            .read()
            .await
            .values()
            .map(RoomHandle::info)
            .filter(|info| info.member_count() > 0)
            .collect();
        infos.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        infos
    }

    /// Subscribes to lobby changes. The value is a version counter; only
    /// its changes matter.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.inner.changes.subscribe()
    }
}

impl std::fmt::Debug for RoomRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomRegistry")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
