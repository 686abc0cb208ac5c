use std::{sync::Arc, time::Duration};

use indexmap::IndexMap;
use tokio::sync::RwLock;
use tracing::info;

use crate::state::{
    SessionConnection,
    room::Room,
    state_machine::{RoomError, RoomSettings},
};

/// Registry of live rooms keyed by name.
///
/// Every create-or-join runs under the registry's write lock, so concurrent
/// requests for the same new name always end up in a single room. Rooms are
/// kept in creation order, which also gives listings a stable order.
#[derive(Clone)]
pub struct RoomRegistry {
    rooms: Arc<RwLock<IndexMap<String, Room>>>,
    settings: RoomSettings,
    tick_interval: Duration,
}

impl RoomRegistry {
    /// Build an empty registry. New rooms get `settings` and tick every `tick_interval`.
    pub fn new(settings: RoomSettings, tick_interval: Duration) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(IndexMap::new())),
            settings,
            tick_interval,
        }
    }

    /// Join the room called `name`, creating it (with its tick driver) when
    /// no live room has that name.
    ///
    /// A room whose round is already over is replaced by a fresh one.
    pub async fn join_or_create(
        &self,
        name: &str,
        connection: SessionConnection,
    ) -> Result<Room, RoomError> {
        let mut rooms = self.rooms.write().await;

        if let Some(room) = rooms.get(name) {
            match room.join(connection.clone()).await {
                Ok(()) => return Ok(room.clone()),
                Err(RoomError::Finished(_)) => {
                    rooms.shift_remove(name);
                }
                Err(err) => return Err(err),
            }
        }

        let room = Room::new(name, self.settings.clone());
        room.join(connection).await?;
        room.spawn_ticker(self.tick_interval, self.clone());
        rooms.insert(name.to_string(), room.clone());
        info!(room = %name, id = %room.id(), "new game room created");
        Ok(room)
    }

    /// Remove `room` from the registry if its name still maps to that instance.
    pub async fn dispose(&self, room: &Room) -> bool {
        let mut rooms = self.rooms.write().await;
        let same = rooms
            .get(room.name())
            .is_some_and(|current| current.same_as(room));
        if same {
            rooms.shift_remove(room.name());
            info!(room = %room.name(), "game room disposed");
        }
        same
    }

    pub async fn get(&self, name: &str) -> Option<Room> {
        self.rooms.read().await.get(name).cloned()
    }

    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rooms.read().await.is_empty()
    }

    /// Return the rooms on zero-based `page` of size `limit`.
    ///
    /// Pages past the end yield an empty list.
    pub async fn list(&self, page: usize, limit: usize) -> Vec<Room> {
        let rooms = self.rooms.read().await;
        let start = page.saturating_mul(limit).min(rooms.len());
        let end = start.saturating_add(limit).min(rooms.len());
        rooms
            .values()
            .skip(start)
            .take(end - start)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::dto::ws::OutboundFrame;

    fn connection(id: &str) -> (SessionConnection, mpsc::Receiver<OutboundFrame>) {
        let (tx, rx) = mpsc::channel(16);
        (
            SessionConnection {
                id: id.into(),
                name: id.into(),
                tx,
            },
            rx,
        )
    }

    fn registry() -> RoomRegistry {
        RoomRegistry::new(RoomSettings::default(), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn concurrent_joins_create_exactly_one_room() {
        let registry = registry();
        let (a, _a_rx) = connection("a");
        let (b, _b_rx) = connection("b");

        let (first, second) = tokio::join!(
            registry.join_or_create("arena", a),
            registry.join_or_create("arena", b)
        );
        let (first, second) = (first.unwrap(), second.unwrap());

        assert!(first.same_as(&second));
        assert_eq!(registry.len().await, 1);
        let mut players = first.snapshot().await.players;
        players.sort();
        assert_eq!(players, ["a", "b"]);
    }

    #[tokio::test]
    async fn many_concurrent_joins_respect_capacity() {
        let registry = registry();
        let mut receivers = Vec::new();
        let mut tasks = Vec::new();
        for i in 0..8 {
            let (conn, rx) = connection(&format!("p{i}"));
            receivers.push(rx);
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                registry.join_or_create("arena", conn).await
            }));
        }

        let mut joined = 0;
        let mut full = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => joined += 1,
                Err(RoomError::RoomFull { .. }) => full += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(joined, 2);
        assert_eq!(full, 6);
        assert_eq!(registry.len().await, 1);
        let room = registry.get("arena").await.unwrap();
        assert_eq!(room.snapshot().await.players.len(), 2);
    }

    #[tokio::test]
    async fn list_pages_are_stable_and_clamped() {
        let registry = registry();
        let mut receivers = Vec::new();
        for name in ["one", "two", "three"] {
            let (conn, rx) = connection(name);
            receivers.push(rx);
            registry.join_or_create(name, conn).await.unwrap();
        }

        let names = |rooms: Vec<Room>| -> Vec<String> {
            rooms.iter().map(|room| room.name().to_string()).collect()
        };
        assert_eq!(names(registry.list(0, 2).await), ["one", "two"]);
        assert_eq!(names(registry.list(1, 2).await), ["three"]);
        assert!(registry.list(5, 2).await.is_empty());
        assert!(registry.list(usize::MAX, usize::MAX).await.is_empty());
    }

    #[tokio::test]
    async fn dispose_only_removes_the_same_instance() {
        let registry = registry();
        let (a, _rx) = connection("a");
        let room = registry.join_or_create("arena", a).await.unwrap();
        let impostor = Room::new("arena", RoomSettings::default());

        assert!(!registry.dispose(&impostor).await);
        assert_eq!(registry.len().await, 1);
        assert!(registry.dispose(&room).await);
        assert!(registry.is_empty().await);
    }
}
