//! Connection and room registry for the realtime gateway.
//!
//! Each user has one room, `user-{id}`. A connection may join several rooms
//! and several connections may share a room (one user, many tabs).
//!
//! ```text
//! Room: user-alice     Room: user-bob
//! ├── client-a         ├── client-c
//! └── client-b         └── client-a
//! ```
//!
//! Every connection owns an unbounded outbound queue, so pushing to a room
//! never waits on a slow socket.

use std::collections::{HashMap, HashSet};

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::domain::foundation::UserId;

use super::messages::ServerMessage;

/// Unique identifier for a WebSocket client connection.
///
/// Generated server-side when a client connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Default)]
struct Registry {
    /// Outbound queue of every live connection.
    connections: HashMap<ClientId, mpsc::UnboundedSender<ServerMessage>>,
    /// Room owner → member connections.
    rooms: HashMap<UserId, HashSet<ClientId>>,
    /// Connection → rooms joined, for cleanup on disconnect.
    memberships: HashMap<ClientId, HashSet<UserId>>,
}

/// Tracks live connections and their room memberships.
///
/// All three maps sit behind one `RwLock`, so a disconnect removes a client
/// from every room atomically with respect to concurrent pushes.
#[derive(Default)]
pub struct RoomManager {
    registry: RwLock<Registry>,
}

impl RoomManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection. Returns its id and outbound queue.
    pub async fn connect(&self) -> (ClientId, mpsc::UnboundedReceiver<ServerMessage>) {
        let client_id = ClientId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        self.registry.write().await.connections.insert(client_id, tx);
        (client_id, rx)
    }

    /// Add a connection to a user's room.
    ///
    /// Returns `true` if the connection was newly added, `false` if it was
    /// already a member or is not connected.
    pub async fn join(&self, client_id: &ClientId, user_id: &UserId) -> bool {
        let mut registry = self.registry.write().await;
        if !registry.connections.contains_key(client_id) {
            return false;
        }

        let added = registry
            .rooms
            .entry(user_id.clone())
            .or_default()
            .insert(*client_id);
        registry
            .memberships
            .entry(*client_id)
            .or_default()
            .insert(user_id.clone());
        added
    }

    /// Remove a connection from every room and drop its queue.
    ///
    /// Rooms left empty are removed.
    pub async fn disconnect(&self, client_id: &ClientId) {
        let mut registry = self.registry.write().await;
        registry.connections.remove(client_id);

        let Some(joined) = registry.memberships.remove(client_id) else {
            return;
        };
        for user_id in joined {
            if let Some(members) = registry.rooms.get_mut(&user_id) {
                members.remove(client_id);
                if members.is_empty() {
                    registry.rooms.remove(&user_id);
                }
            }
        }
    }

    /// Push a message to every connection in a user's room.
    ///
    /// Returns how many connections it was queued for. Zero means the room
    /// has no members.
    pub async fn send_to_room(&self, user_id: &UserId, message: &ServerMessage) -> usize {
        let registry = self.registry.read().await;

        let Some(members) = registry.rooms.get(user_id) else {
            return 0;
        };
        members
            .iter()
            .filter_map(|client_id| registry.connections.get(client_id))
            .filter(|tx| tx.send(message.clone()).is_ok())
            .count()
    }

    /// Push a message to a single connection.
    pub async fn send_to(&self, client_id: &ClientId, message: ServerMessage) -> bool {
        let registry = self.registry.read().await;
        registry
            .connections
            .get(client_id)
            .map(|tx| tx.send(message).is_ok())
            .unwrap_or(false)
    }

    /// Number of connections in a user's room.
    pub async fn client_count(&self, user_id: &UserId) -> usize {
        self.registry
            .read()
            .await
            .rooms
            .get(user_id)
            .map(HashSet::len)
            .unwrap_or(0)
    }

    /// Names of all rooms with at least one member.
    pub async fn active_rooms(&self) -> Vec<String> {
        let mut rooms: Vec<String> = self
            .registry
            .read()
            .await
            .rooms
            .keys()
            .map(UserId::room_name)
            .collect();
        rooms.sort();
        rooms
    }

    /// Total live connections, joined or not.
    pub async fn total_client_count(&self) -> usize {
        self.registry.read().await.connections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[tokio::test]
    async fn join_creates_room_if_not_exists() {
        let manager = RoomManager::new();
        let (client_id, _rx) = manager.connect().await;

        assert!(manager.join(&client_id, &user("bob")).await);

        assert_eq!(manager.active_rooms().await, vec!["user-bob".to_string()]);
    }

    #[tokio::test]
    async fn join_is_idempotent() {
        let manager = RoomManager::new();
        let (client_id, _rx) = manager.connect().await;

        assert!(manager.join(&client_id, &user("bob")).await);
        assert!(!manager.join(&client_id, &user("bob")).await);

        assert_eq!(manager.client_count(&user("bob")).await, 1);
    }

    #[tokio::test]
    async fn unknown_client_cannot_join() {
        let manager = RoomManager::new();

        assert!(!manager.join(&ClientId::new(), &user("bob")).await);
        assert!(manager.active_rooms().await.is_empty());
    }

    #[tokio::test]
    async fn every_member_of_room_receives_message_once() {
        let manager = RoomManager::new();
        let (c1, mut rx1) = manager.connect().await;
        let (c2, mut rx2) = manager.connect().await;
        manager.join(&c1, &user("bob")).await;
        manager.join(&c2, &user("bob")).await;

        let sent = manager.send_to_room(&user("bob"), &ServerMessage::pong()).await;

        assert_eq!(sent, 2);
        assert!(matches!(rx1.recv().await, Some(ServerMessage::Pong(_))));
        assert!(matches!(rx2.recv().await, Some(ServerMessage::Pong(_))));
        assert!(rx1.try_recv().is_err());
    }

    #[tokio::test]
    async fn rooms_are_isolated() {
        let manager = RoomManager::new();
        let (c1, _rx1) = manager.connect().await;
        let (c2, mut rx2) = manager.connect().await;
        manager.join(&c1, &user("alice")).await;
        manager.join(&c2, &user("bob")).await;

        manager.send_to_room(&user("alice"), &ServerMessage::pong()).await;

        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn send_to_empty_room_reaches_nobody() {
        let manager = RoomManager::new();

        assert_eq!(manager.send_to_room(&user("ghost"), &ServerMessage::pong()).await, 0);
    }

    #[tokio::test]
    async fn disconnect_leaves_all_rooms_and_cleans_up() {
        let manager = RoomManager::new();
        let (c1, _rx1) = manager.connect().await;
        let (c2, _rx2) = manager.connect().await;
        manager.join(&c1, &user("alice")).await;
        manager.join(&c1, &user("bob")).await;
        manager.join(&c2, &user("bob")).await;

        manager.disconnect(&c1).await;

        assert_eq!(manager.active_rooms().await, vec!["user-bob".to_string()]);
        assert_eq!(manager.client_count(&user("bob")).await, 1);
        assert_eq!(manager.total_client_count().await, 1);
    }

    #[tokio::test]
    async fn send_to_reaches_single_connection() {
        let manager = RoomManager::new();
        let (c1, mut rx1) = manager.connect().await;

        assert!(manager.send_to(&c1, ServerMessage::joined("user-a")).await);
        assert!(matches!(rx1.recv().await, Some(ServerMessage::Joined(_))));

        manager.disconnect(&c1).await;
        assert!(!manager.send_to(&c1, ServerMessage::pong()).await);
    }

    #[test]
    fn client_id_display_is_uuid() {
        assert_eq!(ClientId::new().to_string().len(), 36);
    }
}
