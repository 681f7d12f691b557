//! WebSocket Game Server
//!
//! Async WebSocket server for multiplayer connections. Accepts
//! connections, parses the JSON protocol, and routes every message to
//! the connection's room. One task per connection plus a writer task
//! per connection; rooms serialize their own state behind a lock.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::network::protocol::{ClientMessage, ServerMessage};
use crate::network::registry::RoomRegistry;
use crate::network::room::ConnId;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Build a configuration from the environment. `WARFRONT_BIND_ADDR`
    /// overrides the bind address; an unparseable value falls back to
    /// the default with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(addr) = std::env::var("WARFRONT_BIND_ADDR") {
            match addr.parse() {
                Ok(parsed) => config.bind_addr = parsed,
                Err(_) => warn!(%addr, "invalid WARFRONT_BIND_ADDR, using default"),
            }
        }
        config
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Connected client state.
struct ConnectedClient {
    /// Connection identity used inside rooms.
    conn: ConnId,
    /// Room this connection has joined, if any.
    room_id: Option<String>,
    /// Connection time.
    #[allow(dead_code)]
    connected_at: Instant,
}

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// All live rooms.
    registry: Arc<RoomRegistry>,
    /// Connected clients.
    clients: Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            registry: Arc::new(RoomRegistry::new()),
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            shutdown_tx,
        }
    }

    /// Run the server.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("Game server listening on {}", self.config.bind_addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let client_count = self.clients.read().await.len();
                            if client_count >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let clients = self.clients.clone();
        let registry = self.registry.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(64);
            let conn = Uuid::new_v4();

            // Register client
            {
                let mut clients = clients.write().await;
                clients.insert(
                    addr,
                    ConnectedClient {
                        conn,
                        room_id: None,
                        connected_at: Instant::now(),
                    },
                );
            }

            // Spawn message sender task
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            // Handle incoming messages
            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let client_msg = match ClientMessage::from_json(&text) {
                                    Ok(m) => m,
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", addr, e);
                                        let _ = msg_tx.send(ServerMessage::Error {
                                            reason: "invalid message format".to_string(),
                                        }).await;
                                        continue;
                                    }
                                };

                                Self::handle_client_message(
                                    addr,
                                    conn,
                                    client_msg,
                                    &clients,
                                    &registry,
                                    &msg_tx,
                                ).await;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }

            // Cleanup
            sender_task.abort();

            let room_id = {
                let mut clients = clients.write().await;
                clients.remove(&addr).and_then(|c| c.room_id)
            };
            if let Some(room_id) = room_id {
                if let Some(room) = registry.get(&room_id).await {
                    room.write().await.leave(conn).await;
                }
                registry.drop_if_empty(&room_id).await;
            }

            info!("Client {} cleaned up", addr);
        });
    }

    /// Route one client message.
    async fn handle_client_message(
        addr: SocketAddr,
        conn: ConnId,
        msg: ClientMessage,
        clients: &Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
        registry: &Arc<RoomRegistry>,
        sender: &mpsc::Sender<ServerMessage>,
    ) {
        match msg {
            ClientMessage::JoinRoom {
                room_id,
                player_name,
                board_size,
            } => {
                {
                    let clients = clients.read().await;
                    if clients.get(&addr).and_then(|c| c.room_id.as_ref()).is_some() {
                        let _ = sender
                            .send(ServerMessage::Error {
                                reason: "already in a room".to_string(),
                            })
                            .await;
                        return;
                    }
                }
                if room_id.is_empty() || player_name.is_empty() {
                    let _ = sender
                        .send(ServerMessage::Error {
                            reason: "room and player name must not be empty".to_string(),
                        })
                        .await;
                    return;
                }

                let room = match registry.resolve_or_create(&room_id, board_size).await {
                    Ok(room) => room,
                    Err(e) => {
                        let _ = sender
                            .send(ServerMessage::Error {
                                reason: e.to_string(),
                            })
                            .await;
                        return;
                    }
                };

                room.write()
                    .await
                    .join(conn, player_name, sender.clone())
                    .await;

                let mut clients = clients.write().await;
                if let Some(client) = clients.get_mut(&addr) {
                    client.room_id = Some(room_id);
                }
            }

            ClientMessage::SelectNation { nation } => {
                let Some(room) = Self::room_of(addr, clients, registry, sender).await else {
                    return;
                };
                room.write().await.select_nation(conn, nation, sender).await;
            }

            ClientMessage::GameAction { action } => {
                let Some(room) = Self::room_of(addr, clients, registry, sender).await else {
                    return;
                };
                let result = room.write().await.apply_action(conn, action).await;
                if let Err(fault) = result {
                    error!(%addr, %fault, "room torn down");
                    let room_id = room.read().await.id.clone();
                    room.read()
                        .await
                        .broadcast(ServerMessage::Error {
                            reason: "the room was closed after an internal error".to_string(),
                        })
                        .await;
                    registry.remove(&room_id).await;
                    // Survivors may join a fresh room afterwards.
                    Self::detach_room(clients, &room_id).await;
                }
            }
        }
    }

    /// Forget a room membership for every connection that had it. Used
    /// when a room is torn down underneath its participants.
    async fn detach_room(
        clients: &Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
        room_id: &str,
    ) {
        let mut clients = clients.write().await;
        for client in clients.values_mut() {
            if client.room_id.as_deref() == Some(room_id) {
                client.room_id = None;
            }
        }
    }

    /// Resolve the room a connection has joined, answering an error to
    /// the connection when it has none.
    async fn room_of(
        addr: SocketAddr,
        clients: &Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
        registry: &Arc<RoomRegistry>,
        sender: &mpsc::Sender<ServerMessage>,
    ) -> Option<Arc<RwLock<crate::network::room::Room>>> {
        let room_id = {
            let clients = clients.read().await;
            clients.get(&addr).and_then(|c| c.room_id.clone())
        };
        let room = match room_id {
            Some(room_id) => registry.get(&room_id).await,
            None => None,
        };
        if room.is_none() {
            let _ = sender
                .send(ServerMessage::Error {
                    reason: "join a room first".to_string(),
                })
                .await;
        }
        room
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Get live room count.
    pub async fn room_count(&self) -> usize {
        self.registry.room_count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.max_connections, 1000);
    }

    #[tokio::test]
    async fn test_server_creation() {
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..Default::default()
        };
        let server = GameServer::new(config);

        assert_eq!(server.connection_count().await, 0);
        assert_eq!(server.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_detach_room_clears_membership() {
        let clients: Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>> =
            Arc::new(RwLock::new(BTreeMap::new()));
        let survivor: SocketAddr = "127.0.0.1:4001".parse().unwrap();
        let bystander: SocketAddr = "127.0.0.1:4002".parse().unwrap();
        {
            let mut clients = clients.write().await;
            clients.insert(
                survivor,
                ConnectedClient {
                    conn: Uuid::new_v4(),
                    room_id: Some("doomed".to_string()),
                    connected_at: Instant::now(),
                },
            );
            clients.insert(
                bystander,
                ConnectedClient {
                    conn: Uuid::new_v4(),
                    room_id: Some("other".to_string()),
                    connected_at: Instant::now(),
                },
            );
        }

        GameServer::detach_room(&clients, "doomed").await;

        // The survivor can join again; other rooms are untouched.
        let clients = clients.read().await;
        assert!(clients[&survivor].room_id.is_none());
        assert_eq!(clients[&bystander].room_id.as_deref(), Some("other"));
    }

    #[tokio::test]
    async fn test_server_shutdown() {
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..Default::default()
        };
        let server = GameServer::new(config);
        server.shutdown();
        // Should not panic
    }
}
