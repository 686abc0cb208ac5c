pub mod action_log;
pub mod board;
pub mod fanout;
pub mod registry;
pub mod room;
pub mod state_machine;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::{config::AppConfig, dto::ws::OutboundFrame};

pub use self::registry::RoomRegistry;
pub use self::room::Room;
pub use self::state_machine::{RoomError, RoomSettings, RoundState};

pub type SharedState = Arc<AppState>;

#[derive(Debug, Clone)]
/// Handle used to push frames to a connected session.
pub struct SessionConnection {
    pub id: String,
    pub name: String,
    pub tx: mpsc::Sender<OutboundFrame>,
}

/// Central application state: configuration, the room registry and the
/// sessions currently connected.
pub struct AppState {
    config: AppConfig,
    registry: RoomRegistry,
    sessions: DashMap<String, SessionConnection>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig) -> SharedState {
        let registry = RoomRegistry::new(config.room_settings(), config.tick_interval());
        Arc::new(Self {
            config,
            registry,
            sessions: DashMap::new(),
        })
    }

    /// Runtime configuration loaded at startup.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Registry of rooms shared by every session.
    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Sessions currently connected, keyed by their identifier.
    pub fn sessions(&self) -> &DashMap<String, SessionConnection> {
        &self.sessions
    }
}
