use std::{
    sync::{Arc, OnceLock, Weak},
    time::{Duration, Instant, SystemTime},
};

use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::{
    SessionConnection,
    action_log::Action,
    registry::RoomRegistry,
    state_machine::{
        RoomError, RoomSettings, RoomSnapshot, RoomStateMachine, RoundState, TickReport,
    },
};

/// Shared handle to a room. Cloning is cheap and every clone refers to the
/// same instance.
#[derive(Clone)]
pub struct Room {
    inner: Arc<RoomInner>,
}

struct RoomInner {
    id: Uuid,
    name: String,
    created_at: SystemTime,
    machine: Mutex<RoomStateMachine>,
    ticker: OnceLock<TickerGuard>,
}

/// Aborts the tick driver when the room itself goes away.
struct TickerGuard(JoinHandle<()>);

impl Drop for TickerGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl Room {
    /// Create a room without a tick driver; see [`Room::spawn_ticker`].
    pub fn new(name: impl Into<String>, settings: RoomSettings) -> Self {
        let name = name.into();
        Self {
            inner: Arc::new(RoomInner {
                id: Uuid::new_v4(),
                machine: Mutex::new(RoomStateMachine::new(name.clone(), settings)),
                name,
                created_at: SystemTime::now(),
                ticker: OnceLock::new(),
            }),
        }
    }

    /// Start the periodic tick driver for this room.
    ///
    /// The driver only holds a weak reference: once every handle to the room
    /// is gone the driver stops on its own, and the guard stored in the room
    /// aborts it immediately. When the round reaches [`RoundState::Over`] the
    /// driver disposes of the room from `registry` and exits. Calling this a
    /// second time has no effect.
    pub fn spawn_ticker(&self, period: Duration, registry: RoomRegistry) {
        if self.inner.ticker.get().is_some() {
            return;
        }
        let handle = tokio::spawn(run_ticker(Arc::downgrade(&self.inner), registry, period));
        if self.inner.ticker.set(TickerGuard(handle)).is_err() {
            warn!(room = %self.inner.name, "tick driver already running");
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn created_at(&self) -> SystemTime {
        self.inner.created_at
    }

    /// Whether both handles point at the same room instance.
    pub fn same_as(&self, other: &Room) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub async fn join(&self, connection: SessionConnection) -> Result<(), RoomError> {
        self.inner.machine.lock().await.join(connection)
    }

    /// Whether `player_id` still holds a seat in a round that has not ended.
    ///
    /// Turns false once the player leaves, is dropped by the fan-out, or the
    /// round is over.
    pub async fn is_seated(&self, player_id: &str) -> bool {
        let machine = self.inner.machine.lock().await;
        machine.state() != RoundState::Over && machine.is_member(player_id)
    }

    pub async fn leave(&self, player_id: &str) -> bool {
        self.inner.machine.lock().await.leave(player_id)
    }

    pub async fn mark_ready(&self, player_id: &str) -> bool {
        self.inner.machine.lock().await.mark_ready(player_id)
    }

    pub async fn record_action(&self, action: Action) -> bool {
        self.inner.machine.lock().await.record_action(action)
    }

    pub async fn state(&self) -> RoundState {
        self.inner.machine.lock().await.state()
    }

    pub async fn snapshot(&self) -> RoomSnapshot {
        self.inner.machine.lock().await.snapshot(Instant::now())
    }

    /// Run one tick, including its full fan-out, under the room lock.
    pub async fn tick(&self) -> TickReport {
        let mut machine = self.inner.machine.lock().await;
        let mut rng = rand::rng();
        let report = machine.tick(Instant::now(), &mut rng);
        if report.from != report.to {
            info!(
                room = %self.inner.name,
                from = ?report.from,
                to = ?report.to,
                "room state changed"
            );
        }
        report
    }
}

async fn run_ticker(room: Weak<RoomInner>, registry: RoomRegistry, period: Duration) {
    let mut ticks = interval(period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of a tokio interval completes immediately.
    ticks.tick().await;

    loop {
        ticks.tick().await;
        let Some(inner) = room.upgrade() else {
            debug!("room dropped; tick driver stopping");
            return;
        };
        let room = Room { inner };

        if room.tick().await.to == RoundState::Over {
            registry.dispose(&room).await;
            info!(room = %room.name(), "tick driver stopped; game over");
            return;
        }
    }
}
