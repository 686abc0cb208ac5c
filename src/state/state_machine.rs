use std::time::{Duration, Instant};

use indexmap::IndexSet;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    dto::ws::{GAME_OVER_NOTICE, GAME_STARTED_NOTICE, OutboundFrame},
    state::{
        SessionConnection,
        action_log::{Action, ActionLog},
        board::GameBoard,
        fanout::{self, Member},
    },
};

/// Phases a room goes through during its single round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundState {
    /// Accepting joins until the minimum player count is reached.
    WaitingForPlayers,
    /// Enough players are seated; waiting for each of them to signal ready.
    WaitingForReady,
    /// Round in progress; inputs are buffered and applied on every tick.
    Running,
    /// Round finished. Terminal.
    Over,
}

/// Capacity and timing parameters applied to every new room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSettings {
    pub min_players: usize,
    pub max_players: usize,
    pub round_duration: Duration,
    pub starting_health: u32,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            min_players: 2,
            max_players: 2,
            round_duration: Duration::from_secs(60),
            starting_health: 3,
        }
    }
}

/// Errors returned when a session tries to take a seat in a room.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    /// The room already seats its maximum number of players.
    #[error("room `{room}` is full ({max_players} players max)")]
    RoomFull { room: String, max_players: usize },
    /// The session is still seated in a room whose round is not over.
    #[error("already playing in room `{0}`")]
    AlreadyInRoom(String),
    /// The round in this room has ended; the name can be reused by a new room.
    #[error("round in room `{0}` is over")]
    Finished(String),
}

/// Result of a single tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// State before the tick.
    pub from: RoundState,
    /// State after the tick.
    pub to: RoundState,
    /// Members removed because their outbound queue could not take a frame.
    pub dropped: Vec<String>,
}

/// Read-only view of a room, detached from its lock.
#[derive(Debug, Clone)]
pub struct RoomSnapshot {
    pub name: String,
    pub state: RoundState,
    pub min_players: usize,
    pub max_players: usize,
    pub players: Vec<String>,
    pub ready_players: Vec<String>,
    pub remaining_ms: Option<i64>,
    pub board: Option<GameBoard>,
}

/// State of a single room: membership, readiness, round timing and scoring.
///
/// Every mutation goes through `&mut self`; the owning [`Room`](crate::state::room::Room)
/// serializes access so session dispatch and ticks never interleave.
#[derive(Debug)]
pub struct RoomStateMachine {
    name: String,
    settings: RoomSettings,
    state: RoundState,
    members: Vec<Member>,
    ready: IndexSet<String>,
    round_started_at: Option<Instant>,
    board: Option<GameBoard>,
    actions: ActionLog,
}

impl RoomStateMachine {
    /// Create an empty room waiting for players.
    pub fn new(name: impl Into<String>, settings: RoomSettings) -> Self {
        Self {
            name: name.into(),
            settings,
            state: RoundState::WaitingForPlayers,
            members: Vec::new(),
            ready: IndexSet::new(),
            round_started_at: None,
            board: None,
            actions: ActionLog::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn is_member(&self, player_id: &str) -> bool {
        self.members.iter().any(|member| member.player_id == player_id)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn pending_actions(&self) -> usize {
        self.actions.len()
    }

    pub fn board(&self) -> Option<&GameBoard> {
        self.board.as_ref()
    }

    /// Seat a session in the room.
    ///
    /// Joining never changes the round state directly; reaching the minimum
    /// player count is picked up by the next tick. A session that is already
    /// seated is accepted again without being duplicated.
    pub fn join(&mut self, connection: SessionConnection) -> Result<(), RoomError> {
        if self.state == RoundState::Over {
            return Err(RoomError::Finished(self.name.clone()));
        }
        if self.is_member(&connection.id) {
            return Ok(());
        }
        if self.members.len() >= self.settings.max_players {
            return Err(RoomError::RoomFull {
                room: self.name.clone(),
                max_players: self.settings.max_players,
            });
        }

        self.members.push(Member {
            player_id: connection.id.clone(),
            connection,
        });
        debug!(
            room = %self.name,
            players = self.members.len(),
            max = self.settings.max_players,
            "player joined room"
        );
        Ok(())
    }

    /// Remove a player from the room, returning whether it was seated.
    ///
    /// A player leaving a running round keeps its entry on the board.
    pub fn leave(&mut self, player_id: &str) -> bool {
        let before = self.members.len();
        self.members.retain(|member| member.player_id != player_id);
        self.ready.shift_remove(player_id);
        before != self.members.len()
    }

    /// Record that `player_id` is ready. Ignored unless the player is seated,
    /// not yet ready, and the room is waiting for readiness.
    pub fn mark_ready(&mut self, player_id: &str) -> bool {
        if self.state != RoundState::WaitingForReady || !self.is_member(player_id) {
            return false;
        }
        self.ready.insert(player_id.to_string())
    }

    /// Buffer an input for the next tick. Dropped unless the round is running
    /// and the sender is still seated.
    pub fn record_action(&mut self, action: Action) -> bool {
        if self.state != RoundState::Running || !self.is_member(&action.player_id) {
            return false;
        }
        self.actions.push(action);
        true
    }

    /// Remaining round time at `now`, if a round has started.
    pub fn remaining_ms(&self, now: Instant) -> Option<i64> {
        let started = self.round_started_at?;
        let elapsed = now.saturating_duration_since(started);
        Some(millis(self.settings.round_duration) - millis(elapsed))
    }

    /// Advance the room by exactly one step.
    pub fn tick<R>(&mut self, now: Instant, rng: &mut R) -> TickReport
    where
        R: Rng + ?Sized,
    {
        let from = self.state;
        let mut dropped = Vec::new();

        match self.state {
            RoundState::WaitingForPlayers => {
                if self.members.len() >= self.settings.min_players {
                    self.state = RoundState::WaitingForReady;
                    info!(
                        room = %self.name,
                        ready = self.ready.len(),
                        needed = self.settings.min_players,
                        "waiting for players to get ready"
                    );
                }
            }
            RoundState::WaitingForReady => {
                if self.members.len() < self.settings.min_players {
                    self.ready.clear();
                    self.state = RoundState::WaitingForPlayers;
                } else if self.ready.len() >= self.settings.min_players {
                    self.start_round(now, rng, &mut dropped);
                }
            }
            RoundState::Running => self.run_tick(now, rng, &mut dropped),
            RoundState::Over => {}
        }

        TickReport {
            from,
            to: self.state,
            dropped,
        }
    }

    /// Snapshot the room for listings.
    pub fn snapshot(&self, now: Instant) -> RoomSnapshot {
        RoomSnapshot {
            name: self.name.clone(),
            state: self.state,
            min_players: self.settings.min_players,
            max_players: self.settings.max_players,
            players: self
                .members
                .iter()
                .map(|member| member.player_id.clone())
                .collect(),
            ready_players: self.ready.iter().cloned().collect(),
            remaining_ms: match self.state {
                RoundState::Running => self.remaining_ms(now).map(|ms| ms.max(0)),
                RoundState::Over => Some(0),
                _ => None,
            },
            board: self.board.clone(),
        }
    }

    fn start_round<R>(&mut self, now: Instant, rng: &mut R, dropped: &mut Vec<String>)
    where
        R: Rng + ?Sized,
    {
        self.ready.clear();
        self.actions.clear();
        self.board = Some(GameBoard::new(
            self.members.iter().map(|member| member.player_id.as_str()),
            self.settings.starting_health,
            millis(self.settings.round_duration),
            rng,
        ));
        self.round_started_at = Some(now);
        self.state = RoundState::Running;
        info!(room = %self.name, players = self.members.len(), "game is starting");

        self.broadcast(&OutboundFrame::notice(GAME_STARTED_NOTICE), dropped);
    }

    fn run_tick<R>(&mut self, now: Instant, rng: &mut R, dropped: &mut Vec<String>)
    where
        R: Rng + ?Sized,
    {
        let remaining = self.remaining_ms(now).unwrap_or(0);
        if remaining <= 0 {
            self.state = RoundState::Over;
            self.actions.clear();
            info!(
                room = %self.name,
                scores = ?self.board.as_ref().map(|board| &board.scores),
                "game is over"
            );
            self.broadcast(&OutboundFrame::notice(GAME_OVER_NOTICE), dropped);
            return;
        }

        let Some(mut board) = self.board.take() else {
            return;
        };
        for action in self.actions.drain_ordered() {
            let effect = board.apply(&action);
            debug!(room = %self.name, player = %action.player_id, ?effect, "applied action");
        }

        self.broadcast(&OutboundFrame::Board(board.clone()), dropped);
        self.board = Some(board.next(remaining, rng));
        debug!(room = %self.name, remaining_ms = remaining, "tick applied");
    }

    fn broadcast(&mut self, frame: &OutboundFrame, dropped: &mut Vec<String>) {
        let removed = fanout::broadcast(&self.name, &mut self.members, frame);
        for player_id in &removed {
            self.ready.shift_remove(player_id);
        }
        dropped.extend(removed);
    }
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::state::board::{CellPos, GRID_SIZE};

    const KEYS: [&str; 9] = ["w", "e", "r", "s", "d", "f", "x", "c", "v"];

    fn connection(id: &str, capacity: usize) -> (SessionConnection, mpsc::Receiver<OutboundFrame>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            SessionConnection {
                id: id.into(),
                name: id.into(),
                tx,
            },
            rx,
        )
    }

    fn key_at(pos: CellPos) -> &'static str {
        KEYS[pos.row * GRID_SIZE + pos.col]
    }

    fn action(ts: i64, player: &str, input: &str) -> Action {
        Action {
            timestamp_ms: ts,
            player_id: player.into(),
            input: input.into(),
        }
    }

    fn settings() -> RoomSettings {
        RoomSettings {
            round_duration: Duration::from_secs(10),
            ..RoomSettings::default()
        }
    }

    /// Room with two seated players that has been ticked into `Running`.
    fn running_room(
        now: Instant,
    ) -> (
        RoomStateMachine,
        mpsc::Receiver<OutboundFrame>,
        mpsc::Receiver<OutboundFrame>,
    ) {
        let mut rng = rand::rng();
        let mut room = RoomStateMachine::new("arena", settings());
        let (a, a_rx) = connection("a", 16);
        let (b, b_rx) = connection("b", 16);
        room.join(a).unwrap();
        room.join(b).unwrap();
        room.tick(now, &mut rng);
        assert!(room.mark_ready("a"));
        assert!(room.mark_ready("b"));
        let report = room.tick(now, &mut rng);
        assert_eq!(report.to, RoundState::Running);
        (room, a_rx, b_rx)
    }

    #[test]
    fn join_beyond_capacity_fails_without_mutation() {
        let mut room = RoomStateMachine::new("arena", settings());
        room.join(connection("a", 1).0).unwrap();
        room.join(connection("b", 1).0).unwrap();

        let err = room.join(connection("c", 1).0).unwrap_err();
        assert_eq!(
            err,
            RoomError::RoomFull {
                room: "arena".into(),
                max_players: 2
            }
        );
        assert_eq!(room.member_count(), 2);
        assert!(!room.is_member("c"));
    }

    #[test]
    fn rejoining_does_not_duplicate_member() {
        let mut room = RoomStateMachine::new("arena", settings());
        let (a, _rx) = connection("a", 1);
        room.join(a.clone()).unwrap();
        room.join(a).unwrap();
        assert_eq!(room.member_count(), 1);
    }

    #[test]
    fn reaching_min_players_waits_for_next_tick() {
        let mut rng = rand::rng();
        let mut room = RoomStateMachine::new("arena", settings());
        room.join(connection("a", 1).0).unwrap();
        room.join(connection("b", 1).0).unwrap();
        assert_eq!(room.state(), RoundState::WaitingForPlayers);

        let report = room.tick(Instant::now(), &mut rng);
        assert_eq!(report.from, RoundState::WaitingForPlayers);
        assert_eq!(report.to, RoundState::WaitingForReady);
    }

    #[test]
    fn mark_ready_is_gated() {
        let mut rng = rand::rng();
        let mut room = RoomStateMachine::new("arena", settings());
        room.join(connection("a", 1).0).unwrap();
        assert!(!room.mark_ready("a"), "not waiting for ready yet");

        room.join(connection("b", 1).0).unwrap();
        room.tick(Instant::now(), &mut rng);
        assert!(!room.mark_ready("stranger"));
        assert!(room.mark_ready("a"));
        assert!(!room.mark_ready("a"), "already ready");

        let snapshot = room.snapshot(Instant::now());
        assert_eq!(snapshot.ready_players, ["a"]);
    }

    #[test]
    fn full_readiness_starts_round_on_next_tick() {
        let now = Instant::now();
        let (room, mut a_rx, mut b_rx) = running_room(now);

        for rx in [&mut a_rx, &mut b_rx] {
            assert_eq!(rx.try_recv().unwrap(), OutboundFrame::notice(GAME_STARTED_NOTICE));
        }
        let board = room.board().unwrap();
        assert_eq!(board.scores.values().copied().collect::<Vec<_>>(), [0, 0]);
        assert_eq!(board.healths.values().copied().collect::<Vec<_>>(), [3, 3]);
        assert_eq!(board.remaining_ms, 10_000);
        assert!(room.snapshot(now).ready_players.is_empty());
    }

    #[test]
    fn actions_outside_running_are_dropped() {
        let mut room = RoomStateMachine::new("arena", settings());
        room.join(connection("a", 1).0).unwrap();
        assert!(!room.record_action(action(1, "a", "w")));
        assert_eq!(room.pending_actions(), 0);
    }

    #[test]
    fn tick_applies_actions_in_timestamp_order() {
        let mut rng = rand::rng();
        let now = Instant::now();
        let (mut room, mut a_rx, _b_rx) = running_room(now);
        a_rx.try_recv().unwrap();

        let board = room.board().unwrap().clone();
        let score_key = key_at(board.scoring_cell().unwrap());
        let penalty_key = key_at(board.penalty_cell().unwrap());

        // Admitted out of order; the earlier one must land first.
        assert!(room.record_action(action(2, "a", penalty_key)));
        assert!(room.record_action(action(1, "a", score_key)));
        assert!(room.record_action(action(3, "b", "not-a-key")));

        room.tick(now + Duration::from_secs(1), &mut rng);
        assert_eq!(room.pending_actions(), 0);

        match a_rx.try_recv().unwrap() {
            OutboundFrame::Board(sent) => {
                assert_eq!(sent.scores["a"], 1);
                assert_eq!(sent.healths["a"], 2);
                assert_eq!(sent.scores["b"], 0);
                assert_eq!(sent.remaining_ms, 10_000);
            }
            other => panic!("expected board, got {other:?}"),
        }

        let next = room.board().unwrap();
        assert_eq!(next.scores["a"], 1);
        assert_eq!(next.remaining_ms, 9_000);
    }

    #[test]
    fn round_ends_once_time_runs_out() {
        let mut rng = rand::rng();
        let now = Instant::now();
        let (mut room, mut a_rx, _b_rx) = running_room(now);
        a_rx.try_recv().unwrap();

        let report = room.tick(now + Duration::from_secs(10), &mut rng);
        assert_eq!(report.from, RoundState::Running);
        assert_eq!(report.to, RoundState::Over);
        assert_eq!(a_rx.try_recv().unwrap(), OutboundFrame::notice(GAME_OVER_NOTICE));

        let report = room.tick(now + Duration::from_secs(11), &mut rng);
        assert_eq!(report.to, RoundState::Over);
        assert!(a_rx.try_recv().is_err(), "no frames after game over");
    }

    #[test]
    fn finished_room_refuses_joins() {
        let mut rng = rand::rng();
        let now = Instant::now();
        let (mut room, _a_rx, _b_rx) = running_room(now);
        room.tick(now + Duration::from_secs(10), &mut rng);

        let err = room.join(connection("c", 1).0).unwrap_err();
        assert_eq!(err, RoomError::Finished("arena".into()));
    }

    #[test]
    fn slow_member_is_removed_during_tick() {
        let mut rng = rand::rng();
        let now = Instant::now();
        let mut room = RoomStateMachine::new("arena", settings());
        let (slow, _slow_rx) = connection("slow", 1);
        let (fast, mut fast_rx) = connection("fast", 16);
        room.join(slow).unwrap();
        room.join(fast).unwrap();
        room.tick(now, &mut rng);
        room.mark_ready("slow");
        room.mark_ready("fast");

        // "Game started" fills the slow queue; the first board overflows it.
        room.tick(now, &mut rng);
        let report = room.tick(now + Duration::from_secs(1), &mut rng);

        assert_eq!(report.dropped, ["slow"]);
        assert!(!room.is_member("slow"));
        assert_eq!(fast_rx.try_recv().unwrap(), OutboundFrame::notice(GAME_STARTED_NOTICE));
        assert!(matches!(fast_rx.try_recv().unwrap(), OutboundFrame::Board(_)));
    }

    #[test]
    fn inputs_from_removed_members_are_dropped() {
        let now = Instant::now();
        let (mut room, _a_rx, _b_rx) = running_room(now);
        assert!(room.leave("a"));

        let scoring = room.board().and_then(GameBoard::scoring_cell).unwrap();
        assert!(!room.record_action(action(1, "a", key_at(scoring))));
        assert!(room.record_action(action(2, "b", key_at(scoring))));
        assert_eq!(room.pending_actions(), 1);
    }

    #[test]
    fn leaving_below_quorum_returns_to_waiting_for_players() {
        let mut rng = rand::rng();
        let mut room = RoomStateMachine::new("arena", settings());
        room.join(connection("a", 1).0).unwrap();
        room.join(connection("b", 1).0).unwrap();
        room.tick(Instant::now(), &mut rng);
        room.mark_ready("a");

        assert!(room.leave("b"));
        assert!(!room.leave("b"));
        let report = room.tick(Instant::now(), &mut rng);
        assert_eq!(report.to, RoundState::WaitingForPlayers);
        assert!(room.snapshot(Instant::now()).ready_players.is_empty());
    }
}
