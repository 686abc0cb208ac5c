/// A single player input captured while a round is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    /// Milliseconds since the Unix epoch at which the input was admitted.
    pub timestamp_ms: i64,
    /// Identifier of the session that sent the input.
    pub player_id: String,
    /// Raw input symbol (e.g. `"w"`), trimmed of surrounding whitespace.
    pub input: String,
}

/// Append-only buffer of actions for the round in progress.
///
/// The log is drained on every tick; [`ActionLog::drain_ordered`] hands back
/// the buffered actions sorted by timestamp so the outcome of a tick does not
/// depend on the order in which inputs reached the server.
#[derive(Debug, Default)]
pub struct ActionLog {
    actions: Vec<Action>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Remove every buffered action, returning them in timestamp order.
    ///
    /// The sort is stable: two actions sharing a timestamp keep their
    /// admission order.
    pub fn drain_ordered(&mut self) -> Vec<Action> {
        let mut actions = std::mem::take(&mut self.actions);
        actions.sort_by_key(|action| action.timestamp_ms);
        actions
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }
}
