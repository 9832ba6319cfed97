pub mod health;
pub mod logs;
pub mod reminders;
pub mod streaks;
pub mod ws;

use crate::AppState;

/// Publish a change/reminder event to every WebSocket subscriber. Send
/// failures only mean nobody is listening.
pub(crate) fn broadcast_event(state: &AppState, event: serde_json::Value) {
    let _ = state.events_tx.send(event.to_string());
}
