//! Fire-and-forget audio/visual cues.
//!
//! The session decides *when* a cue fires; sinks decide what it sounds or looks like.
//! Emitting never blocks and never fails from the caller's point of view.

use crate::protocol::ServerMessage;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    Tick,
    Hit,
    Miss,
    Win,
    Lose,
    Bankrupt,
}

pub trait CueSink: Send + Sync {
    fn emit(&self, cue: Cue);
}

/// Forwards cues to every connected client as `ServerMessage::Cue`
pub struct BroadcastCues {
    tx: broadcast::Sender<ServerMessage>,
}

impl BroadcastCues {
    pub fn new(tx: broadcast::Sender<ServerMessage>) -> Self {
        Self { tx }
    }
}

impl CueSink for BroadcastCues {
    fn emit(&self, cue: Cue) {
        // No receivers connected is fine
        let _ = self.tx.send(ServerMessage::Cue { cue });
    }
}

/// Sink that drops everything; used when no display is attached
pub struct SilentCues;

impl CueSink for SilentCues {
    fn emit(&self, cue: Cue) {
        tracing::trace!("Cue {:?} dropped", cue);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_cues_forwards() {
        let (tx, mut rx) = broadcast::channel(8);
        let sink = BroadcastCues::new(tx);
        sink.emit(Cue::Bankrupt);
        match rx.try_recv() {
            Ok(ServerMessage::Cue { cue }) => assert_eq!(cue, Cue::Bankrupt),
            other => panic!("Expected Cue message, got {:?}", other),
        }
    }

    #[test]
    fn test_emit_without_receivers_is_harmless() {
        let (tx, rx) = broadcast::channel(8);
        drop(rx);
        BroadcastCues::new(tx).emit(Cue::Tick);
    }
}
