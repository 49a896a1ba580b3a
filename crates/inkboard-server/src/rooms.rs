//! Room membership and fan-out.
//!
//! Each room maps peer ids to the unbounded sender of that peer's socket
//! task. Join, leave and fan-out for a room all run under the room's shard
//! lock, so a frame is either queued for a member or the member is gone.

use dashmap::DashMap;
use inkboard_core::sync::ServerMessage;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::debug;

/// A frame queued for one socket.
///
/// `generation` identifies the membership it was sent under; the socket
/// task drops frames whose membership has since ended.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomFrame {
    pub canvas_id: String,
    pub generation: u64,
    pub message: ServerMessage,
}

pub type FrameSender = mpsc::UnboundedSender<RoomFrame>;

struct Member {
    tx: FrameSender,
    generation: u64,
}

#[derive(Default)]
struct Room {
    members: HashMap<String, Member>,
}

impl Room {
    /// Queue `message` for every member except `from`.
    fn fan_out(&self, canvas_id: &str, from: &str, message: &ServerMessage) -> usize {
        let mut delivered = 0;
        for (peer_id, member) in &self.members {
            if peer_id == from {
                continue;
            }
            let frame = RoomFrame {
                canvas_id: canvas_id.to_string(),
                generation: member.generation,
                message: message.clone(),
            };
            if member.tx.send(frame).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }
}

/// All live rooms, keyed by canvas id.
#[derive(Default)]
pub struct RoomTable {
    rooms: DashMap<String, Room>,
}

impl RoomTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a peer to a room and tell the other members. Returns the member
    /// count including the new peer.
    pub fn join(&self, canvas_id: &str, peer_id: &str, tx: FrameSender, generation: u64) -> usize {
        let mut room = self.rooms.entry(canvas_id.to_string()).or_default();
        let rejoin = room
            .members
            .insert(peer_id.to_string(), Member { tx, generation })
            .is_some();
        if !rejoin {
            room.fan_out(
                canvas_id,
                peer_id,
                &ServerMessage::PeerJoined {
                    canvas_id: canvas_id.to_string(),
                    peer_id: peer_id.to_string(),
                },
            );
        }
        room.members.len()
    }

    /// Remove a peer from a room, tell the remaining members and drop the
    /// room once empty. Returns whether the peer was a member.
    pub fn leave(&self, canvas_id: &str, peer_id: &str) -> bool {
        let removed = {
            let Some(mut room) = self.rooms.get_mut(canvas_id) else {
                return false;
            };
            let removed = room.members.remove(peer_id).is_some();
            if removed {
                room.fan_out(
                    canvas_id,
                    peer_id,
                    &ServerMessage::PeerLeft {
                        canvas_id: canvas_id.to_string(),
                        peer_id: peer_id.to_string(),
                    },
                );
            }
            removed
        };
        if self
            .rooms
            .remove_if(canvas_id, |_, room| room.members.is_empty())
            .is_some()
        {
            debug!("Dropped empty room {}", canvas_id);
        }
        removed
    }

    /// Remove a peer from every listed room.
    pub fn leave_all<'a>(&self, canvas_ids: impl IntoIterator<Item = &'a String>, peer_id: &str) {
        for canvas_id in canvas_ids {
            self.leave(canvas_id, peer_id);
        }
    }

    /// Queue `message` for every member of a room except `from`.
    ///
    /// Returns `None` if `from` is not a member, otherwise the number of
    /// peers the frame was queued for.
    pub fn broadcast(&self, canvas_id: &str, from: &str, message: &ServerMessage) -> Option<usize> {
        let room = self.rooms.get(canvas_id)?;
        if !room.members.contains_key(from) {
            return None;
        }
        Some(room.fan_out(canvas_id, from, message))
    }

    pub fn is_member(&self, canvas_id: &str, peer_id: &str) -> bool {
        self.rooms
            .get(canvas_id)
            .is_some_and(|room| room.members.contains_key(peer_id))
    }

    pub fn member_count(&self, canvas_id: &str) -> usize {
        self.rooms.get(canvas_id).map_or(0, |room| room.members.len())
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn update(canvas_id: &str) -> ServerMessage {
        ServerMessage::CanvasUpdate {
            canvas_id: canvas_id.to_string(),
            elements: json!([]),
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<RoomFrame>) -> Vec<RoomFrame> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn test_join_notifies_existing_members() {
        let table = RoomTable::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();

        assert_eq!(table.join("c1", "a", tx_a, 1), 1);
        assert_eq!(table.join("c1", "b", tx_b.clone(), 1), 2);
        // Joining twice replaces the sender without a second notification.
        assert_eq!(table.join("c1", "b", tx_b, 2), 2);

        let frames = drain(&mut rx_a);
        assert_eq!(frames.len(), 1);
        assert!(matches!(frames[0].message, ServerMessage::PeerJoined { ref peer_id, .. } if peer_id == "b"));
        assert!(drain(&mut rx_b).is_empty());
    }

    #[test]
    fn test_broadcast_skips_sender_and_other_rooms() {
        let table = RoomTable::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let (tx_c, mut rx_c) = mpsc::unbounded_channel();
        table.join("c1", "a", tx_a, 1);
        table.join("c1", "b", tx_b, 7);
        table.join("c2", "c", tx_c, 1);
        drain(&mut rx_a);

        assert_eq!(table.broadcast("c1", "a", &update("c1")), Some(1));
        assert!(drain(&mut rx_a).is_empty());
        let frames = drain(&mut rx_b);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].canvas_id, "c1");
        assert_eq!(frames[0].generation, 7);
        assert!(drain(&mut rx_c).is_empty());
    }

    #[test]
    fn test_broadcast_requires_membership() {
        let table = RoomTable::new();
        let (tx_a, _rx_a) = mpsc::unbounded_channel();
        table.join("c1", "a", tx_a, 1);
        assert_eq!(table.broadcast("c1", "stranger", &update("c1")), None);
        assert_eq!(table.broadcast("missing", "a", &update("missing")), None);
    }

    #[test]
    fn test_leave_drops_empty_rooms() {
        let table = RoomTable::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, _rx_b) = mpsc::unbounded_channel();
        table.join("c1", "a", tx_a, 1);
        table.join("c1", "b", tx_b, 1);
        drain(&mut rx_a);

        assert!(table.leave("c1", "b"));
        assert!(!table.leave("c1", "b"));
        assert!(matches!(drain(&mut rx_a)[0].message, ServerMessage::PeerLeft { .. }));
        assert_eq!(table.member_count("c1"), 1);

        table.leave("c1", "a");
        assert_eq!(table.room_count(), 0);
        assert!(!table.is_member("c1", "a"));
    }

    #[test]
    fn test_leave_all() {
        let table = RoomTable::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        table.join("c1", "a", tx.clone(), 1);
        table.join("c2", "a", tx, 2);
        let rooms = vec!["c1".to_string(), "c2".to_string()];
        table.leave_all(&rooms, "a");
        assert_eq!(table.room_count(), 0);
    }
}
