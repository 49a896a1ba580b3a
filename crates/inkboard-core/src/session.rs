//! Client-side session for one open canvas.
//!
//! A [`CanvasSession`] owns the board and sits between the reducer and the
//! outside world. Local commits are queued for the relay (the outbox) and
//! for the document store (the pending save); the caller drains both and
//! performs the I/O. Snapshots that arrive from the relay are applied with
//! a one-shot guard so they are neither echoed back nor saved again.

use crate::board::{reduce, BoardConfig, BoardError, BoardEvent, BoardState, CommitCause, Effect};
use crate::codec::{decode_elements, encode_snapshot, CodecError, Snapshot};
use crate::storage::{DocumentStore, StoreError};
use crate::sync::{ClientMessage, ServerMessage, SyncEvent};
use std::sync::Arc;
use thiserror::Error;

/// Session errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Persistence status shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveStatus {
    #[default]
    Saved,
    Saving,
    ErrorSaving,
}

/// One open canvas with its sync and persistence bookkeeping.
pub struct CanvasSession {
    canvas_id: String,
    credential: String,
    state: BoardState,
    /// Set just before applying a remote snapshot, consumed by the commit it causes.
    remote_update_guard: bool,
    /// Whether this session has asked the relay to join its room.
    joined: bool,
    /// Set by a disconnect while joined; the next connect re-sends the join.
    rejoin_on_connect: bool,
    peer_count: usize,
    outgoing: Vec<ClientMessage>,
    pending_save: Option<Arc<Snapshot>>,
    save_status: SaveStatus,
    auth_required: bool,
    dropped_records: usize,
    last_error: Option<String>,
}

impl CanvasSession {
    pub fn new(canvas_id: impl Into<String>, credential: impl Into<String>) -> Self {
        Self::with_config(canvas_id, credential, BoardConfig::default())
    }

    pub fn with_config(
        canvas_id: impl Into<String>,
        credential: impl Into<String>,
        config: BoardConfig,
    ) -> Self {
        Self {
            canvas_id: canvas_id.into(),
            credential: credential.into(),
            state: BoardState::new(config),
            remote_update_guard: false,
            joined: false,
            rejoin_on_connect: false,
            peer_count: 0,
            outgoing: Vec::new(),
            pending_save: None,
            save_status: SaveStatus::Saved,
            auth_required: false,
            dropped_records: 0,
            last_error: None,
        }
    }

    pub fn canvas_id(&self) -> &str {
        &self.canvas_id
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    pub fn is_joined(&self) -> bool {
        self.joined
    }

    /// Members of the room as last reported by the relay, this session included.
    pub fn peer_count(&self) -> usize {
        self.peer_count
    }

    pub fn save_status(&self) -> SaveStatus {
        self.save_status
    }

    /// True after the store rejected our credential; saves stop until
    /// [`CanvasSession::reauthenticate`].
    pub fn auth_required(&self) -> bool {
        self.auth_required
    }

    /// Total records dropped while decoding remote or stored payloads.
    pub fn dropped_records(&self) -> usize {
        self.dropped_records
    }

    /// Last error reported by the relay.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Apply a local event.
    pub fn dispatch(&mut self, event: BoardEvent) -> Result<Effect, SessionError> {
        let transition = match reduce(&self.state, event) {
            Ok(t) => t,
            Err(e) => {
                self.remote_update_guard = false;
                return Err(e.into());
            }
        };
        self.state = transition.state;
        self.on_effect(&transition.effect);
        Ok(transition.effect)
    }

    fn on_effect(&mut self, effect: &Effect) {
        let Effect::Committed { snapshot, cause } = effect else {
            return;
        };
        if std::mem::take(&mut self.remote_update_guard) {
            log::debug!("Applied remote snapshot for {} without echo", self.canvas_id);
            return;
        }
        if self.joined {
            match encode_snapshot(snapshot) {
                Ok(elements) => self.outgoing.push(ClientMessage::CanvasUpdate {
                    canvas_id: self.canvas_id.clone(),
                    elements,
                }),
                Err(e) => log::error!("Failed to encode snapshot: {}", e),
            }
        }
        if self.auth_required {
            log::debug!("Skipping save of {:?} commit, re-authentication required", cause);
        } else {
            self.pending_save = Some(Arc::clone(snapshot));
            self.save_status = SaveStatus::Saving;
        }
    }

    /// Subscribe to this canvas's room.
    pub fn join(&mut self) {
        if self.joined {
            return;
        }
        self.joined = true;
        self.outgoing.push(ClientMessage::JoinCanvas {
            canvas_id: self.canvas_id.clone(),
        });
    }

    /// Unsubscribe from this canvas's room.
    pub fn leave(&mut self) {
        if !self.joined {
            return;
        }
        self.joined = false;
        self.peer_count = 0;
        self.outgoing.push(ClientMessage::LeaveCanvas {
            canvas_id: self.canvas_id.clone(),
        });
    }

    /// Handle a frame from the relay.
    ///
    /// Frames for other canvases are ignored. A `canvasUpdate` replaces the
    /// board and its history; the last one delivered wins.
    pub fn receive(&mut self, msg: ServerMessage) -> Result<(), SessionError> {
        if msg.canvas_id().is_some_and(|id| id != self.canvas_id) {
            log::debug!("Ignoring relay frame for another canvas: {:?}", msg.canvas_id());
            return Ok(());
        }
        match msg {
            ServerMessage::CanvasUpdate { elements, .. } => {
                let decoded = decode_elements(&elements)?;
                self.dropped_records += decoded.dropped_count();
                self.apply_remote(decoded.elements)?;
            }
            ServerMessage::Joined { peer_count, .. } => {
                log::info!("Joined canvas {} with {} peers", self.canvas_id, peer_count);
                self.peer_count = peer_count;
            }
            ServerMessage::Left { .. } => self.peer_count = 0,
            ServerMessage::PeerJoined { peer_id, .. } => {
                log::debug!("Peer {} joined {}", peer_id, self.canvas_id);
                self.peer_count += 1;
            }
            ServerMessage::PeerLeft { peer_id, .. } => {
                log::debug!("Peer {} left {}", peer_id, self.canvas_id);
                self.peer_count = self.peer_count.saturating_sub(1);
            }
            ServerMessage::Error { message } => {
                log::warn!("Relay error: {}", message);
                self.last_error = Some(message);
            }
        }
        Ok(())
    }

    /// Feed an event from a [`crate::sync::RelayClient`].
    ///
    /// A reconnect after a drop re-sends the join so the relay puts us back
    /// in the room. The first connect sends nothing extra.
    pub fn handle_sync_event(&mut self, event: SyncEvent) -> Result<(), SessionError> {
        match event {
            SyncEvent::Message(msg) => self.receive(msg),
            SyncEvent::Connected => {
                if std::mem::take(&mut self.rejoin_on_connect) && self.joined {
                    self.outgoing.push(ClientMessage::JoinCanvas {
                        canvas_id: self.canvas_id.clone(),
                    });
                }
                Ok(())
            }
            SyncEvent::Disconnected => {
                self.peer_count = 0;
                self.rejoin_on_connect = self.joined;
                Ok(())
            }
            SyncEvent::Error { message } => {
                self.last_error = Some(message);
                Ok(())
            }
        }
    }

    fn apply_remote(&mut self, elements: Vec<crate::element::Element>) -> Result<(), SessionError> {
        self.remote_update_guard = true;
        let effect = self.dispatch(BoardEvent::LoadExternal { elements })?;
        debug_assert!(matches!(
            effect,
            Effect::Committed { cause: CommitCause::External, .. }
        ));
        Ok(())
    }

    /// Drain the messages queued for the relay.
    pub fn take_outgoing(&mut self) -> Vec<ClientMessage> {
        std::mem::take(&mut self.outgoing)
    }

    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }

    /// Take the newest unsaved snapshot and mark the save as in flight.
    ///
    /// Returns `None` when nothing is pending or re-authentication is required.
    pub fn take_pending_save(&mut self) -> Option<Arc<Snapshot>> {
        if self.auth_required {
            return None;
        }
        let snapshot = self.pending_save.take()?;
        self.save_status = SaveStatus::Saving;
        Some(snapshot)
    }

    pub fn has_pending_save(&self) -> bool {
        self.pending_save.is_some()
    }

    /// Record the outcome of a save started with [`CanvasSession::take_pending_save`].
    ///
    /// Failures are not retried and never roll back the board.
    pub fn record_save_result(&mut self, result: &Result<(), StoreError>) {
        match result {
            Ok(()) if self.pending_save.is_some() => {
                log::debug!("Canvas {} changed while saving", self.canvas_id);
            }
            Ok(()) => self.save_status = SaveStatus::Saved,
            Err(e) => {
                log::warn!("Saving canvas {} failed: {}", self.canvas_id, e);
                self.save_status = SaveStatus::ErrorSaving;
                if e.is_auth() {
                    self.auth_required = true;
                    self.pending_save = None;
                }
            }
        }
    }

    /// Install a fresh credential and resume saving.
    pub fn reauthenticate(&mut self, credential: impl Into<String>) {
        self.credential = credential.into();
        self.auth_required = false;
    }

    /// Load the canvas from the store, replacing the board and history.
    ///
    /// The loaded board is not published or saved back. Returns the number
    /// of elements loaded.
    pub async fn load_from(&mut self, store: &dyn DocumentStore) -> Result<usize, SessionError> {
        let payload = match store.load_elements(&self.canvas_id, &self.credential).await {
            Ok(payload) => payload,
            Err(e) => {
                if e.is_auth() {
                    self.auth_required = true;
                }
                return Err(e.into());
            }
        };
        let decoded = decode_elements(&payload)?;
        self.dropped_records += decoded.dropped_count();
        let count = decoded.elements.len();
        self.apply_remote(decoded.elements)?;
        log::info!("Loaded canvas {} with {} elements", self.canvas_id, count);
        Ok(count)
    }

    /// Write the pending snapshot, if any, to the store.
    pub async fn flush_save(&mut self, store: &dyn DocumentStore) -> Result<(), SessionError> {
        let Some(snapshot) = self.take_pending_save() else {
            return Ok(());
        };
        let result = store
            .save_elements(&self.canvas_id, &self.credential, &snapshot)
            .await;
        self.record_save_result(&result);
        result.map_err(SessionError::from)
    }
}
