//! Inkboard Core Library
//!
//! Element model, interaction reducer, undo history, serialization and sync
//! plumbing for the Inkboard collaborative whiteboard.

pub mod board;
pub mod codec;
pub mod element;
pub mod history;
pub mod session;
pub mod storage;
pub mod sync;
pub mod tools;

pub use board::{reduce, BoardConfig, BoardError, BoardEvent, BoardState, CommitCause, Effect, Transition};
pub use codec::{decode_elements, deserialize, serialize, CodecError, Decoded, ElementRecord, Snapshot};
pub use element::{create_element, Element, ElementId, ElementKind, ElementTrait, Style};
pub use history::History;
pub use session::{CanvasSession, SaveStatus, SessionError};
pub use storage::{CanvasDocument, DocumentStore, FileDocumentStore, MemoryDocumentStore, StoreError};
pub use sync::{ClientMessage, ConnectionState, RelayClient, ServerMessage, SyncEvent};
pub use tools::{InteractionPhase, ToolKind};
