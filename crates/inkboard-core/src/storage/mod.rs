//! Document store boundary for persisted canvases.
//!
//! A canvas is stored as a [`CanvasDocument`] whose `elements` are the
//! serialized snapshot, overwritten wholesale on every save. Callers present
//! an opaque bearer credential; stores resolve it to a user through a
//! [`TokenRegistry`] and apply the access rules on [`CanvasDocument`].

mod file;
mod memory;

pub use file::FileDocumentStore;
pub use memory::MemoryDocumentStore;

use crate::codec::ElementRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// Name given to canvases created without one.
pub const DEFAULT_CANVAS_NAME: &str = "Untitled Canvas";

/// Store errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("Canvas not found: {0}")]
    NotFound(String),
    /// The caller is known but may not perform this operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),
    /// The credential is missing, unknown or expired.
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Store error: {0}")]
    Other(String),
}

impl StoreError {
    /// Whether the caller must re-authenticate before trying again.
    pub fn is_auth(&self) -> bool {
        matches!(self, StoreError::Unauthorized | StoreError::Forbidden(_))
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Boxed future for async store operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A persisted canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasDocument {
    pub id: String,
    /// User id of the owner.
    pub owner: String,
    pub name: String,
    /// Serialized element array.
    pub elements: Value,
    /// User ids allowed to load and save besides the owner.
    #[serde(default)]
    pub shared_with: Vec<String>,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
    /// Milliseconds since the Unix epoch of the last write.
    pub modified_at: u64,
}

impl CanvasDocument {
    /// Create an empty canvas owned by `owner`.
    pub fn new(owner: impl Into<String>, name: Option<&str>) -> Self {
        let now = now_millis();
        Self {
            id: Uuid::new_v4().to_string(),
            owner: owner.into(),
            name: name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or(DEFAULT_CANVAS_NAME)
                .to_string(),
            elements: Value::Array(Vec::new()),
            shared_with: Vec::new(),
            created_at: now,
            modified_at: now,
        }
    }

    pub fn is_owner(&self, user: &str) -> bool {
        self.owner == user
    }

    /// Owner or a user the canvas is shared with.
    pub fn can_access(&self, user: &str) -> bool {
        self.is_owner(user) || self.shared_with.iter().any(|u| u == user)
    }

    fn check_access(&self, user: &str) -> StoreResult<()> {
        if self.can_access(user) {
            Ok(())
        } else {
            Err(StoreError::Forbidden(format!(
                "no permission to access canvas {}",
                self.id
            )))
        }
    }

    fn check_owner(&self, user: &str, action: &str) -> StoreResult<()> {
        if self.is_owner(user) {
            Ok(())
        } else {
            Err(StoreError::Forbidden(format!(
                "only the owner can {} canvas {}",
                action, self.id
            )))
        }
    }

    /// Overwrite the elements and bump `modified_at`.
    fn replace_elements(&mut self, records: &[ElementRecord]) -> StoreResult<()> {
        self.elements = serde_json::to_value(records)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.modified_at = now_millis().max(self.modified_at);
    }

    pub fn summary(&self) -> CanvasSummary {
        CanvasSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            owner: self.owner.clone(),
            created_at: self.created_at,
            modified_at: self.modified_at,
        }
    }
}

/// Listing entry without the element payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasSummary {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub created_at: u64,
    pub modified_at: u64,
}

/// Maps bearer credentials to user ids.
///
/// Issuing and validating real tokens is out of scope; this is the seam a
/// deployment would replace.
#[derive(Debug, Default)]
pub struct TokenRegistry {
    tokens: RwLock<HashMap<String, String>>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, token: impl Into<String>, user: impl Into<String>) -> StoreResult<()> {
        let mut tokens = self
            .tokens
            .write()
            .map_err(|e| StoreError::Other(format!("Lock error: {}", e)))?;
        tokens.insert(token.into(), user.into());
        Ok(())
    }

    /// Forget a token, e.g. on expiry. Later calls with it are unauthorized.
    pub fn revoke(&self, token: &str) -> StoreResult<()> {
        let mut tokens = self
            .tokens
            .write()
            .map_err(|e| StoreError::Other(format!("Lock error: {}", e)))?;
        tokens.remove(token);
        Ok(())
    }

    pub fn resolve(&self, token: &str) -> StoreResult<String> {
        let tokens = self
            .tokens
            .read()
            .map_err(|e| StoreError::Other(format!("Lock error: {}", e)))?;
        tokens.get(token).cloned().ok_or(StoreError::Unauthorized)
    }
}

/// Async persistence boundary for canvases.
pub trait DocumentStore: Send + Sync {
    /// Load the serialized elements of a canvas.
    fn load_elements(&self, canvas_id: &str, credential: &str) -> BoxFuture<'_, StoreResult<Value>>;

    /// Overwrite the elements of a canvas.
    fn save_elements(
        &self,
        canvas_id: &str,
        credential: &str,
        elements: &[ElementRecord],
    ) -> BoxFuture<'_, StoreResult<()>>;

    /// Create an empty canvas owned by the caller.
    fn create_canvas(&self, credential: &str, name: Option<&str>) -> BoxFuture<'_, StoreResult<CanvasDocument>>;

    /// Canvases the caller owns or that are shared with them.
    fn list_canvases(&self, credential: &str) -> BoxFuture<'_, StoreResult<Vec<CanvasSummary>>>;

    /// Rename a canvas. Owner or shared users.
    fn rename_canvas(&self, canvas_id: &str, credential: &str, name: &str) -> BoxFuture<'_, StoreResult<()>>;

    /// Replace the share list. Owner only.
    fn share_canvas(
        &self,
        canvas_id: &str,
        credential: &str,
        shared_with: Vec<String>,
    ) -> BoxFuture<'_, StoreResult<()>>;

    /// Delete a canvas. Owner only.
    fn delete_canvas(&self, canvas_id: &str, credential: &str) -> BoxFuture<'_, StoreResult<()>>;
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Newest first.
fn sort_summaries(summaries: &mut [CanvasSummary]) {
    summaries.sort_by(|a, b| b.modified_at.cmp(&a.modified_at).then_with(|| a.id.cmp(&b.id)));
}

#[cfg(test)]
pub(crate) fn block_on<F: std::future::Future>(f: F) -> F::Output {
    use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

    fn dummy_raw_waker() -> RawWaker {
        fn no_op(_: *const ()) {}
        fn clone(_: *const ()) -> RawWaker {
            dummy_raw_waker()
        }
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
        RawWaker::new(std::ptr::null(), &VTABLE)
    }

    let waker = unsafe { Waker::from_raw(dummy_raw_waker()) };
    let mut cx = Context::from_waker(&waker);
    let mut f = std::pin::pin!(f);

    loop {
        if let Poll::Ready(result) = f.as_mut().poll(&mut cx) {
            return result;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_defaults() {
        let doc = CanvasDocument::new("alice", None);
        assert_eq!(doc.name, DEFAULT_CANVAS_NAME);
        assert_eq!(doc.elements, Value::Array(Vec::new()));
        assert!(doc.shared_with.is_empty());
        assert_eq!(doc.created_at, doc.modified_at);

        let named = CanvasDocument::new("alice", Some("Plans"));
        assert_eq!(named.name, "Plans");
        assert_ne!(named.id, doc.id);
    }

    #[test]
    fn test_access_rules() {
        let mut doc = CanvasDocument::new("alice", None);
        doc.shared_with.push("bob".to_string());
        assert!(doc.check_access("alice").is_ok());
        assert!(doc.check_access("bob").is_ok());
        assert!(matches!(doc.check_access("carol"), Err(StoreError::Forbidden(_))));
        assert!(doc.check_owner("alice", "delete").is_ok());
        assert!(doc.check_owner("bob", "delete").is_err());
    }

    #[test]
    fn test_token_registry() {
        let tokens = TokenRegistry::new();
        tokens.register("t1", "alice").unwrap();
        assert_eq!(tokens.resolve("t1").unwrap(), "alice");
        tokens.revoke("t1").unwrap();
        assert_eq!(tokens.resolve("t1"), Err(StoreError::Unauthorized));
        assert!(StoreError::Unauthorized.is_auth());
        assert!(!StoreError::NotFound("x".into()).is_auth());
    }
}
