//! In-memory document store.

use super::{
    sort_summaries, BoxFuture, CanvasDocument, CanvasSummary, DocumentStore, StoreError,
    StoreResult, TokenRegistry,
};
use crate::codec::ElementRecord;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory store for tests and ephemeral use.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<String, CanvasDocument>>,
    tokens: TokenRegistry,
}

impl MemoryDocumentStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `token` as a credential for `user`.
    pub fn register_token(&self, token: &str, user: &str) -> StoreResult<()> {
        self.tokens.register(token, user)
    }

    pub fn revoke_token(&self, token: &str) -> StoreResult<()> {
        self.tokens.revoke(token)
    }

    pub fn len(&self) -> usize {
        self.read().map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<String, CanvasDocument>>> {
        self.documents
            .read()
            .map_err(|e| StoreError::Other(format!("Lock error: {}", e)))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<String, CanvasDocument>>> {
        self.documents
            .write()
            .map_err(|e| StoreError::Other(format!("Lock error: {}", e)))
    }

    /// Resolve the caller and run `f` on the canvas under the write lock.
    fn with_document<T>(
        &self,
        canvas_id: &str,
        credential: &str,
        f: impl FnOnce(&str, &mut CanvasDocument) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let user = self.tokens.resolve(credential)?;
        let mut docs = self.write()?;
        let doc = docs
            .get_mut(canvas_id)
            .ok_or_else(|| StoreError::NotFound(canvas_id.to_string()))?;
        f(&user, doc)
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn load_elements(&self, canvas_id: &str, credential: &str) -> BoxFuture<'_, StoreResult<Value>> {
        let canvas_id = canvas_id.to_string();
        let credential = credential.to_string();
        Box::pin(async move {
            let user = self.tokens.resolve(&credential)?;
            let docs = self.read()?;
            let doc = docs
                .get(&canvas_id)
                .ok_or_else(|| StoreError::NotFound(canvas_id.clone()))?;
            doc.check_access(&user)?;
            Ok(doc.elements.clone())
        })
    }

    fn save_elements(
        &self,
        canvas_id: &str,
        credential: &str,
        elements: &[ElementRecord],
    ) -> BoxFuture<'_, StoreResult<()>> {
        let canvas_id = canvas_id.to_string();
        let credential = credential.to_string();
        let elements = elements.to_vec();
        Box::pin(async move {
            self.with_document(&canvas_id, &credential, |user, doc| {
                doc.check_access(user)?;
                doc.replace_elements(&elements)
            })
        })
    }

    fn create_canvas(&self, credential: &str, name: Option<&str>) -> BoxFuture<'_, StoreResult<CanvasDocument>> {
        let credential = credential.to_string();
        let name = name.map(str::to_string);
        Box::pin(async move {
            let user = self.tokens.resolve(&credential)?;
            let doc = CanvasDocument::new(user, name.as_deref());
            self.write()?.insert(doc.id.clone(), doc.clone());
            log::info!("Created canvas {} for {}", doc.id, doc.owner);
            Ok(doc)
        })
    }

    fn list_canvases(&self, credential: &str) -> BoxFuture<'_, StoreResult<Vec<CanvasSummary>>> {
        let credential = credential.to_string();
        Box::pin(async move {
            let user = self.tokens.resolve(&credential)?;
            let docs = self.read()?;
            let mut summaries: Vec<_> = docs
                .values()
                .filter(|doc| doc.can_access(&user))
                .map(CanvasDocument::summary)
                .collect();
            sort_summaries(&mut summaries);
            Ok(summaries)
        })
    }

    fn rename_canvas(&self, canvas_id: &str, credential: &str, name: &str) -> BoxFuture<'_, StoreResult<()>> {
        let canvas_id = canvas_id.to_string();
        let credential = credential.to_string();
        let name = name.to_string();
        Box::pin(async move {
            self.with_document(&canvas_id, &credential, |user, doc| {
                doc.check_access(user)?;
                if !name.trim().is_empty() {
                    doc.name = name;
                    doc.touch();
                }
                Ok(())
            })
        })
    }

    fn share_canvas(
        &self,
        canvas_id: &str,
        credential: &str,
        shared_with: Vec<String>,
    ) -> BoxFuture<'_, StoreResult<()>> {
        let canvas_id = canvas_id.to_string();
        let credential = credential.to_string();
        Box::pin(async move {
            self.with_document(&canvas_id, &credential, |user, doc| {
                doc.check_owner(user, "share")?;
                doc.shared_with = shared_with;
                doc.touch();
                Ok(())
            })
        })
    }

    fn delete_canvas(&self, canvas_id: &str, credential: &str) -> BoxFuture<'_, StoreResult<()>> {
        let canvas_id = canvas_id.to_string();
        let credential = credential.to_string();
        Box::pin(async move {
            let user = self.tokens.resolve(&credential)?;
            let mut docs = self.write()?;
            let doc = docs
                .get(&canvas_id)
                .ok_or_else(|| StoreError::NotFound(canvas_id.clone()))?;
            doc.check_owner(&user, "delete")?;
            docs.remove(&canvas_id);
            log::info!("Deleted canvas {}", canvas_id);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::serialize;
    use crate::element::{create_element, ElementKind, Style};
    use crate::storage::block_on;
    use kurbo::Point;

    fn store() -> MemoryDocumentStore {
        let store = MemoryDocumentStore::new();
        store.register_token("alice-token", "alice").unwrap();
        store.register_token("bob-token", "bob").unwrap();
        store
    }

    fn records() -> Vec<ElementRecord> {
        serialize(&[create_element(
            0,
            ElementKind::Line,
            Point::new(0.0, 0.0),
            Point::new(5.0, 5.0),
            Style::default(),
        )])
    }

    #[test]
    fn test_create_then_save_and_load() {
        let store = store();
        let doc = block_on(store.create_canvas("alice-token", None)).unwrap();
        assert_eq!(doc.owner, "alice");
        assert_eq!(block_on(store.load_elements(&doc.id, "alice-token")).unwrap(), Value::Array(vec![]));

        block_on(store.save_elements(&doc.id, "alice-token", &records())).unwrap();
        let loaded = block_on(store.load_elements(&doc.id, "alice-token")).unwrap();
        assert_eq!(loaded, serde_json::to_value(records()).unwrap());
    }

    #[test]
    fn test_not_found() {
        let store = store();
        let result = block_on(store.load_elements("missing", "alice-token"));
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_unknown_token_is_unauthorized() {
        let store = store();
        let doc = block_on(store.create_canvas("alice-token", None)).unwrap();
        store.revoke_token("alice-token").unwrap();
        let result = block_on(store.save_elements(&doc.id, "alice-token", &records()));
        assert_eq!(result, Err(StoreError::Unauthorized));
    }

    #[test]
    fn test_sharing_grants_access() {
        let store = store();
        let doc = block_on(store.create_canvas("alice-token", Some("Shared"))).unwrap();
        assert!(matches!(
            block_on(store.load_elements(&doc.id, "bob-token")),
            Err(StoreError::Forbidden(_))
        ));
        assert!(block_on(store.list_canvases("bob-token")).unwrap().is_empty());

        block_on(store.share_canvas(&doc.id, "alice-token", vec!["bob".to_string()])).unwrap();
        block_on(store.save_elements(&doc.id, "bob-token", &records())).unwrap();
        let listed = block_on(store.list_canvases("bob-token")).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Shared");

        // Shared users cannot reshare or delete.
        assert!(matches!(
            block_on(store.share_canvas(&doc.id, "bob-token", vec![])),
            Err(StoreError::Forbidden(_))
        ));
        assert!(matches!(
            block_on(store.delete_canvas(&doc.id, "bob-token")),
            Err(StoreError::Forbidden(_))
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_owner_deletes() {
        let store = store();
        let doc = block_on(store.create_canvas("alice-token", None)).unwrap();
        block_on(store.delete_canvas(&doc.id, "alice-token")).unwrap();
        assert!(store.is_empty());
        assert!(matches!(
            block_on(store.delete_canvas(&doc.id, "alice-token")),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_rename_ignores_blank_names() {
        let store = store();
        let doc = block_on(store.create_canvas("alice-token", Some("First"))).unwrap();
        block_on(store.rename_canvas(&doc.id, "alice-token", "  ")).unwrap();
        assert_eq!(block_on(store.list_canvases("alice-token")).unwrap()[0].name, "First");
        block_on(store.rename_canvas(&doc.id, "alice-token", "Second")).unwrap();
        assert_eq!(block_on(store.list_canvases("alice-token")).unwrap()[0].name, "Second");
    }
}
