//! File-backed document store.

use super::{
    sort_summaries, BoxFuture, CanvasDocument, CanvasSummary, DocumentStore, StoreError,
    StoreResult, TokenRegistry,
};
use crate::codec::ElementRecord;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Stores each canvas as a JSON file in a directory.
///
/// Credentials are resolved through an in-process [`TokenRegistry`].
pub struct FileDocumentStore {
    /// Base directory for canvas files.
    base_path: PathBuf,
    tokens: TokenRegistry,
}

impl FileDocumentStore {
    /// Create a store rooted at `base_path`, creating the directory if needed.
    pub fn new(base_path: PathBuf) -> StoreResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StoreError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self {
            base_path,
            tokens: TokenRegistry::new(),
        })
    }

    /// Create a store in the default location.
    ///
    /// On Unix: `~/.local/share/inkboard/canvases/`
    /// On Windows: `%LOCALAPPDATA%\inkboard\canvases\`
    pub fn default_location() -> StoreResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StoreError::Io("Could not determine home directory".to_string()))?;
        Self::new(base.join("inkboard").join("canvases"))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Accept `token` as a credential for `user`.
    pub fn register_token(&self, token: &str, user: &str) -> StoreResult<()> {
        self.tokens.register(token, user)
    }

    pub fn revoke_token(&self, token: &str) -> StoreResult<()> {
        self.tokens.revoke(token)
    }

    fn document_path(&self, id: &str) -> PathBuf {
        let safe_id: String = id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_path.join(format!("{}.json", safe_id))
    }

    fn read_document(path: &Path, id: &str) -> StoreResult<CanvasDocument> {
        if !path.exists() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        let json = fs::read_to_string(path)
            .map_err(|e| StoreError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&json).map_err(|e| {
            StoreError::Serialization(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Read the file for `canvas_id`, rejecting a different canvas whose id
    /// sanitizes to the same file name.
    fn read_canvas(&self, canvas_id: &str) -> StoreResult<CanvasDocument> {
        let doc = Self::read_document(&self.document_path(canvas_id), canvas_id)?;
        if doc.id != canvas_id {
            log::warn!("Canvas id {} resolved to file of canvas {}", canvas_id, doc.id);
            return Err(StoreError::NotFound(canvas_id.to_string()));
        }
        Ok(doc)
    }

    fn write_document(&self, doc: &CanvasDocument) -> StoreResult<()> {
        let path = self.document_path(&doc.id);
        let json = serde_json::to_string_pretty(doc)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        fs::write(&path, json)
            .map_err(|e| StoreError::Io(format!("Failed to write {}: {}", path.display(), e)))
    }

    /// Resolve the caller, load the canvas, apply `f` and write it back.
    fn update<T>(
        &self,
        canvas_id: &str,
        credential: &str,
        f: impl FnOnce(&str, &mut CanvasDocument) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let user = self.tokens.resolve(credential)?;
        let mut doc = self.read_canvas(canvas_id)?;
        let out = f(&user, &mut doc)?;
        self.write_document(&doc)?;
        Ok(out)
    }
}

impl DocumentStore for FileDocumentStore {
    fn load_elements(&self, canvas_id: &str, credential: &str) -> BoxFuture<'_, StoreResult<Value>> {
        let canvas_id = canvas_id.to_string();
        let credential = credential.to_string();
        Box::pin(async move {
            let user = self.tokens.resolve(&credential)?;
            let doc = self.read_canvas(&canvas_id)?;
            doc.check_access(&user)?;
            Ok(doc.elements)
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
            self.update(&canvas_id, &credential, |user, doc| {
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
            self.write_document(&doc)?;
            log::info!("Created canvas {} in {}", doc.id, self.base_path.display());
            Ok(doc)
        })
    }

    fn list_canvases(&self, credential: &str) -> BoxFuture<'_, StoreResult<Vec<CanvasSummary>>> {
        let credential = credential.to_string();
        Box::pin(async move {
            let user = self.tokens.resolve(&credential)?;
            let entries = fs::read_dir(&self.base_path)
                .map_err(|e| StoreError::Io(format!("Failed to read directory: {}", e)))?;

            let mut summaries = Vec::new();
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_none_or(|ext| ext != "json") {
                    continue;
                }
                let id = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or_default()
                    .to_string();
                match Self::read_document(&path, &id) {
                    Ok(doc) if doc.can_access(&user) => summaries.push(doc.summary()),
                    Ok(_) => {}
                    Err(e) => log::warn!("Skipping unreadable canvas file {}: {}", path.display(), e),
                }
            }
            sort_summaries(&mut summaries);
            Ok(summaries)
        })
    }

    fn rename_canvas(&self, canvas_id: &str, credential: &str, name: &str) -> BoxFuture<'_, StoreResult<()>> {
        let canvas_id = canvas_id.to_string();
        let credential = credential.to_string();
        let name = name.to_string();
        Box::pin(async move {
            self.update(&canvas_id, &credential, |user, doc| {
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
            self.update(&canvas_id, &credential, |user, doc| {
                doc.check_owner(user, "share")?;
                doc.shared_with = shared_with;
                doc.touch();
                Ok(())
            })
        })
    }

    fn delete_canvas(&self, canvas_id: &str, credential: &str) -> BoxFuture<'_, StoreResult<()>> {
        let path = self.document_path(canvas_id);
        let canvas_id = canvas_id.to_string();
        let credential = credential.to_string();
        Box::pin(async move {
            let user = self.tokens.resolve(&credential)?;
            let doc = self.read_canvas(&canvas_id)?;
            doc.check_owner(&user, "delete")?;
            fs::remove_file(&path).map_err(|e| {
                StoreError::Io(format!("Failed to delete {}: {}", path.display(), e))
            })?;
            log::info!("Deleted canvas {}", canvas_id);
            Ok(())
        })
    }
}
