//! Cache tree nodes and the platform-keyed JSON document

use super::{Cacheable, SharedCacheable};
use crate::error::{StrataError, StrataResult};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

/// Identifier of the slice this host reads and writes
pub fn platform_key() -> &'static str {
    std::env::consts::OS
}

/// Result of reading a cache document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The platform slice was found and distributed
    Loaded,
    /// The backing file does not exist yet
    NoFile,
    /// The file exists but holds no slice for this platform
    NoSlice,
}

/// A nestable state container
pub struct Cache {
    key: Option<String>,
    file: Option<PathBuf>,
    platform: String,
    registered: BTreeMap<String, SharedCacheable>,
    pending: Option<Map<String, Value>>,
}

impl Cache {
    /// Create a nested cache node registered under `key`
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            file: None,
            platform: platform_key().to_string(),
            registered: BTreeMap::new(),
            pending: None,
        }
    }

    /// Create a root cache backed by `file`
    pub fn with_file(file: impl Into<PathBuf>) -> Self {
        Self {
            key: None,
            file: Some(file.into()),
            platform: platform_key().to_string(),
            registered: BTreeMap::new(),
            pending: None,
        }
    }

    /// Read and write the slice of another platform
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    /// Wrap into a shared handle so the node can be registered with a parent
    pub fn shared(self) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(self))
    }

    pub fn is_registered(&self, key: &str) -> bool {
        self.registered.contains_key(key)
    }

    /// Register a child component.
    ///
    /// Fails if the child has no key or the key is already taken. A pending
    /// slice for the key is handed to the child and dropped from pending state.
    pub fn register<C: Cacheable + 'static>(&mut self, child: Rc<RefCell<C>>) -> StrataResult<()> {
        let key = child
            .borrow()
            .key()
            .map(str::to_string)
            .ok_or_else(|| {
                StrataError::CacheRegistration("cannot register a component without a key".into())
            })?;

        if self.registered.contains_key(&key) {
            return Err(StrataError::CacheRegistration(format!(
                "key '{}' is already registered",
                key
            )));
        }

        if let Some(slice) = self.pending.as_mut().and_then(|p| p.remove(&key)) {
            debug!("Restoring cached state for {}", key);
            child.borrow_mut().set_state(slice);
        }

        self.registered.insert(key, child);
        Ok(())
    }

    /// Load this platform's slice from the backing file
    pub fn load(&mut self) -> StrataResult<LoadOutcome> {
        let path = self.file.clone().ok_or(StrataError::CacheNoFile)?;
        self.load_from(&path)
    }

    /// Load this platform's slice from `path`
    pub fn load_from(&mut self, path: &Path) -> StrataResult<LoadOutcome> {
        if !path.exists() {
            debug!("Cache file {} not found", path.display());
            return Ok(LoadOutcome::NoFile);
        }

        let mut document = read_document(path)?;
        match document.remove(&self.platform) {
            Some(slice) => {
                self.set_state(slice);
                Ok(LoadOutcome::Loaded)
            }
            None => {
                debug!("No {} slice in {}", self.platform, path.display());
                Ok(LoadOutcome::NoSlice)
            }
        }
    }

    /// Save the live state into the backing file
    pub fn save(&self) -> StrataResult<()> {
        let path = self.file.clone().ok_or(StrataError::CacheNoFile)?;
        self.save_to(&path)
    }

    /// Replace this platform's slice in `path`, keeping every other slice
    pub fn save_to(&self, path: &Path) -> StrataResult<()> {
        let mut document = if path.exists() {
            read_document(path)?
        } else {
            Map::new()
        };
        document.insert(self.platform.clone(), self.state());

        let mut content = serde_json::to_string_pretty(&Value::Object(document))?;
        content.push('\n');
        fs::write(path, content)
            .map_err(|e| StrataError::io(format!("writing cache file {}", path.display()), e))?;

        debug!("Saved cache to {}", path.display());
        Ok(())
    }
}

impl Cacheable for Cache {
    fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    fn state(&self) -> Value {
        let state = self
            .registered
            .iter()
            .map(|(key, child)| (key.clone(), child.borrow().state()))
            .collect();
        Value::Object(state)
    }

    fn set_state(&mut self, state: Value) {
        let Value::Object(mut pending) = state else {
            self.pending = None;
            return;
        };

        for (key, child) in &self.registered {
            if let Some(slice) = pending.remove(key) {
                child.borrow_mut().set_state(slice);
            }
        }
        self.pending = Some(pending);
    }
}

fn read_document(path: &Path) -> StrataResult<Map<String, Value>> {
    let content = fs::read_to_string(path)
        .map_err(|e| StrataError::io(format!("reading cache file {}", path.display()), e))?;

    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(document)) => Ok(document),
        Ok(_) => Err(StrataError::CacheCorrupt {
            path: path.to_path_buf(),
            reason: "top level is not an object".to_string(),
        }),
        Err(e) => Err(StrataError::CacheCorrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}
