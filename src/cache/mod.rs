//! Hierarchical persisted state
//!
//! A [`Cache`] is a named node that other [`Cacheable`] components register
//! with, including nested caches. The whole tree serializes into a single
//! JSON document keyed by host platform:
//!
//! ```text
//! Cache(root) ── configure.json
//! ├── OptionBag("general")
//! └── Cache("dependencies")
//!     ├── OptionBag("libbar")
//!     └── OptionBag("schemas")
//! ```
//!
//! State read from disk before a component registers is kept as pending
//! state and handed over when the matching key registers, so load order
//! and registration order are independent.

mod tree;

pub use tree::{platform_key, Cache, LoadOutcome};

use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// Shared handle to a registered component
pub type SharedCacheable = Rc<RefCell<dyn Cacheable>>;

/// A component whose state can be persisted in a [`Cache`]
pub trait Cacheable {
    /// Key under which this component is stored by its parent
    fn key(&self) -> Option<&str>;

    /// Serializable snapshot of the current state
    fn state(&self) -> Value;

    /// Install previously persisted state
    fn set_state(&mut self, state: Value);
}
