//! VBE Variable Store
//!
//! Scoped key-path variable storage for branching conversations.
//!
//! # Core Concepts
//!
//! - [`VariableStore`]: The live store; get/set/increment/delete per [`Scope`]
//! - [`VarPath`]: Normalized dotted path (`a.b[2]` becomes `a.b.2`)
//! - [`ScopedState`]: Serializable state of all four scopes
//! - [`ChangeLedger`]: Bounded record of mutations since the last restore
//!
//! # Example
//!
//! ```rust
//! use vbe_store::{Scope, VariableStore};
//! use serde_json::json;
//!
//! let mut store = VariableStore::new();
//! store.set(Scope::Global, "player.affinity", json!(3));
//! store.increment(Scope::Global, "player.affinity", 2);
//!
//! assert_eq!(store.get(Scope::Global, "player.affinity"), Some(&json!(5)));
//! assert_eq!(store.history().len(), 2);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

// Core modules
mod ledger;
mod path;
mod scope;
mod store;
pub mod value;

// Re-exports
pub use ledger::{
    ChangeLedger, ChangeRecord, Operation, DEFAULT_LEDGER_CAPACITY, DEFAULT_LEDGER_RETAIN,
};
pub use path::{PathError, VarPath};
pub use scope::{Scope, ScopedState, UnknownScope};
pub use store::{flatten, VariableStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
