//! File-backed session store for the LearnPortal command-line client
//!
//! A browser keeps the session in tab-scoped storage. A terminal client has
//! no tab, so this crate keeps the same flat key/value record in a JSON file
//! and rewrites it on every change.
//!
//! # Example
//! ```no_run
//! # use learnportal_session_file::FileSessionStore;
//! # use learnportal_core::SessionStore;
//! # fn example() -> learnportal_core::Result<()> {
//! let store = FileSessionStore::open("~/.learnportal/session.json")?;
//! let token = store.get("access_token");
//! # Ok(())
//! # }
//! ```

mod file_store;

pub use file_store::FileSessionStore;
