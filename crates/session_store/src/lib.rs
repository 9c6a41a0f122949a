//! Session persistence for the prompt optimizer.
//!
//! A session is a named row holding the full JSON snapshot of its
//! [`PromptTree`]. Every mutation in the application rewrites the whole
//! snapshot (last writer wins); there is no delta persistence and no
//! crash recovery beyond reloading the last saved snapshot.

mod error;
mod store;

pub use error::{Result, StoreError};
pub use store::{SessionStore, SessionSummary, SqliteSessionStore};
