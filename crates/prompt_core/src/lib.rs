//! Core types for the prompt optimizer: the prompt version tree and the
//! critique-to-revision protocol.
//!
//! This crate is pure bookkeeping — no I/O, no logging, no async. The
//! surrounding layers (storage, model client, CLI) live in their own
//! crates and only exchange data with this one.

pub mod revise;
pub mod tree;

pub use revise::{build_revision_request, interpret_response, ReviseError};
pub use revise::{RESPONSE_TEMPERATURE, REVISION_TEMPERATURE};
pub use tree::{PromptNode, PromptTree, TreeError};
