//! PromptTree - the branching version history of one prompt.
//!
//! Every critique produces a new child node; nothing is ever deleted or
//! rewritten. A node's response is write-once, its children and critiques
//! grow by append only.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TreeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("node not found: {0}")]
    NotFound(String),

    #[error("response already set for node {0}")]
    AlreadySet(String),
}

pub type Result<T> = std::result::Result<T, TreeError>;

/// One version of the prompt.
///
/// Immutable after creation except for the write-once `response_text` and
/// the append-only `children`/`critiques`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptNode {
    /// 16 hex chars from 8 cryptographically random bytes
    pub id: String,

    #[serde(rename = "prompt")]
    pub prompt_text: String,

    #[serde(rename = "response")]
    pub response_text: Option<String>,

    /// Parent node id, absent only for the root
    pub parent: Option<String>,

    /// Child node ids in creation order
    pub children: Vec<String>,

    /// Child node id -> the critique that produced that child
    pub critiques: HashMap<String, String>,

    /// Creation counter within the tree; version number is `seq + 1`
    #[serde(default)]
    pub seq: u64,
}

impl PromptNode {
    fn new(id: String, prompt_text: String, parent: Option<String>, seq: u64) -> Self {
        Self {
            id,
            prompt_text,
            response_text: None,
            parent,
            children: Vec::new(),
            critiques: HashMap::new(),
            seq,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn has_response(&self) -> bool {
        self.response_text.is_some()
    }
}

/// The full version history for one session.
///
/// Serializes to the session snapshot shape: a `history` map keyed by node
/// id plus the root and current pointers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptTree {
    #[serde(rename = "history")]
    nodes: HashMap<String, PromptNode>,

    #[serde(rename = "root_prompt_id")]
    root_id: Option<String>,

    #[serde(rename = "current_prompt_id")]
    current_id: Option<String>,

    #[serde(default)]
    next_seq: u64,
}

impl PromptTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn root_id(&self) -> Option<&str> {
        self.root_id.as_deref()
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current_id.as_deref()
    }

    pub fn get(&self, node_id: &str) -> Option<&PromptNode> {
        self.nodes.get(node_id)
    }

    /// Create the first prompt version. A session supports exactly one
    /// root; starting over requires a new session.
    pub fn create_root(&mut self, prompt_text: impl Into<String>) -> Result<String> {
        let prompt_text = prompt_text.into();
        if prompt_text.trim().is_empty() {
            return Err(TreeError::InvalidInput("prompt text is empty".to_string()));
        }
        if self.root_id.is_some() {
            return Err(TreeError::InvalidInput(
                "tree already has a root prompt".to_string(),
            ));
        }

        let id = self.fresh_id();
        let seq = self.next_seq;
        self.next_seq += 1;
        self.nodes
            .insert(id.clone(), PromptNode::new(id.clone(), prompt_text, None, seq));
        self.root_id = Some(id.clone());
        self.current_id = Some(id.clone());
        Ok(id)
    }

    /// Attach the model's response to a node. Write-once: a second call
    /// for the same node fails with `AlreadySet`.
    pub fn set_response(&mut self, node_id: &str, response_text: impl Into<String>) -> Result<()> {
        let node = self
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| TreeError::NotFound(node_id.to_string()))?;
        if node.response_text.is_some() {
            return Err(TreeError::AlreadySet(node_id.to_string()));
        }
        node.response_text = Some(response_text.into());
        Ok(())
    }

    /// Branch a new prompt version off `parent_id` and make it current.
    ///
    /// All validation happens before any mutation, so a failure leaves the
    /// tree exactly as it was.
    pub fn add_revision(
        &mut self,
        parent_id: &str,
        critique_text: impl Into<String>,
        new_prompt_text: impl Into<String>,
    ) -> Result<String> {
        let critique_text = critique_text.into();
        let new_prompt_text = new_prompt_text.into();

        if !self.nodes.contains_key(parent_id) {
            return Err(TreeError::NotFound(parent_id.to_string()));
        }
        if critique_text.trim().is_empty() {
            return Err(TreeError::InvalidInput("critique is empty".to_string()));
        }
        if new_prompt_text.trim().is_empty() {
            return Err(TreeError::InvalidInput(
                "revised prompt is empty".to_string(),
            ));
        }

        let id = self.fresh_id();
        let seq = self.next_seq;
        self.next_seq += 1;

        if let Some(parent) = self.nodes.get_mut(parent_id) {
            parent.children.push(id.clone());
            parent.critiques.insert(id.clone(), critique_text);
        }

        self.nodes.insert(
            id.clone(),
            PromptNode::new(id.clone(), new_prompt_text, Some(parent_id.to_string()), seq),
        );
        self.current_id = Some(id.clone());
        Ok(id)
    }

    /// Move the cursor to a historical version without altering structure.
    pub fn set_current(&mut self, node_id: &str) -> Result<()> {
        if !self.nodes.contains_key(node_id) {
            return Err(TreeError::NotFound(node_id.to_string()));
        }
        self.current_id = Some(node_id.to_string());
        Ok(())
    }

    pub fn get_current(&self) -> Option<&PromptNode> {
        self.current_id.as_deref().and_then(|id| self.nodes.get(id))
    }

    /// All versions newest first, paired with their display version
    /// number (most recently created = highest). Derived on demand from
    /// the per-node creation counter, never stored.
    pub fn list_versions(&self) -> Vec<(String, usize)> {
        let mut versions: Vec<(String, u64)> = self
            .nodes
            .values()
            .map(|node| (node.id.clone(), node.seq))
            .collect();
        versions.sort_by(|a, b| b.1.cmp(&a.1));
        versions
            .into_iter()
            .map(|(id, seq)| (id, seq as usize + 1))
            .collect()
    }

    /// Display version number for one node, if present.
    pub fn version_of(&self, node_id: &str) -> Option<usize> {
        self.nodes.get(node_id).map(|node| node.seq as usize + 1)
    }

    fn fresh_id(&self) -> String {
        loop {
            let mut bytes = [0u8; 8];
            OsRng.fill_bytes(&mut bytes);
            let id = hex::encode(bytes);
            if !self.nodes.contains_key(&id) {
                return id;
            }
        }
    }
}
