//! Workbench - the glue between the prompt tree, the model client and
//! session storage.
//!
//! Serializes every user action as request -> mutate -> persist: storage
//! is only written after a mutation succeeded in memory, so a failed
//! generation or an empty revision never leaves a half-applied state
//! behind, in memory or on disk.

use std::sync::Arc;

use gemini_client::{GenerationError, TextGenerator};
use prompt_core::{
    build_revision_request, interpret_response, PromptNode, PromptTree, ReviseError, TreeError,
    RESPONSE_TEMPERATURE, REVISION_TEMPERATURE,
};
use session_store::{SessionStore, StoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkbenchError {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Revise(#[from] ReviseError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("session has no prompt yet")]
    NoCurrentPrompt,

    #[error("current prompt has no response yet")]
    MissingResponse,
}

pub type Result<T> = std::result::Result<T, WorkbenchError>;

/// One open session: the loaded tree plus the collaborators needed to
/// grow it. Model ids may change per session at any time; nodes never
/// record which model produced their response.
pub struct Workbench<S: SessionStore> {
    store: Arc<S>,
    generator: Arc<dyn TextGenerator>,
    session_id: i64,
    tree: PromptTree,
    pub target_model: String,
    pub aligning_model: String,
}

impl<S: SessionStore> Workbench<S> {
    /// Create a new named session with an empty tree.
    pub async fn create(
        store: Arc<S>,
        generator: Arc<dyn TextGenerator>,
        name: &str,
        target_model: impl Into<String>,
        aligning_model: impl Into<String>,
    ) -> Result<Self> {
        let tree = PromptTree::new();
        let session_id = store.create_session(name, &tree).await?;
        Ok(Self {
            store,
            generator,
            session_id,
            tree,
            target_model: target_model.into(),
            aligning_model: aligning_model.into(),
        })
    }

    /// Open an existing session from its last saved snapshot.
    pub async fn open(
        store: Arc<S>,
        generator: Arc<dyn TextGenerator>,
        session_id: i64,
        target_model: impl Into<String>,
        aligning_model: impl Into<String>,
    ) -> Result<Self> {
        let tree = store.load_session(session_id).await?;
        Ok(Self {
            store,
            generator,
            session_id,
            tree,
            target_model: target_model.into(),
            aligning_model: aligning_model.into(),
        })
    }

    pub fn session_id(&self) -> i64 {
        self.session_id
    }

    pub fn tree(&self) -> &PromptTree {
        &self.tree
    }

    pub fn current(&self) -> Option<&PromptNode> {
        self.tree.get_current()
    }

    pub fn versions(&self) -> Vec<(String, usize)> {
        self.tree.list_versions()
    }

    /// Submit the initial prompt for this session.
    pub async fn start(&mut self, prompt_text: &str) -> Result<String> {
        let id = self.tree.create_root(prompt_text)?;
        self.save().await?;
        Ok(id)
    }

    /// Generate the response for the current prompt if it does not have
    /// one yet. Returns whether a generation happened.
    ///
    /// On failure the node keeps its absent response and stays eligible
    /// for another attempt.
    pub async fn ensure_response(&mut self) -> Result<bool> {
        let current = self.current().ok_or(WorkbenchError::NoCurrentPrompt)?;
        if current.has_response() {
            return Ok(false);
        }

        let node_id = current.id.clone();
        let prompt_text = current.prompt_text.clone();
        let response = self
            .generator
            .generate(&self.target_model, &prompt_text, RESPONSE_TEMPERATURE)
            .await?;

        self.tree.set_response(&node_id, response)?;
        self.save().await?;
        Ok(true)
    }

    /// Turn a critique of the current response into a new prompt version
    /// and make it current. The current node must already carry a
    /// response.
    pub async fn refine(&mut self, critique: &str) -> Result<String> {
        let current = self.current().ok_or(WorkbenchError::NoCurrentPrompt)?;
        let response_text = current
            .response_text
            .clone()
            .ok_or(WorkbenchError::MissingResponse)?;
        let parent_id = current.id.clone();
        let prompt_text = current.prompt_text.clone();

        let request = build_revision_request(&prompt_text, &response_text, critique);
        let raw = self
            .generator
            .generate(&self.aligning_model, &request, REVISION_TEMPERATURE)
            .await?;
        let new_prompt = interpret_response(&raw)?;

        let id = self.tree.add_revision(&parent_id, critique, new_prompt)?;
        self.save().await?;
        Ok(id)
    }

    /// Move the cursor to a historical version and persist the move.
    pub async fn select(&mut self, node_id: &str) -> Result<()> {
        self.tree.set_current(node_id)?;
        self.save().await?;
        Ok(())
    }

    async fn save(&self) -> Result<()> {
        self.store.save_session(self.session_id, &self.tree).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockall::mock;
    use session_store::SqliteSessionStore;
    use tempfile::tempdir;

    mock! {
        Generator {}

        #[async_trait]
        impl TextGenerator for Generator {
            async fn generate(
                &self,
                model: &str,
                prompt: &str,
                temperature: f32,
            ) -> gemini_client::Result<String>;
        }
    }

    async fn new_store() -> (tempfile::TempDir, Arc<SqliteSessionStore>) {
        let dir = tempdir().expect("temp dir");
        let store = Arc::new(SqliteSessionStore::new(dir.path().join("sessions.db")));
        store.init().await.expect("init store");
        (dir, store)
    }

    #[tokio::test]
    async fn ensure_response_generates_once_with_target_model() {
        let (_dir, store) = new_store().await;
        let mut generator = MockGenerator::new();
        generator
            .expect_generate()
            .withf(|model, prompt, _| {
                model == "gemini-2.5-pro" && prompt == "Write a poem about the sea"
            })
            .times(1)
            .returning(|_, _, _| Ok("Waves crash...".to_string()));

        let mut bench = Workbench::create(
            store,
            Arc::new(generator),
            "poem",
            "gemini-2.5-pro",
            "gemini-2.5-flash",
        )
        .await
        .expect("create");

        bench.start("Write a poem about the sea").await.expect("start");

        assert!(bench.ensure_response().await.expect("generate"));
        assert_eq!(
            bench.current().unwrap().response_text.as_deref(),
            Some("Waves crash...")
        );

        // Second call is a no-op, not a regeneration
        assert!(!bench.ensure_response().await.expect("no-op"));
    }

    #[tokio::test]
    async fn failed_generation_leaves_node_eligible_for_retry() {
        let (_dir, store) = new_store().await;
        let mut generator = MockGenerator::new();
        let mut call = 0;
        generator.expect_generate().times(2).returning(move |_, _, _| {
            call += 1;
            if call == 1 {
                Err(GenerationError::Api("HTTP 500".to_string()))
            } else {
                Ok("second try".to_string())
            }
        });

        let mut bench = Workbench::create(
            store,
            Arc::new(generator),
            "retry",
            "gemini-2.5-pro",
            "gemini-2.5-flash",
        )
        .await
        .expect("create");
        bench.start("prompt").await.expect("start");

        let error = bench.ensure_response().await.expect_err("first attempt fails");
        assert!(matches!(error, WorkbenchError::Generation(_)));
        assert!(bench.current().unwrap().response_text.is_none());

        // The node is still response-less, so generation can run again
        assert!(bench.ensure_response().await.expect("retry succeeds"));
        assert_eq!(
            bench.current().unwrap().response_text.as_deref(),
            Some("second try")
        );
    }

    #[tokio::test]
    async fn refine_branches_with_aligning_model() {
        let (_dir, store) = new_store().await;
        let mut generator = MockGenerator::new();
        generator
            .expect_generate()
            .withf(|model, prompt, temperature| {
                model == "gemini-2.5-flash"
                    && prompt.contains("Write a poem about the sea")
                    && prompt.contains("Waves crash...")
                    && prompt.contains("make it rhyme")
                    && (*temperature - 0.2).abs() < f32::EPSILON
            })
            .times(1)
            .returning(|_, _, _| Ok("\nWrite a rhyming poem about the sea\n".to_string()));

        let mut bench = Workbench::create(
            store.clone(),
            Arc::new(generator),
            "poem",
            "gemini-2.5-pro",
            "gemini-2.5-flash",
        )
        .await
        .expect("create");

        let root = bench.start("Write a poem about the sea").await.expect("start");
        bench
            .tree
            .set_response(&root, "Waves crash...")
            .expect("seed response");

        let child = bench.refine("make it rhyme").await.expect("refine");

        assert_ne!(child, root);
        assert_eq!(bench.tree().current_id(), Some(child.as_str()));
        assert_eq!(
            bench.current().unwrap().prompt_text,
            "Write a rhyming poem about the sea"
        );

        // Persisted: a reload sees the new branch
        let reloaded = store.load_session(bench.session_id()).await.expect("reload");
        assert_eq!(reloaded.get(&root).unwrap().children, vec![child.clone()]);
        assert_eq!(
            reloaded.get(&root).unwrap().critiques.get(&child).map(String::as_str),
            Some("make it rhyme")
        );
    }

    #[tokio::test]
    async fn whitespace_revision_leaves_tree_untouched() {
        let (_dir, store) = new_store().await;
        let mut generator = MockGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_, _, _| Ok("   ".to_string()));

        let mut bench = Workbench::create(
            store,
            Arc::new(generator),
            "poem",
            "gemini-2.5-pro",
            "gemini-2.5-flash",
        )
        .await
        .expect("create");

        let root = bench.start("prompt").await.expect("start");
        bench.tree.set_response(&root, "response").expect("seed response");

        let error = bench.refine("critique").await.expect_err("empty revision");
        assert!(matches!(
            error,
            WorkbenchError::Revise(ReviseError::EmptyRevision)
        ));
        assert_eq!(bench.tree().len(), 1);
        assert_eq!(bench.tree().current_id(), Some(root.as_str()));
        assert!(bench.current().unwrap().children.is_empty());
    }

    #[tokio::test]
    async fn refine_requires_a_response() {
        let (_dir, store) = new_store().await;
        let mut bench = Workbench::create(
            store,
            Arc::new(MockGenerator::new()),
            "poem",
            "gemini-2.5-pro",
            "gemini-2.5-flash",
        )
        .await
        .expect("create");

        bench.start("prompt").await.expect("start");

        let error = bench.refine("critique").await.expect_err("no response yet");
        assert!(matches!(error, WorkbenchError::MissingResponse));
    }

    #[tokio::test]
    async fn select_persists_the_cursor_move() {
        let (_dir, store) = new_store().await;
        let mut bench = Workbench::create(
            store.clone(),
            Arc::new(MockGenerator::new()),
            "poem",
            "gemini-2.5-pro",
            "gemini-2.5-flash",
        )
        .await
        .expect("create");

        let root = bench.start("prompt").await.expect("start");
        bench.tree.set_response(&root, "response").expect("seed response");
        let child = bench
            .tree
            .add_revision(&root, "critique", "revised")
            .expect("branch");

        bench.select(&root).await.expect("select root");
        assert_eq!(bench.tree().current_id(), Some(root.as_str()));

        let reloaded = store.load_session(bench.session_id()).await.expect("reload");
        assert_eq!(reloaded.current_id(), Some(root.as_str()));
        assert!(reloaded.get(&child).is_some());
    }

    #[tokio::test]
    async fn reopening_a_session_restores_the_tree() {
        let (_dir, store) = new_store().await;
        let session_id;
        let root;
        {
            let mut bench = Workbench::create(
                store.clone(),
                Arc::new(MockGenerator::new()),
                "poem",
                "gemini-2.5-pro",
                "gemini-2.5-flash",
            )
            .await
            .expect("create");
            session_id = bench.session_id();
            root = bench.start("prompt").await.expect("start");
        }

        let bench = Workbench::open(
            store,
            Arc::new(MockGenerator::new()),
            session_id,
            "gemini-2.5-pro",
            "gemini-2.5-flash",
        )
        .await
        .expect("open");

        assert_eq!(bench.tree().root_id(), Some(root.as_str()));
        assert_eq!(bench.current().unwrap().prompt_text, "prompt");
    }
}
