//! Global application state shared across all routes.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::auth::UserStore;
use crate::core::config::{AppPaths, Settings};
use crate::core::errors::ChatError;
use crate::history::HistoryStore;
use crate::llm::{GroqProvider, LlmProvider};
use crate::pipeline::ChatPipeline;
use crate::rag::{Embedder, VectorIndex};
use crate::search::{HttpSearchProvider, WebSearch};
use crate::translate::{GoogleTranslator, Translator};

pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub settings: Settings,
    pub users: UserStore,
    pub history: Arc<HistoryStore>,
    pub embedder: Arc<dyn Embedder>,
    /// `None` until credentials are provided; chat is blocked until then.
    pipeline: Option<Arc<ChatPipeline>>,
    /// Active knowledge base. Rebuilds swap the `Arc` wholesale, so queries
    /// holding the previous index complete against it unaffected.
    index: RwLock<Option<Arc<VectorIndex>>>,
}

impl AppState {
    pub fn initialize() -> Result<Arc<Self>, ChatError> {
        let paths = Arc::new(AppPaths::new());
        let settings = Settings::load(&paths)?;
        Self::with_parts(paths, settings)
    }

    /// Build state from explicit parts. Tests use this with a temp dir.
    pub fn with_parts(paths: Arc<AppPaths>, settings: Settings) -> Result<Arc<Self>, ChatError> {
        let users = UserStore::new(paths.users_path.clone());
        let history = Arc::new(HistoryStore::new(paths.chat_history_dir.clone()));
        let embedder = default_embedder()?;

        let pipeline = match GroqProvider::new(&settings.llm, settings.api_key()) {
            Ok(provider) => {
                let llm: Arc<dyn LlmProvider> = Arc::new(provider);
                let search: Arc<dyn WebSearch> =
                    Arc::new(HttpSearchProvider::new(settings.search.clone()));
                let translator: Arc<dyn Translator> = Arc::new(GoogleTranslator::new());
                Some(Arc::new(ChatPipeline::new(
                    llm,
                    embedder.clone(),
                    search,
                    translator,
                    history.clone(),
                    settings.rag.retrieval_top_k,
                    settings.search.result_count,
                )))
            }
            Err(e) => {
                tracing::warn!("chat disabled: {}", e);
                None
            }
        };

        Ok(Arc::new(Self {
            paths,
            settings,
            users,
            history,
            embedder,
            pipeline,
            index: RwLock::new(None),
        }))
    }

    /// The chat pipeline, or `ModelInit` while credentials are missing.
    pub fn pipeline(&self) -> Result<Arc<ChatPipeline>, ChatError> {
        self.pipeline.clone().ok_or_else(|| {
            ChatError::ModelInit(
                "Groq API key is missing; set GROQ_API_KEY or llm.api_key in config.json"
                    .to_string(),
            )
        })
    }

    /// Snapshot of the active index for one query.
    pub async fn active_index(&self) -> Option<Arc<VectorIndex>> {
        self.index.read().await.clone()
    }

    /// Atomically replace the active index with a freshly built one.
    pub async fn replace_index(&self, index: VectorIndex) {
        *self.index.write().await = Some(Arc::new(index));
    }
}

#[cfg(feature = "local-embeddings")]
fn default_embedder() -> Result<Arc<dyn Embedder>, ChatError> {
    use crate::rag::embedder::FastembedEmbedder;
    Ok(Arc::new(FastembedEmbedder::new()?))
}

#[cfg(not(feature = "local-embeddings"))]
fn default_embedder() -> Result<Arc<dyn Embedder>, ChatError> {
    use crate::rag::embedder::HashingEmbedder;
    Ok(Arc::new(HashingEmbedder::new()))
}
