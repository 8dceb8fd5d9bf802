//! Collaborators the game talks to, built once at startup and passed in explicitly.

use crate::cue::{CueSink, SilentCues};
use crate::llm::{LlmConfig, LlmManager, SolutionJudge};
use crate::puzzle::PuzzleLibrary;
use crate::settings::{ServerConfig, Settings, SettingsError, SettingsStore};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

pub struct Services {
    pub settings: Mutex<SettingsStore>,
    pub library: Mutex<PuzzleLibrary>,
    /// Environment config before stored settings are applied
    pub env_llm_config: LlmConfig,
    pub llm_config: RwLock<LlmConfig>,
    pub llm: RwLock<Option<Arc<LlmManager>>>,
    pub judge: RwLock<Option<Arc<dyn SolutionJudge>>>,
    pub cues: Arc<dyn CueSink>,
}

fn build_llm(config: &LlmConfig) -> (Option<Arc<LlmManager>>, Option<Arc<dyn SolutionJudge>>) {
    let manager = match config.build_manager() {
        Ok(manager) => {
            tracing::info!("LLM providers initialized successfully");
            Some(Arc::new(manager))
        }
        Err(e) => {
            tracing::warn!(
                "Failed to initialize LLM providers: {}. Puzzle generation will not be available.",
                e
            );
            None
        }
    };
    let judge = config.build_judge().map(|j| Arc::new(j) as Arc<dyn SolutionJudge>);
    if judge.is_none() {
        tracing::info!("No OpenAI key, spoken solves disabled");
    }
    (manager, judge)
}

impl Services {
    /// Load settings and the puzzle library from the data dir and connect providers
    pub fn init(config: &ServerConfig, env_llm_config: LlmConfig, cues: Arc<dyn CueSink>) -> Self {
        let store = SettingsStore::load(config.settings_path());
        let library = PuzzleLibrary::load(config.puzzles_path());

        let mut llm_config = env_llm_config.clone();
        store.get().apply_to(&mut llm_config);
        let (llm, judge) = build_llm(&llm_config);

        Self {
            settings: Mutex::new(store),
            library: Mutex::new(library),
            env_llm_config,
            llm_config: RwLock::new(llm_config),
            llm: RwLock::new(llm),
            judge: RwLock::new(judge),
            cues,
        }
    }

    /// No files, no providers, silent cues
    pub fn in_memory() -> Self {
        Self {
            settings: Mutex::new(SettingsStore::in_memory()),
            library: Mutex::new(PuzzleLibrary::in_memory()),
            env_llm_config: LlmConfig::default(),
            llm_config: RwLock::new(LlmConfig::default()),
            llm: RwLock::new(None),
            judge: RwLock::new(None),
            cues: Arc::new(SilentCues),
        }
    }

    pub fn with_llm(self, manager: LlmManager) -> Self {
        Self {
            llm: RwLock::new(Some(Arc::new(manager))),
            ..self
        }
    }

    pub fn with_judge(self, judge: Arc<dyn SolutionJudge>) -> Self {
        Self {
            judge: RwLock::new(Some(judge)),
            ..self
        }
    }

    pub fn with_cues(self, cues: Arc<dyn CueSink>) -> Self {
        Self { cues, ..self }
    }

    pub async fn settings(&self) -> Settings {
        self.settings.lock().await.get().clone()
    }

    /// Persist new settings and reconnect providers with them
    pub async fn save_settings(&self, settings: Settings) -> Result<Settings, SettingsError> {
        let saved = self.settings.lock().await.save(settings)?.clone();

        let mut llm_config = self.env_llm_config.clone();
        saved.apply_to(&mut llm_config);
        let (llm, judge) = build_llm(&llm_config);
        *self.llm_config.write().await = llm_config;
        *self.llm.write().await = llm;
        *self.judge.write().await = judge;

        Ok(saved)
    }

    pub async fn llm(&self) -> Option<Arc<LlmManager>> {
        self.llm.read().await.clone()
    }

    pub async fn judge(&self) -> Option<Arc<dyn SolutionJudge>> {
        self.judge.read().await.clone()
    }

    /// Flush what needs flushing at shutdown
    pub async fn teardown(&self) {
        if let Err(e) = self.library.lock().await.save() {
            tracing::error!("Failed to save puzzle library on shutdown: {}", e);
        }
        *self.llm.write().await = None;
        *self.judge.write().await = None;
        tracing::info!("Services torn down");
    }
}
