pub mod alignment;
pub mod db;
pub mod error;
pub mod llm;
pub mod models;
pub mod recommendations;
pub mod services;
pub mod settings;
pub mod stage;
pub mod store;
pub mod testing;
mod utils;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use alignment::AlignmentEngine;
use db::{Database, DATABASE_FILE_NAME};
use llm::{HttpLlmClient, LlmClient};
use recommendations::RecommendationService;
use services::{
    BehaviorService, IdentityService, InsightsService, OutfitService, ProgressService,
    WardrobeService,
};
use settings::{SettingsStore, SETTINGS_FILE_NAME};
use store::Store;

pub use error::{AdvisorError, AdvisorResult};
pub use stage::Stage;

/// Every service, wired once over a shared store, model client and settings.
pub struct AppState {
    pub store: Arc<Store>,
    pub llm: Arc<dyn LlmClient>,
    pub settings: Arc<SettingsStore>,
    pub alignment: AlignmentEngine,
    pub recommendations: RecommendationService,
    pub identity: IdentityService,
    pub wardrobe: WardrobeService,
    pub behavior: BehaviorService,
    pub outfits: OutfitService,
    pub insights: InsightsService,
    pub progress: ProgressService,
}

impl AppState {
    /// Opens (or creates) the advisor data in `data_dir`.
    pub async fn open(data_dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let database = Database::new(data_dir.join(DATABASE_FILE_NAME))?;
        let store = Store::open(Arc::new(database)).await?;
        let settings = SettingsStore::new(data_dir.join(SETTINGS_FILE_NAME))?;
        let llm = HttpLlmClient::new(settings.llm())?;

        Ok(Self::with_parts(store, Arc::new(llm), settings))
    }

    pub fn with_parts<L>(store: Store, llm: Arc<L>, settings: SettingsStore) -> Self
    where
        L: LlmClient + 'static,
    {
        let store = Arc::new(store);
        let llm: Arc<dyn LlmClient> = llm;
        let settings = Arc::new(settings);

        Self {
            alignment: AlignmentEngine::new(store.clone(), llm.clone(), settings.clone()),
            recommendations: RecommendationService::new(store.clone(), llm.clone()),
            identity: IdentityService::new(store.clone(), llm.clone()),
            wardrobe: WardrobeService::new(store.clone(), llm.clone(), settings.clone()),
            behavior: BehaviorService::new(store.clone(), llm.clone(), settings.clone()),
            outfits: OutfitService::new(store.clone(), llm.clone()),
            insights: InsightsService::new(store.clone(), llm.clone(), settings.clone()),
            progress: ProgressService::new(store.clone()),
            store,
            llm,
            settings,
        }
    }
}

/// Initialize logging (reads RUST_LOG env var, info by default).
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}
