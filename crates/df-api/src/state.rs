use df_config::FactoryConfig;
use df_factory::AppFactory;
use df_workspace::WorkspaceManager;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: FactoryConfig,
    pub factory: Arc<AppFactory>,
    pub version: &'static str,
}

impl AppState {
    pub fn new(config: FactoryConfig) -> anyhow::Result<Self> {
        let apps_dir = config.apps_dir()?;
        tracing::info!(apps_dir = %apps_dir.display(), "using apps directory");
        let factory = Arc::new(AppFactory::new(
            WorkspaceManager::new(apps_dir),
            config.stop_grace(),
        ));
        Ok(Self::with_factory(config, factory))
    }

    pub fn with_factory(config: FactoryConfig, factory: Arc<AppFactory>) -> Self {
        Self {
            config,
            factory,
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}
