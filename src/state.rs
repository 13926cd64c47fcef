//! Shared application state handed to every request

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::generation::Generator;
use crate::infrastructure::AutoRestExecutor;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub generator: Arc<dyn Generator>,
    /// Cancelled on server shutdown; every invocation context derives from it
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let generator = Arc::new(AutoRestExecutor::new(config.generator_program.clone()));
        Self::with_generator(config, generator)
    }

    pub fn with_generator(config: ServerConfig, generator: Arc<dyn Generator>) -> Self {
        Self {
            config: Arc::new(config),
            generator,
            shutdown: CancellationToken::new(),
        }
    }
}
