use std::sync::Arc;

use tracing::error;

use crate::admin::AdminGate;
use crate::error::ApiError;
use crate::service::DropService;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub service: DropService,
    pub admin: AdminGate,
}

impl AppStateInner {
    pub fn new(service: DropService, admin: AdminGate) -> AppState {
        Arc::new(Self { service, admin })
    }
}

/// Run blocking store work off the async runtime.
pub async fn run_blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal("blocking task failed".into())
    })?
}
