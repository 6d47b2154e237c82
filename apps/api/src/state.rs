use std::sync::Arc;

use crate::opinions::catalog::ModelCatalog;
use crate::opinions::service::OpinionService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Process-wide model catalog, shared with `opinions`.
    pub catalog: Arc<ModelCatalog>,
    pub opinions: Arc<OpinionService>,
}
