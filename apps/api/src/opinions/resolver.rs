//! Model Resolver: picks the model a request will actually run on.
//!
//! Fallback chain, first match wins:
//! 1. the requested name, if the catalog has it
//! 2. the flash tier model
//! 3. the pro tier model
//! 4. the first catalog entry, in provider order
//!
//! Only an empty catalog fails.

use tracing::warn;

use crate::models::catalog::{
    ModelCatalogSnapshot, ModelDescriptor, FLASH_TIER_MODEL, PRO_TIER_MODEL,
};
use crate::opinions::error::OpinionError;

/// Strips an optional `models/` prefix and surrounding whitespace.
pub fn normalize_model_name(requested: &str) -> &str {
    let trimmed = requested.trim();
    trimmed.strip_prefix("models/").unwrap_or(trimmed)
}

pub fn resolve(
    requested: &str,
    snapshot: &ModelCatalogSnapshot,
) -> Result<ModelDescriptor, OpinionError> {
    let requested = normalize_model_name(requested);

    if let Some(model) = snapshot.find(requested) {
        return Ok(model.clone());
    }

    let fallback = snapshot
        .find(FLASH_TIER_MODEL)
        .or_else(|| snapshot.find(PRO_TIER_MODEL))
        .or_else(|| snapshot.models.first())
        .ok_or(OpinionError::ModelUnavailable)?;

    warn!(
        "Requested model '{}' is not available, falling back to '{}'",
        requested, fallback.name
    );
    Ok(fallback.clone())
}
