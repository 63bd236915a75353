//! Per-session state attached to a single thread

use serde::Serialize;
use utoipa::ToSchema;

use crate::model::Analysis;

/// Session-scoped state for one thread.
///
/// Created lazily with defaults the first time a thread is acted on, then
/// mutated in place. `analysis` and `rebuttal` are always set together, so
/// they are either both `None` or both `Some`.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct ThreadSessionEntry {
    pub analyzed: bool,
    pub visible: bool,
    pub analysis: Option<Analysis>,
    pub rebuttal: Option<String>,
}
