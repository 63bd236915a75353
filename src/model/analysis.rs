//! LLM-extracted argument structure for a thread

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Fallback text when the model reply is not valid JSON
const FALLBACK_POSITION: &str = "Could not extract main position";
const FALLBACK_RATIONALE: &str = "Could not extract rationale";

/// The main argument extracted from a thread, with its supporting points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Analysis {
    pub main_position: String,
    pub rationale: Vec<String>,
}

impl Analysis {
    /// Sentinel analysis returned when the model reply cannot be parsed.
    ///
    /// JSON conformance is not guaranteed even with a structured-output
    /// instruction, so the summarizer recovers with this default instead
    /// of failing the whole operation.
    pub fn fallback() -> Self {
        Self {
            main_position: FALLBACK_POSITION.to_string(),
            rationale: vec![FALLBACK_RATIONALE.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_has_expected_shape() {
        let analysis = Analysis::fallback();
        assert_eq!(analysis.main_position, "Could not extract main position");
        assert_eq!(analysis.rationale, vec!["Could not extract rationale"]);
    }
}
