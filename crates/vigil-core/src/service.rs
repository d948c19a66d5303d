use async_trait::async_trait;

use crate::Result;

/// External behavioral-analysis capability.
///
/// One round-trip per frame, no session affinity. Implementations return
/// the model's raw text; interpreting it is the caller's job.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Run `instruction` against the image and return the raw text answer
    async fn infer(&self, instruction: &str, image: &[u8]) -> Result<String>;

    /// Short name used in logs
    fn name(&self) -> &str {
        "analysis"
    }
}
