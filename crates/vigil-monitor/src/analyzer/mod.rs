//! Frame analyzer: one frame in, one normalized risk record out.
//!
//! [`FrameAnalyzer::analyze`] never fails. A disabled service yields the
//! fixed mock record, undecodable frames and service failures yield an
//! `error` record, and whatever text the service returns is coerced into a
//! valid record by the parsing chain ([`parse_response`]).

mod lenient;
mod parse;
mod structured;

pub use lenient::{average_score, score_tokens};
pub use parse::{parse_response, ParseMethod, ParsedAnalysis, DEFAULT_BAND, DEFAULT_SCORE};
pub use structured::extract_block;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as B64, Engine};
use chrono::Utc;
use futures_util::FutureExt;
use tracing::{debug, warn};
use vigil_core::{AnalysisResult, AnalysisService, Provenance, Result, SessionId, VigilError};

use crate::history::HistoryBuffer;

/// Instruction sent with every frame
pub const ANALYSIS_INSTRUCTION: &str = "\
You are monitoring a live remote job interview for integrity issues. \
Analyze the candidate in this video frame and respond with a single JSON object \
with exactly these fields:
{
  \"facial_expression_score\": number 0-100 (naturalness of facial expressions),
  \"eye_movement_score\": number 0-100 (consistency of gaze with the screen),
  \"behavioral_score\": number 0-100 (overall behavioral consistency),
  \"authenticity_confidence\": number 0-100 (confidence the candidate is genuine and unassisted),
  \"fraud_risk\": \"Low\" | \"Medium\" | \"High\",
  \"red_flags\": [short snake_case tags of suspicious signals],
  \"observations\": [short factual observations],
  \"recommendations\": [short suggestions for the interviewer]
}
Higher scores mean more trustworthy behavior. Respond with JSON only.";

/// Produces risk records from frames and appends them to history
pub struct FrameAnalyzer {
    service: Option<Arc<dyn AnalysisService>>,
    history: Arc<HistoryBuffer>,
    timeout: Option<Duration>,
}

impl FrameAnalyzer {
    /// Create an analyzer. `None` for `service` means mock mode.
    #[must_use]
    pub fn new(service: Option<Arc<dyn AnalysisService>>, history: Arc<HistoryBuffer>) -> Self {
        Self {
            service,
            history,
            timeout: None,
        }
    }

    /// Bound each external call; a timeout is handled like a failed call
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns true if a real analysis service is wired in
    #[must_use]
    pub fn has_service(&self) -> bool {
        self.service.is_some()
    }

    /// Shared history the analyzer appends to
    #[must_use]
    pub fn history(&self) -> &Arc<HistoryBuffer> {
        &self.history
    }

    /// Analyze a base64 frame (plain or `data:` URL) for `session_id`.
    pub async fn analyze(&self, frame: &str, session_id: &SessionId) -> AnalysisResult {
        let record = match &self.service {
            None => AnalysisResult::mock(session_id.clone(), Utc::now()),
            Some(service) => match decode_frame(frame) {
                Ok(image) => self.run(service.as_ref(), &image, session_id).await,
                Err(err) => {
                    warn!(session = %session_id, error = %err, "rejecting undecodable frame");
                    AnalysisResult::failure(session_id.clone(), Utc::now(), &err.to_string())
                }
            },
        };
        self.record(record)
    }

    /// Analyze an already-decoded image.
    pub async fn analyze_image(&self, image: &[u8], session_id: &SessionId) -> AnalysisResult {
        let record = match &self.service {
            None => AnalysisResult::mock(session_id.clone(), Utc::now()),
            Some(_) if image.is_empty() => {
                AnalysisResult::failure(session_id.clone(), Utc::now(), "empty frame")
            }
            Some(service) => self.run(service.as_ref(), image, session_id).await,
        };
        self.record(record)
    }

    fn record(&self, record: AnalysisResult) -> AnalysisResult {
        debug!(
            session = %record.session_id,
            provenance = %record.provenance,
            band = %record.fraud_risk,
            "analysis record produced"
        );
        self.history.append(record.clone());
        record
    }

    async fn run(
        &self,
        service: &dyn AnalysisService,
        image: &[u8],
        session_id: &SessionId,
    ) -> AnalysisResult {
        match self.call(service, image).await {
            Ok(raw) => {
                let parsed = parse_response(&raw);
                debug!(session = %session_id, method = ?parsed.method, "parsed analysis response");
                AnalysisResult {
                    session_id: session_id.clone(),
                    timestamp: Utc::now(),
                    scores: parsed.scores,
                    fraud_risk: parsed.fraud_risk,
                    red_flags: parsed.red_flags,
                    observations: parsed.observations,
                    recommendations: parsed.recommendations,
                    provenance: Provenance::Normal,
                }
            }
            Err(err) => {
                warn!(
                    session = %session_id,
                    service = service.name(),
                    error = %err,
                    "frame analysis failed"
                );
                AnalysisResult::failure(session_id.clone(), Utc::now(), &err.to_string())
            }
        }
    }

    /// The external call with the optional timeout; panics become errors.
    async fn call(&self, service: &dyn AnalysisService, image: &[u8]) -> Result<String> {
        let call = AssertUnwindSafe(service.infer(ANALYSIS_INSTRUCTION, image)).catch_unwind();
        let outcome = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| VigilError::timeout(limit))?,
            None => call.await,
        };
        outcome.unwrap_or_else(|_| Err(VigilError::Internal("analysis service panicked".into())))
    }
}

impl std::fmt::Debug for FrameAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameAnalyzer")
            .field("service", &self.service.as_ref().map(|s| s.name().to_string()))
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Decode a base64 frame, accepting `data:<mime>;base64,` URLs and
/// embedded whitespace.
pub fn decode_frame(frame: &str) -> Result<Vec<u8>> {
    let payload = frame.trim();
    let payload = match payload.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| VigilError::Decode("data URL without payload".into()))?,
        None => payload,
    };

    let compact: String = payload.split_whitespace().collect();
    if compact.is_empty() {
        return Err(VigilError::Decode("empty frame".into()));
    }

    let bytes = B64
        .decode(compact.as_bytes())
        .map_err(|e| VigilError::Decode(e.to_string()))?;
    if bytes.is_empty() {
        return Err(VigilError::Decode("empty frame".into()));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use vigil_core::{RiskBand, ANALYSIS_ERROR_FLAG};

    struct Scripted(std::result::Result<&'static str, &'static str>);

    #[async_trait]
    impl AnalysisService for Scripted {
        async fn infer(&self, _instruction: &str, _image: &[u8]) -> Result<String> {
            match self.0 {
                Ok(text) => Ok(text.to_string()),
                Err(msg) => Err(VigilError::Http(msg.to_string())),
            }
        }
    }

    struct Stalls;

    #[async_trait]
    impl AnalysisService for Stalls {
        async fn infer(&self, _instruction: &str, _image: &[u8]) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(String::new())
        }
    }

    struct Panics;

    #[async_trait]
    impl AnalysisService for Panics {
        async fn infer(&self, _instruction: &str, _image: &[u8]) -> Result<String> {
            panic!("model crashed");
        }
    }

    const FRAME: &str = "/9j/4AAQ";

    fn analyzer(service: Option<Arc<dyn AnalysisService>>) -> FrameAnalyzer {
        FrameAnalyzer::new(service, Arc::new(HistoryBuffer::new(16)))
    }

    fn assert_error_record(record: &AnalysisResult) {
        assert_eq!(record.provenance, Provenance::Error);
        assert_eq!(record.fraud_risk, RiskBand::Unknown);
        assert!(record.red_flags.iter().any(|f| f == ANALYSIS_ERROR_FLAG));
        assert_eq!(record.scores, vigil_core::RiskScores::uniform(0.0));
    }

    #[test]
    fn test_decode_frame_variants() {
        assert_eq!(decode_frame("aGk=").unwrap(), b"hi");
        assert_eq!(decode_frame("data:image/jpeg;base64,aGk=").unwrap(), b"hi");
        assert_eq!(decode_frame(" aG\nk= ").unwrap(), b"hi");
        assert!(decode_frame("").is_err());
        assert!(decode_frame("data:image/png;base64").is_err());
        assert!(decode_frame("not base64!!").is_err());
    }

    #[tokio::test]
    async fn test_mock_mode_ignores_input() {
        let analyzer = analyzer(None);
        for (frame, session) in [("", "a"), ("garbage", "b"), (FRAME, "c")] {
            let record = analyzer.analyze(frame, &SessionId::from(session)).await;
            assert_eq!(record.provenance, Provenance::Mock);
            assert_eq!(record.scores, AnalysisResult::mock(SessionId::from("x"), Utc::now()).scores);
            assert_eq!(record.fraud_risk, RiskBand::Low);
        }
        assert_eq!(analyzer.history().len(), 3);
    }

    #[tokio::test]
    async fn test_structured_response_is_normal() {
        let analyzer = analyzer(Some(Arc::new(Scripted(Ok(
            r#"{"facial_expression_score": 90, "eye_movement_score": 55,
                "behavioral_score": 70, "authenticity_confidence": 65,
                "fraud_risk": "Medium", "red_flags": ["looking_away"],
                "observations": ["glances left"], "recommendations": ["ask a follow-up"]}"#,
        )))));
        let session = SessionId::from("s-1");
        let record = analyzer.analyze(FRAME, &session).await;

        assert_eq!(record.provenance, Provenance::Normal);
        assert_eq!(record.session_id, session);
        assert_eq!(record.scores.facial_expression, 90.0);
        assert_eq!(record.scores.eye_movement, 55.0);
        assert_eq!(record.scores.behavioral, 70.0);
        assert_eq!(record.scores.authenticity_confidence, 65.0);
        assert_eq!(record.fraud_risk, RiskBand::Medium);
        assert_eq!(record.red_flags, vec!["looking_away"]);
        assert_eq!(analyzer.history().latest_for(&session), Some(record));
    }

    #[tokio::test]
    async fn test_service_error_becomes_error_record() {
        let analyzer = analyzer(Some(Arc::new(Scripted(Err("connection reset")))));
        let record = analyzer.analyze(FRAME, &SessionId::from("s")).await;
        assert_error_record(&record);
        assert!(record.observations[0].contains("connection reset"));
        assert_eq!(analyzer.history().len(), 1);
    }

    #[tokio::test]
    async fn test_bad_frame_becomes_error_record() {
        let analyzer = analyzer(Some(Arc::new(Scripted(Ok("{}")))));
        for frame in ["", "   ", "%%%not-base64%%%"] {
            let record = analyzer.analyze(frame, &SessionId::from("s")).await;
            assert_error_record(&record);
        }
        let record = analyzer.analyze_image(&[], &SessionId::from("s")).await;
        assert_error_record(&record);
    }

    #[tokio::test]
    async fn test_non_image_bytes_still_produce_a_record() {
        let analyzer = analyzer(Some(Arc::new(Scripted(Ok("I cannot see a person here.")))));
        let record = analyzer
            .analyze_image(b"plain text, not an image", &SessionId::from("s"))
            .await;
        assert_eq!(record.provenance, Provenance::Normal);
        assert!(record.scores.in_range());
    }

    #[tokio::test]
    async fn test_timeout_becomes_error_record() {
        let analyzer =
            analyzer(Some(Arc::new(Stalls))).with_timeout(Duration::from_millis(20));
        let record = analyzer.analyze(FRAME, &SessionId::from("s")).await;
        assert_error_record(&record);
        assert!(record.observations[0].contains("timed out after 1 seconds"));
    }

    #[tokio::test]
    async fn test_panicking_service_becomes_error_record() {
        let analyzer = analyzer(Some(Arc::new(Panics)));
        let record = analyzer.analyze(FRAME, &SessionId::from("s")).await;
        assert_error_record(&record);
    }
}
