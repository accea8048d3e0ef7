//! Draft reporting session.
//!
//! A session owns the image description cache of one issue draft and
//! serializes what gets applied to it. Every submission gets a generation
//! number; starting a new submission cancels the previous one, and a result
//! that finishes after a newer submission started is reported as
//! [`SessionOutcome::Superseded`] and never touches the cache. This keeps a
//! slow vision call from overwriting a faster text-only result that followed
//! it.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, field, info, instrument, Span};
use uuid::Uuid;

use kvar_core::{logging, ClassificationRequest, Error, Result, TriageOutcome};

use crate::cache::{CacheEntry, ImageDescriptionCache};
use crate::coordinator::TriageCoordinator;

/// Result of one session submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// Latest submission; the outcome has been applied to the session.
    Applied {
        request_id: Uuid,
        generation: u64,
        outcome: TriageOutcome,
    },
    /// A newer submission started first; discard this result.
    Superseded { request_id: Uuid, generation: u64 },
}

impl SessionOutcome {
    pub fn request_id(&self) -> Uuid {
        match self {
            Self::Applied { request_id, .. } | Self::Superseded { request_id, .. } => *request_id,
        }
    }

    pub fn generation(&self) -> u64 {
        match self {
            Self::Applied { generation, .. } | Self::Superseded { generation, .. } => *generation,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded { .. })
    }

    /// The applied outcome, if any.
    pub fn into_outcome(self) -> Option<TriageOutcome> {
        match self {
            Self::Applied { outcome, .. } => Some(outcome),
            Self::Superseded { .. } => None,
        }
    }
}

/// One issue draft being classified as the reporter edits it.
#[derive(Debug)]
pub struct TriageSession {
    id: Uuid,
    coordinator: TriageCoordinator,
    cache: Mutex<ImageDescriptionCache>,
    generation: AtomicU64,
    in_flight: Mutex<Option<CancellationToken>>,
}

impl TriageSession {
    pub fn new(coordinator: TriageCoordinator) -> Self {
        let id = Uuid::now_v7();
        info!(
            subsystem = "triage",
            component = "session",
            session_id = %id,
            "Triage session created"
        );
        Self {
            id,
            coordinator,
            cache: Mutex::new(ImageDescriptionCache::new()),
            generation: AtomicU64::new(0),
            in_flight: Mutex::new(None),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Generation of the most recent submission (0 before the first).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Classify the current state of the draft.
    ///
    /// Cancels any submission still in flight. Invalid input is returned as
    /// an error; every analyzer failure is absorbed by the coordinator.
    #[instrument(
        skip(self, request),
        fields(
            subsystem = "triage",
            component = "session",
            op = "submit",
            session_id = %self.id,
            request_id = field::Empty,
            generation = field::Empty,
        )
    )]
    pub async fn submit(&self, request: &ClassificationRequest) -> Result<SessionOutcome> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let request_id = Uuid::now_v7();
        let span = Span::current();
        span.record(logging::REQUEST_ID, request_id.to_string().as_str());
        span.record(logging::GENERATION, generation);

        let token = CancellationToken::new();
        if let Some(previous) = self.in_flight.lock().await.replace(token.clone()) {
            debug!("Cancelling previous submission");
            previous.cancel();
        }

        let snapshot = self.cache.lock().await.clone();
        let result = self
            .coordinator
            .triage_with_cancel(request, &snapshot, &token)
            .await;

        let mut cache = self.cache.lock().await;
        if self.generation() != generation {
            debug!(latest = self.generation(), "Discarding superseded result");
            return match result {
                Ok(_) | Err(Error::Cancelled) => Ok(SessionOutcome::Superseded {
                    request_id,
                    generation,
                }),
                Err(e) => Err(e),
            };
        }

        let outcome = result?;
        if let Some(description) = &outcome.derived_image_description {
            cache.store(&request.images, description.clone());
        }
        Ok(SessionOutcome::Applied {
            request_id,
            generation,
            outcome,
        })
    }

    /// Cancel the in-flight submission, if any.
    pub async fn cancel(&self) {
        if let Some(token) = self.in_flight.lock().await.take() {
            token.cancel();
        }
    }

    /// Snapshot of the cached image description.
    pub async fn cache_entry(&self) -> Option<CacheEntry> {
        self.cache.lock().await.entry().cloned()
    }

    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvar_core::{AnalysisPath, ImageBlob, RawClassification};
    use kvar_inference::mock::{MockTextAnalyzer, MockVisionAnalyzer};
    use std::sync::Arc;

    fn session(text: MockTextAnalyzer, vision: MockVisionAnalyzer) -> TriageSession {
        TriageSession::new(TriageCoordinator::new(Arc::new(text), Arc::new(vision)))
    }

    #[tokio::test]
    async fn test_generation_increments() {
        let session = session(MockTextAnalyzer::new(), MockVisionAnalyzer::new());
        assert_eq!(session.generation(), 0);

        let request = ClassificationRequest::new().with_title("Ne radi interfon");
        let first = session.submit(&request).await.unwrap();
        let second = session.submit(&request).await.unwrap();
        assert_eq!(first.generation(), 1);
        assert_eq!(second.generation(), 2);
        assert_ne!(first.request_id(), second.request_id());
        assert!(!second.is_superseded());
    }

    #[tokio::test]
    async fn test_invalid_input_is_error() {
        let session = session(MockTextAnalyzer::new(), MockVisionAnalyzer::new());
        let err = session.submit(&ClassificationRequest::new()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_vision_description_is_cached() {
        let vision = MockVisionAnalyzer::new().with_response(RawClassification {
            category: "Zidovi/Fasada".to_string(),
            image_summary: Some("Pukotina na zidu iznad prozora.".to_string()),
            ..Default::default()
        });
        let session = session(MockTextAnalyzer::new(), vision);
        let request = ClassificationRequest::new()
            .with_title("Pukotina")
            .with_image(ImageBlob::new("zid.jpg", b"zid".to_vec()));

        let outcome = session.submit(&request).await.unwrap().into_outcome().unwrap();
        assert_eq!(outcome.path, AnalysisPath::Vision);

        let entry = session.cache_entry().await.unwrap();
        assert_eq!(entry.description, "Pukotina na zidu iznad prozora.");

        session.clear_cache().await;
        assert!(session.cache_entry().await.is_none());
    }

    #[tokio::test]
    async fn test_explicit_cancel_without_newer_submission_is_error() {
        let vision = MockVisionAnalyzer::new().with_latency_ms(60_000);
        let session = session(MockTextAnalyzer::new(), vision);
        let request = ClassificationRequest::new()
            .with_image(ImageBlob::new("a.jpg", b"a".to_vec()));

        let (result, _) = tokio::join!(session.submit(&request), session.cancel());
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
