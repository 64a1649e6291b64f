pub mod admin;
pub mod assessments;
pub mod health;
mod page;
pub mod sse;
pub mod stats;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::Router;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use eqlens_core::{Analyzer, AssessmentRunner, MIN_WORDS_PER_RESPONSE};
use eqlens_db::Database;
use eqlens_logging::Logger;
use eqlens_model::{Classifiers, ModelBackend};

/// Notifications pushed to `/api/assessments/live` subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApiEvent {
    AssessmentCreated {
        id: String,
        track: String,
    },
    AssessmentCompleted {
        id: String,
        overall_score: f64,
        eq_level: String,
    },
}

impl ApiEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ApiEvent::AssessmentCreated { .. } => "assessment_created",
            ApiEvent::AssessmentCompleted { .. } => "assessment_completed",
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub runner: Arc<AssessmentRunner>,
    pub logger: Arc<Logger>,
    pub events: broadcast::Sender<ApiEvent>,
    pub backend: ModelBackend,
    pub inference_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(db: Arc<Database>, classifiers: &Classifiers, logger: Arc<Logger>) -> Self {
        Self::with_min_words(db, classifiers, logger, MIN_WORDS_PER_RESPONSE)
    }

    pub fn with_min_words(
        db: Arc<Database>,
        classifiers: &Classifiers,
        logger: Arc<Logger>,
        min_words: usize,
    ) -> Self {
        let runner = AssessmentRunner::new(Analyzer::from_classifiers(classifiers), logger.clone())
            .with_min_words(min_words);
        let (events, _) = broadcast::channel(64);

        Self {
            db,
            runner: Arc::new(runner),
            logger,
            events,
            backend: classifiers.backend,
            inference_timeout: None,
        }
    }

    pub fn inference_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.inference_timeout = timeout;
        self
    }

    /// Notify live subscribers. Having none is not an error.
    pub(crate) fn publish(&self, event: ApiEvent) {
        let _ = self.events.send(event);
    }
}

pub type ApiError = (StatusCode, String);

pub(crate) fn internal(e: impl std::fmt::Display) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

/// A JSON request body. Malformed or mistyped bodies are a 400 like every
/// other bad input, not axum's default 422.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(bad_body(rejection)),
        }
    }
}

fn bad_body(rejection: JsonRejection) -> ApiError {
    (StatusCode::BAD_REQUEST, rejection.body_text())
}

pub fn create_router(state: AppState, cors_permissive: bool) -> Router {
    let mut router = Router::new()
        .route("/", get(page::index))
        .route("/api/health", get(health::health))
        .route("/api/assessments", post(assessments::create_assessment))
        .route("/api/assessments/live", get(sse::assessment_events))
        .route("/api/assessments/{id}", get(assessments::get_assessment))
        .route(
            "/api/assessments/{id}/responses",
            post(assessments::submit_responses),
        )
        .route("/api/assessments/{id}/result", get(assessments::get_result))
        .route("/api/stats", get(stats::get_stats))
        .route("/admin/api/assessments", get(admin::list_assessments))
        .route(
            "/admin/api/assessments/{id}",
            delete(admin::delete_assessment),
        )
        .layer(TraceLayer::new_for_http());

    if cors_permissive {
        router = router.layer(CorsLayer::permissive());
    }

    router.with_state(state)
}
