use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{FromRequest, Path, Query, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{Json, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use eqlens::api::admin::{basic_credentials, delete_assessment, list_assessments};
use eqlens::api::assessments::{
    create_assessment, get_assessment, get_result, submit_responses, CreateAssessmentRequest,
    SubmitResponsesRequest, RESULT_PENDING_MESSAGE,
};
use eqlens::api::health::health;
use eqlens::api::stats::get_stats;
use eqlens::api::{ApiEvent, ApiJson, AppState};
use eqlens::filter::ListParams;
use eqlens_db::{AssessmentStatus, Database};
use eqlens_logging::{LogFormat, Logger};
use eqlens_model::{
    load_classifiers, Classifiers, LabelScore, ModelBackend, ModelError, ModelSettings,
    TextClassifier,
};

struct Failing;

impl TextClassifier for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    fn classify(&self, _text: &str) -> eqlens_model::Result<Vec<LabelScore>> {
        Err(ModelError::Inference("model unavailable".to_string()))
    }
}

struct Slow;

impl TextClassifier for Slow {
    fn name(&self) -> &str {
        "slow"
    }

    fn classify(&self, _text: &str) -> eqlens_model::Result<Vec<LabelScore>> {
        std::thread::sleep(Duration::from_millis(100));
        Ok(vec![LabelScore::new("positive", 0.9)])
    }
}

fn lexicon_classifiers() -> Classifiers {
    load_classifiers(&ModelSettings {
        backend: ModelBackend::Lexicon,
        ..Default::default()
    })
    .unwrap()
}

fn database() -> Arc<Database> {
    let db = Database::open_in_memory().unwrap();
    db.migrate().unwrap();
    Arc::new(db)
}

fn state_with(classifiers: &Classifiers) -> AppState {
    AppState::new(database(), classifiers, Arc::new(Logger::quiet()))
}

fn lexicon_state() -> AppState {
    state_with(&lexicon_classifiers())
}

fn nurse() -> CreateAssessmentRequest {
    CreateAssessmentRequest {
        age: 41,
        gender: "prefer_not_say".to_string(),
        profession: "Night Shift Nurse".to_string(),
    }
}

fn answers() -> Vec<String> {
    [
        "I would feel anxious and a bit frustrated, but also sympathy for the worried family member.",
        "I would breathe slowly, stay calm, and remind myself that their anger comes from fear.",
        "I would listen carefully, acknowledge the concern, and explain clearly what we are doing next.",
        "After the shift I would talk with a colleague and rest so the stress does not build up.",
        "I would learn to keep families updated earlier and feel more confident in tense moments.",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

async fn create(state: &AppState) -> String {
    let (status, Json(created)) = create_assessment(State(state.clone()), ApiJson(nurse()))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    created.id
}

fn expect_ok<T>(result: Result<T, Response>) -> T {
    match result {
        Ok(value) => value,
        Err(response) => panic!("unexpected error response: {}", response.status()),
    }
}

fn expect_err<T>(result: Result<T, Response>) -> Response {
    match result {
        Ok(_) => panic!("expected an error response"),
        Err(response) => response,
    }
}

fn basic_auth(user: &str, pass: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let value = format!("Basic {}", STANDARD.encode(format!("{}:{}", user, pass)));
    headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&value).unwrap());
    headers
}

#[tokio::test]
async fn test_create_generates_scenario_and_stores_pending() {
    let state = lexicon_state();

    let (status, Json(created)) = create_assessment(State(state.clone()), ApiJson(nurse()))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created.track.as_str(), "healthcare");
    assert_eq!(created.questions.len(), 5);
    assert!(!created.scenario.is_empty());

    let Json(view) = get_assessment(State(state), Path(created.id.clone()))
        .await
        .unwrap();
    assert_eq!(view.status, AssessmentStatus::Pending);
    assert_eq!(view.demographics.gender_display, "Prefer not to say");
    assert_eq!(view.demographics.profession, "Night Shift Nurse");
    assert!(view.responses.is_none());
}

#[tokio::test]
async fn test_create_rejects_invalid_demographics() {
    let state = lexicon_state();

    for req in [
        CreateAssessmentRequest {
            age: 9,
            ..nurse()
        },
        CreateAssessmentRequest {
            age: 101,
            ..nurse()
        },
        CreateAssessmentRequest {
            profession: "   ".to_string(),
            ..nurse()
        },
        CreateAssessmentRequest {
            gender: "robot".to_string(),
            ..nurse()
        },
    ] {
        let (status, _) = create_assessment(State(state.clone()), ApiJson(req))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let stats = state
        .db
        .assessments()
        .stats(&Default::default())
        .unwrap();
    assert_eq!(stats.total, 0);
}

#[tokio::test]
async fn test_full_submission_flow() {
    let state = lexicon_state();
    let mut events = state.events.subscribe();
    let id = create(&state).await;

    assert!(matches!(
        events.recv().await.unwrap(),
        ApiEvent::AssessmentCreated { .. }
    ));

    let (status, message) = get_result(State(state.clone()), Path(id.clone()))
        .await
        .unwrap_err();
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(message, RESULT_PENDING_MESSAGE);

    let Json(result) = submit_responses(
        State(state.clone()),
        Path(id.clone()),
        ApiJson(SubmitResponsesRequest { answers: answers() }),
    )
    .await
    .unwrap();

    assert_eq!(result.id, id);
    assert_eq!(result.track, "healthcare");
    assert_eq!(result.report.analyses.len(), 5);
    assert!((0.0..=100.0).contains(&result.report.overall_score));
    for (_, score) in result.report.category_scores.entries() {
        assert!((0.0..=100.0).contains(&score));
    }

    match events.recv().await.unwrap() {
        ApiEvent::AssessmentCompleted {
            id: event_id,
            eq_level,
            ..
        } => {
            assert_eq!(event_id, id);
            assert_eq!(eq_level, result.report.eq_level.to_string());
        }
        other => panic!("unexpected event: {:?}", other),
    }

    let Json(stored) = get_result(State(state.clone()), Path(id.clone()))
        .await
        .unwrap();
    assert_eq!(stored.report.eq_level, result.report.eq_level);
    assert!((stored.report.overall_score - result.report.overall_score).abs() < 1e-9);
    assert_eq!(stored.report.analyses.len(), 5);
    assert_eq!(stored.demographics.gender_display, "Prefer not to say");

    let Json(view) = get_assessment(State(state), Path(id)).await.unwrap();
    assert_eq!(view.status, AssessmentStatus::Completed);
    assert_eq!(view.responses.unwrap().len(), 5);
    assert!(view.completed_at.is_some());
}

#[tokio::test]
async fn test_resubmission_conflicts() {
    let state = lexicon_state();
    let id = create(&state).await;

    submit_responses(
        State(state.clone()),
        Path(id.clone()),
        ApiJson(SubmitResponsesRequest { answers: answers() }),
    )
    .await
    .unwrap();

    let (status, _) = submit_responses(
        State(state),
        Path(id),
        ApiJson(SubmitResponsesRequest { answers: answers() }),
    )
    .await
    .unwrap_err();
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_short_answer_reports_exact_message() {
    let state = lexicon_state();
    let id = create(&state).await;

    let mut short = answers();
    short[1] = "  I would stay calm.  ".to_string();

    let (status, message) = submit_responses(
        State(state.clone()),
        Path(id.clone()),
        ApiJson(SubmitResponsesRequest { answers: short }),
    )
    .await
    .unwrap_err();

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        message,
        "Answer 2 is too short. Please provide at least 10 words (currently 4 words). \
         Your response should be detailed and reflective."
    );

    let Json(view) = get_assessment(State(state), Path(id)).await.unwrap();
    assert_eq!(view.status, AssessmentStatus::Pending);
}

#[tokio::test]
async fn test_wrong_answer_count_is_rejected() {
    let state = lexicon_state();
    let id = create(&state).await;

    let mut too_few = answers();
    too_few.pop();

    let (status, message) = submit_responses(
        State(state),
        Path(id),
        ApiJson(SubmitResponsesRequest { answers: too_few }),
    )
    .await
    .unwrap_err();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(message, "Expected 5 answers but received 4.");
}

#[tokio::test]
async fn test_unknown_id_is_not_found() {
    let state = lexicon_state();

    let (status, _) = get_assessment(State(state.clone()), Path("missing".to_string()))
        .await
        .unwrap_err();
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get_result(State(state.clone()), Path("missing".to_string()))
        .await
        .unwrap_err();
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = submit_responses(
        State(state),
        Path("missing".to_string()),
        ApiJson(SubmitResponsesRequest { answers: answers() }),
    )
    .await
    .unwrap_err();
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sentiment_failure_is_bad_gateway_and_stays_pending() {
    let lexicon = lexicon_classifiers();
    let classifiers = Classifiers {
        backend: ModelBackend::Candle,
        sentiment: Arc::new(Failing),
        emotion: lexicon.emotion,
    };
    let state = state_with(&classifiers);
    let id = create(&state).await;

    let (status, message) = submit_responses(
        State(state.clone()),
        Path(id.clone()),
        ApiJson(SubmitResponsesRequest { answers: answers() }),
    )
    .await
    .unwrap_err();
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(message.contains("model unavailable"));

    let Json(view) = get_assessment(State(state), Path(id)).await.unwrap();
    assert_eq!(view.status, AssessmentStatus::Pending);
}

#[tokio::test]
async fn test_emotion_failure_still_scores() {
    let lexicon = lexicon_classifiers();
    let classifiers = Classifiers {
        backend: ModelBackend::Candle,
        sentiment: lexicon.sentiment,
        emotion: Arc::new(Failing),
    };
    let state = state_with(&classifiers);
    let id = create(&state).await;

    let Json(result) = submit_responses(
        State(state),
        Path(id),
        ApiJson(SubmitResponsesRequest { answers: answers() }),
    )
    .await
    .unwrap();

    assert!(result.report.emotion_percent.is_empty());
    assert!(result
        .report
        .analyses
        .iter()
        .all(|a| a.emotion_scores.is_empty() && a.primary_emotion.is_none()));
}

#[tokio::test]
async fn test_slow_inference_times_out() {
    let classifiers = Classifiers {
        backend: ModelBackend::Candle,
        sentiment: Arc::new(Slow),
        emotion: Arc::new(Slow),
    };
    let state = state_with(&classifiers).inference_timeout(Some(Duration::from_millis(20)));
    let id = create(&state).await;

    let (status, _) = submit_responses(
        State(state),
        Path(id),
        ApiJson(SubmitResponsesRequest { answers: answers() }),
    )
    .await
    .unwrap_err();
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn test_timed_out_scoring_never_logs_completion() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("events.jsonl");
    let logger = Logger::with_file(LogFormat::Compact, &log_path).unwrap();
    let classifiers = Classifiers {
        backend: ModelBackend::Candle,
        sentiment: Arc::new(Slow),
        emotion: Arc::new(Slow),
    };
    let state = AppState::new(database(), &classifiers, Arc::new(logger))
        .inference_timeout(Some(Duration::from_millis(20)));
    let id = create(&state).await;

    let (status, _) = submit_responses(
        State(state.clone()),
        Path(id.clone()),
        ApiJson(SubmitResponsesRequest { answers: answers() }),
    )
    .await
    .unwrap_err();
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);

    // Long enough for the abandoned task to reach its next checkpoint.
    tokio::time::sleep(Duration::from_millis(600)).await;

    let log = std::fs::read_to_string(&log_path).unwrap();
    assert!(log.contains("timed out"));
    assert!(!log.contains("scores_calculated"));
    assert!(!log.contains("assessment_completed"));

    let Json(view) = get_assessment(State(state), Path(id)).await.unwrap();
    assert_eq!(view.status, AssessmentStatus::Pending);
}

fn json_request(body: &'static str) -> Request {
    Request::builder()
        .method("POST")
        .uri("/api/assessments")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_mistyped_body_is_bad_request() {
    let bodies = [
        r#"{"age": "thirty", "gender": "female", "profession": "Nurse"}"#,
        r#"{"age": 30, "gender": "female"}"#,
        r#"{"age": 30, "gender": "female", "profession": "Nurse""#,
    ];

    for body in bodies {
        let (status, message) =
            ApiJson::<CreateAssessmentRequest>::from_request(json_request(body), &())
                .await
                .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", body);
        assert!(!message.is_empty());
    }

    let (status, message) = ApiJson::<SubmitResponsesRequest>::from_request(
        json_request(r#"{"answers": "not a list"}"#),
        &(),
    )
    .await
    .unwrap_err();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(message.contains("answers"));
}

#[tokio::test]
async fn test_missing_profession_names_the_field() {
    let (status, message) = ApiJson::<CreateAssessmentRequest>::from_request(
        json_request(r#"{"age": 30, "gender": "female"}"#),
        &(),
    )
    .await
    .unwrap_err();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(message.contains("profession"));
}

#[tokio::test]
async fn test_well_formed_body_is_extracted() {
    let ApiJson(req) = ApiJson::<CreateAssessmentRequest>::from_request(
        json_request(r#"{"age": 30, "gender": "female", "profession": "Nurse"}"#),
        &(),
    )
    .await
    .unwrap();
    assert_eq!(req.age, 30);
    assert_eq!(req.profession, "Nurse");
}

#[tokio::test]
async fn test_health_reports_backend() {
    let Json(body) = health(State(lexicon_state())).await;
    assert_eq!(body.status, "ok");
    assert_eq!(body.backend, ModelBackend::Lexicon);
    assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_stats_count_pending_and_completed() {
    let state = lexicon_state();
    let first = create(&state).await;
    create(&state).await;

    submit_responses(
        State(state.clone()),
        Path(first),
        ApiJson(SubmitResponsesRequest { answers: answers() }),
    )
    .await
    .unwrap();

    let Json(stats) = get_stats(State(state)).await.unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.pending, 1);
    assert!((stats.completion_rate - 0.5).abs() < 1e-9);
    assert!(stats.avg_overall_score.is_some());
    assert_eq!(stats.by_track.len(), 1);
    assert_eq!(stats.by_track[0].track, "healthcare");
}

#[test]
fn test_basic_credentials_parsing() {
    assert_eq!(
        basic_credentials(&basic_auth("admin", "pa:ss")),
        Some(("admin".to_string(), "pa:ss".to_string()))
    );

    let mut bearer = HeaderMap::new();
    bearer.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
    assert_eq!(basic_credentials(&bearer), None);
    assert_eq!(basic_credentials(&HeaderMap::new()), None);
}

#[tokio::test]
async fn test_admin_endpoints_require_credentials() {
    let state = lexicon_state();
    state.db.admin_users().create("admin", "hunter22").unwrap();
    let id = create(&state).await;

    for headers in [HeaderMap::new(), basic_auth("admin", "wrong")] {
        let response = expect_err(
            list_assessments(State(state.clone()), headers, Query(ListParams::default())).await,
        );
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    let response = expect_err(
        delete_assessment(State(state.clone()), HeaderMap::new(), Path(id.clone())).await,
    );
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let Json(listed) = expect_ok(
        list_assessments(
            State(state.clone()),
            basic_auth("admin", "hunter22"),
            Query(ListParams {
                status: Some("pending".to_string()),
                ..Default::default()
            }),
        )
        .await,
    );
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, id);
}

#[tokio::test]
async fn test_admin_filter_and_delete() {
    let state = lexicon_state();
    state.db.admin_users().create("admin", "hunter22").unwrap();
    let id = create(&state).await;
    let auth = || basic_auth("admin", "hunter22");

    let response = expect_err(
        list_assessments(
            State(state.clone()),
            auth(),
            Query(ListParams {
                after: Some("yesterday".to_string()),
                ..Default::default()
            }),
        )
        .await,
    );
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let Json(completed) = expect_ok(
        list_assessments(
            State(state.clone()),
            auth(),
            Query(ListParams {
                status: Some("completed".to_string()),
                ..Default::default()
            }),
        )
        .await,
    );
    assert!(completed.is_empty());

    let status = expect_ok(delete_assessment(State(state.clone()), auth(), Path(id.clone())).await);
    assert_eq!(status, StatusCode::NO_CONTENT);

    let response =
        expect_err(delete_assessment(State(state.clone()), auth(), Path(id.clone())).await);
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let (status, _) = get_assessment(State(state), Path(id)).await.unwrap_err();
    assert_eq!(status, StatusCode::NOT_FOUND);
}
