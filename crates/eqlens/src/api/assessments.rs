use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use eqlens_core::{
    generate_questions, generate_scenario, normalize_answers, validate_answer_count,
    AssessmentError, AssessmentReport, Demographics, Gender, ProfessionTrack,
};
use eqlens_db::{AssessmentRecord, AssessmentStatus, Completion, NewAssessment};
use eqlens_logging::AssessmentEvent;

use super::{internal, ApiError, ApiEvent, ApiJson, AppState};

pub const RESULT_PENDING_MESSAGE: &str = "Please complete the assessment to view results.";
pub const ALREADY_COMPLETED_MESSAGE: &str = "This assessment has already been completed.";

#[derive(Debug, Deserialize)]
pub struct CreateAssessmentRequest {
    pub age: i64,
    pub gender: String,
    pub profession: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateAssessmentResponse {
    pub id: String,
    pub track: ProfessionTrack,
    pub scenario: String,
    pub questions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitResponsesRequest {
    pub answers: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DemographicsView {
    pub age: u8,
    pub gender: String,
    pub gender_display: String,
    pub profession: String,
}

/// An assessment as returned by `GET /api/assessments/{id}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AssessmentView {
    pub id: String,
    pub status: AssessmentStatus,
    pub demographics: DemographicsView,
    pub track: String,
    pub scenario: String,
    pub questions: Vec<String>,
    pub responses: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A scored assessment with the context the results page shows.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResultView {
    pub id: String,
    pub demographics: DemographicsView,
    pub track: String,
    pub scenario: String,
    #[serde(flatten)]
    pub report: AssessmentReport,
}

fn demographics_view(record: &AssessmentRecord) -> DemographicsView {
    let gender_display = record
        .gender
        .parse::<Gender>()
        .map(|g| g.label().to_string())
        .unwrap_or_else(|_| record.gender.clone());

    DemographicsView {
        age: record.age,
        gender: record.gender.clone(),
        gender_display,
        profession: record.profession.clone(),
    }
}

fn load(state: &AppState, id: &str) -> Result<AssessmentRecord, ApiError> {
    state
        .db
        .assessments()
        .get(id)
        .map_err(internal)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Assessment not found: {}", id)))
}

pub async fn create_assessment(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateAssessmentRequest>,
) -> Result<(StatusCode, Json<CreateAssessmentResponse>), ApiError> {
    let bad_request = |e: eqlens_core::ValidationError| (StatusCode::BAD_REQUEST, e.to_string());

    let gender: Gender = req.gender.parse().map_err(bad_request)?;
    let demographics = Demographics::new(req.age, gender, &req.profession).map_err(bad_request)?;

    let scenario = generate_scenario(&demographics);
    let questions = generate_questions(&scenario);

    let id = state
        .db
        .assessments()
        .create(&NewAssessment {
            age: demographics.age,
            gender: demographics.gender.as_str().to_string(),
            profession: demographics.profession.clone(),
            track: scenario.track.as_str().to_string(),
            scenario: scenario.text.clone(),
            questions: questions.clone(),
        })
        .map_err(internal)?;

    state.logger.log(&AssessmentEvent::AssessmentCreated {
        id: id.clone(),
        track: scenario.track.to_string(),
        age: demographics.age,
    });
    state.publish(ApiEvent::AssessmentCreated {
        id: id.clone(),
        track: scenario.track.to_string(),
    });

    Ok((
        StatusCode::CREATED,
        Json(CreateAssessmentResponse {
            id,
            track: scenario.track,
            scenario: scenario.text,
            questions,
        }),
    ))
}

pub async fn get_assessment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AssessmentView>, ApiError> {
    let record = load(&state, &id)?;

    Ok(Json(AssessmentView {
        demographics: demographics_view(&record),
        id: record.id,
        status: record.status,
        track: record.track,
        scenario: record.scenario,
        questions: record.questions,
        responses: record.responses,
        created_at: record.created_at,
        completed_at: record.completed_at,
    }))
}

pub async fn submit_responses(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<SubmitResponsesRequest>,
) -> Result<Json<ResultView>, ApiError> {
    let record = load(&state, &id)?;
    if record.status == AssessmentStatus::Completed {
        return Err((StatusCode::CONFLICT, ALREADY_COMPLETED_MESSAGE.to_string()));
    }

    let answers = normalize_answers(req.answers);
    validate_answer_count(&answers, record.questions.len())
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let gender: Gender = record.gender.parse().map_err(internal)?;
    let demographics =
        Demographics::new(record.age as i64, gender, &record.profession).map_err(internal)?;

    let runner = state.runner.clone();
    let task_id = id.clone();
    let task_answers = answers.clone();
    let cancelled = Arc::new(AtomicBool::new(false));
    let task_cancelled = cancelled.clone();
    let task = tokio::task::spawn_blocking(move || {
        runner.run_until_cancelled(&task_id, &demographics, &task_answers, &task_cancelled)
    });

    let joined = match state.inference_timeout {
        Some(limit) => tokio::time::timeout(limit, task).await.map_err(|_| {
            // Blocking tasks cannot be aborted; stop it at its next checkpoint.
            cancelled.store(true, Ordering::Release);
            warn!(id = %id, "Scoring timed out");
            state.logger.log(&AssessmentEvent::AssessmentFailed {
                id: id.clone(),
                error: "timed out".to_string(),
            });
            (
                StatusCode::GATEWAY_TIMEOUT,
                "Analysis took too long. Please try again.".to_string(),
            )
        })?,
        None => task.await,
    };

    let report = match joined.map_err(internal)? {
        Ok(report) => report,
        Err(AssessmentError::Validation(e)) => {
            return Err((StatusCode::BAD_REQUEST, e.to_string()));
        }
        Err(AssessmentError::Model(e)) => {
            error!(id = %id, error = %e, "Model inference failed");
            return Err((StatusCode::BAD_GATEWAY, format!("Model error: {}", e)));
        }
        Err(AssessmentError::Cancelled) => {
            return Err((
                StatusCode::GATEWAY_TIMEOUT,
                "Analysis took too long. Please try again.".to_string(),
            ));
        }
    };

    let report_json = serde_json::to_value(&report).map_err(internal)?;
    let completed = state
        .db
        .assessments()
        .complete(
            &id,
            Completion {
                responses: &answers,
                report: &report_json,
                overall_score: report.overall_score,
                eq_level: report.eq_level.as_str(),
            },
        )
        .map_err(internal)?;

    if !completed {
        return Err((StatusCode::CONFLICT, ALREADY_COMPLETED_MESSAGE.to_string()));
    }

    state.publish(ApiEvent::AssessmentCompleted {
        id: id.clone(),
        overall_score: report.overall_score,
        eq_level: report.eq_level.to_string(),
    });

    Ok(Json(ResultView {
        id,
        demographics: demographics_view(&record),
        track: record.track,
        scenario: record.scenario,
        report,
    }))
}

pub async fn get_result(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResultView>, ApiError> {
    let record = load(&state, &id)?;

    let report = match (&record.status, &record.report) {
        (AssessmentStatus::Completed, Some(report)) => {
            serde_json::from_value::<AssessmentReport>(report.clone()).map_err(internal)?
        }
        _ => return Err((StatusCode::CONFLICT, RESULT_PENDING_MESSAGE.to_string())),
    };

    Ok(Json(ResultView {
        demographics: demographics_view(&record),
        id: record.id,
        track: record.track,
        scenario: record.scenario,
        report,
    }))
}
