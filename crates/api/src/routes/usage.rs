//! Metered feature routes and usage summary

use axum::{
    extract::{Extension, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use studyhall_shared::QuestionType;

use crate::{auth::AuthUser, error::ApiError, state::AppState};

/// Query params for question generation
#[derive(Debug, Deserialize)]
pub struct QuestionQuery {
    #[serde(rename = "type")]
    pub question_type: Option<String>,
}

/// Query params for audio generation
#[derive(Debug, Deserialize)]
pub struct AudioQuery {
    pub minutes: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct QuestionResponse {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct AudioResponse {
    pub audio_url: String,
    pub minutes: f64,
}

/// Usage summary response
#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub is_premium: bool,
    pub questions_generated: i32,
    pub question_limit: i32,
    pub audio_minutes_used: f64,
    pub audio_minutes_limit: f64,
    pub image_actions: i32,
}

/// Gate-and-consume, then generate a practice question
///
/// The generation itself is a stubbed external collaborator; this route
/// owns the quota decision.
pub async fn generate_question(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<QuestionQuery>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let question_type: QuestionType = query
        .question_type
        .as_deref()
        .unwrap_or("mcq")
        .parse()
        .map_err(ApiError::BadRequest)?;

    state
        .quota
        .consume_question(auth_user.user_id, question_type)
        .await?;

    Ok(Json(QuestionResponse {
        question: format!("Sample {} question.", question_type),
    }))
}

/// Gate-and-consume, then generate audio
pub async fn generate_audio(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<AudioQuery>,
) -> Result<Json<AudioResponse>, ApiError> {
    let minutes = query.minutes.unwrap_or(1.0);

    state.quota.consume_audio(auth_user.user_id, minutes).await?;

    Ok(Json(AudioResponse {
        audio_url: "https://cdn.studyhall.example/audio/output.mp3".to_string(),
        minutes,
    }))
}

/// Current counters and ceilings for the authenticated account
pub async fn get_usage(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<UsageResponse>, ApiError> {
    let usage = state.quota.usage(auth_user.user_id).await?;

    Ok(Json(UsageResponse {
        is_premium: usage.is_premium,
        questions_generated: usage.questions_generated,
        question_limit: usage.question_limit,
        audio_minutes_used: usage.audio_minutes_used,
        audio_minutes_limit: usage.audio_minutes_limit,
        image_actions: usage.image_actions,
    }))
}
