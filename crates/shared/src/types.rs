//! Common types used across Studyhall

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// Free-tier ceilings
// =============================================================================

/// Questions a free account may generate per reset period
pub const FREE_QUESTION_LIMIT: i32 = 20;

/// Audio minutes a free account may consume per reset period
pub const FREE_AUDIO_MINUTES: f64 = 10.0;

// =============================================================================
// Enums
// =============================================================================

/// Lifecycle status of a payment record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

impl Default for PaymentStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown payment status: {}", other)),
        }
    }
}

/// Kind of practice question a user can generate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Mcq,
    Theory,
    TrueFalse,
    FillIn,
}

impl QuestionType {
    /// Premium-gated variants are refused for free accounts regardless of
    /// remaining quota
    pub fn requires_premium(&self) -> bool {
        matches!(self, Self::Theory | Self::TrueFalse | Self::FillIn)
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mcq => write!(f, "mcq"),
            Self::Theory => write!(f, "theory"),
            Self::TrueFalse => write!(f, "true_false"),
            Self::FillIn => write!(f, "fill_in"),
        }
    }
}

impl std::str::FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mcq" => Ok(Self::Mcq),
            "theory" => Ok(Self::Theory),
            "true_false" => Ok(Self::TrueFalse),
            "fill_in" => Ok(Self::FillIn),
            other => Err(format!("unknown question type: {}", other)),
        }
    }
}

// =============================================================================
// Records
// =============================================================================

/// One completed or attempted payment, keyed by the gateway's reference
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub user_id: i64,
    /// Gateway-assigned transaction reference, globally unique
    pub gateway_reference: String,
    /// Major currency units (the gateway reports minor units)
    pub amount: Decimal,
    pub currency: String,
    pub payment_method: String,
    pub status: PaymentStatus,
    pub raw_payload: Option<serde_json::Value>,
    pub created_at: OffsetDateTime,
    pub completed_at: Option<OffsetDateTime>,
}

/// Per-account usage and entitlement state, created lazily on first use
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserProfile {
    pub user_id: i64,
    pub is_premium: bool,
    pub questions_generated: i32,
    pub audio_minutes_used: f64,
    pub image_actions: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}
