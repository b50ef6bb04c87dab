//! Usage quota ledger
//!
//! Gate-and-consume for metered features. Every consume is a single
//! conditional UPDATE carrying the ceiling in its WHERE clause, so two
//! concurrent requests can never both pass the check and overshoot the
//! free quota.

use sqlx::PgPool;

use studyhall_shared::{QuestionType, UserProfile, FREE_AUDIO_MINUTES, FREE_QUESTION_LIMIT};

use crate::error::{BillingError, BillingResult};

/// Counters and ceilings for the usage endpoint
#[derive(Debug, Clone, serde::Serialize)]
pub struct QuotaUsage {
    pub is_premium: bool,
    pub questions_generated: i32,
    pub question_limit: i32,
    pub audio_minutes_used: f64,
    pub audio_minutes_limit: f64,
    pub image_actions: i32,
}

/// Tracks per-account consumption against free-tier ceilings
#[derive(Clone)]
pub struct QuotaLedger {
    pool: PgPool,
}

impl QuotaLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Load an account's profile, creating it lazily on first use
    pub async fn profile(&self, user_id: i64) -> BillingResult<UserProfile> {
        sqlx::query(
            "INSERT INTO user_profiles (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        let profile: UserProfile = sqlx::query_as(
            r#"
            SELECT user_id, is_premium, questions_generated, audio_minutes_used,
                   image_actions, created_at, updated_at
            FROM user_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(profile)
    }

    /// Gate and consume one question generation
    ///
    /// Premium accounts bypass ceilings and counters entirely. For free
    /// accounts the ceiling is reported before the premium gate, so an
    /// exhausted account always hears "quota" even when it also asked
    /// for a premium-gated type; the conditional UPDATE below remains
    /// the authoritative check.
    pub async fn consume_question(
        &self,
        user_id: i64,
        question_type: QuestionType,
    ) -> BillingResult<()> {
        let profile = self.profile(user_id).await?;
        if profile.is_premium {
            return Ok(());
        }

        if profile.questions_generated >= FREE_QUESTION_LIMIT {
            return Err(BillingError::QuestionQuotaExceeded);
        }

        if question_type.requires_premium() {
            tracing::debug!(
                user_id = user_id,
                question_type = %question_type,
                "Premium-gated question type refused for free account"
            );
            return Err(BillingError::PremiumRequired);
        }

        let updated: Option<(i32,)> = sqlx::query_as(
            r#"
            UPDATE user_profiles
            SET questions_generated = questions_generated + 1, updated_at = NOW()
            WHERE user_id = $1 AND is_premium = FALSE AND questions_generated < $2
            RETURNING questions_generated
            "#,
        )
        .bind(user_id)
        .bind(FREE_QUESTION_LIMIT)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some((count,)) => {
                tracing::debug!(
                    user_id = user_id,
                    questions_generated = count,
                    "Question quota consumed"
                );
                Ok(())
            }
            // Zero rows: either the ceiling was hit, or a concurrent
            // payment flipped the account premium between the read and the
            // update. Re-read to tell them apart.
            None => {
                let profile = self.profile(user_id).await?;
                if profile.is_premium {
                    Ok(())
                } else {
                    Err(BillingError::QuestionQuotaExceeded)
                }
            }
        }
    }

    /// Gate and consume audio minutes
    pub async fn consume_audio(&self, user_id: i64, minutes: f64) -> BillingResult<()> {
        if !minutes.is_finite() || minutes <= 0.0 {
            return Err(BillingError::InvalidInput(format!(
                "minutes must be a positive number, got {}",
                minutes
            )));
        }

        let profile = self.profile(user_id).await?;
        if profile.is_premium {
            return Ok(());
        }

        let updated: Option<(f64,)> = sqlx::query_as(
            r#"
            UPDATE user_profiles
            SET audio_minutes_used = audio_minutes_used + $2, updated_at = NOW()
            WHERE user_id = $1 AND is_premium = FALSE
              AND audio_minutes_used + $2 <= $3
            RETURNING audio_minutes_used
            "#,
        )
        .bind(user_id)
        .bind(minutes)
        .bind(FREE_AUDIO_MINUTES)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some((used,)) => {
                tracing::debug!(
                    user_id = user_id,
                    audio_minutes_used = used,
                    "Audio quota consumed"
                );
                Ok(())
            }
            None => {
                let profile = self.profile(user_id).await?;
                if profile.is_premium {
                    Ok(())
                } else {
                    Err(BillingError::AudioQuotaExceeded)
                }
            }
        }
    }

    /// Current counters and ceilings for an account
    pub async fn usage(&self, user_id: i64) -> BillingResult<QuotaUsage> {
        let profile = self.profile(user_id).await?;
        Ok(QuotaUsage {
            is_premium: profile.is_premium,
            questions_generated: profile.questions_generated,
            question_limit: FREE_QUESTION_LIMIT,
            audio_minutes_used: profile.audio_minutes_used,
            audio_minutes_limit: FREE_AUDIO_MINUTES,
            image_actions: profile.image_actions,
        })
    }

    /// Monthly reset: zero all counters for every non-premium profile
    ///
    /// One statement, so each profile's reset-vs-consume race resolves to
    /// a single row-level ordering rather than a partial merge. Premium
    /// profiles are untouched.
    pub async fn reset_usage(&self) -> BillingResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE user_profiles
            SET questions_generated = 0,
                audio_minutes_used = 0,
                image_actions = 0,
                updated_at = NOW()
            WHERE is_premium = FALSE
            "#,
        )
        .execute(&self.pool)
        .await?;

        let count = result.rows_affected();
        tracing::info!(reset_profiles = count, "Monthly usage reset completed");
        Ok(count)
    }
}
