use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{patched_text, required_text, Actor, ServiceError, ServiceResult};
use crate::database::models::{clean_text, patch_text};
use crate::database::models::prayer::{NewPrayerRequest, PrayerPatch, PrayerQuery, PrayerRequest};
use crate::types::{AccessLevel, PrayerStatus};

pub struct PrayerService {
    pool: PgPool,
}

/// Confidential requests are visible to their author and to full users
pub fn can_view(request: &PrayerRequest, viewer: &Actor) -> bool {
    !request.is_confidential || request.created_by == Some(viewer.user_id) || viewer.access >= AccessLevel::Full
}

/// `answered_at` after a status change
pub fn answered_at(
    current: PrayerStatus,
    current_answered_at: Option<DateTime<Utc>>,
    next: PrayerStatus,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match next {
        PrayerStatus::Answered if current != PrayerStatus::Answered => Some(now),
        PrayerStatus::Open => None,
        _ => current_answered_at,
    }
}

impl PrayerService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: NewPrayerRequest, actor: &Actor) -> ServiceResult<PrayerRequest> {
        let title = required_text("title", &input.title)?;
        if let Some(member_id) = input.member_id {
            let found: Option<(Uuid,)> =
                sqlx::query_as("SELECT id FROM members WHERE id = $1 AND deleted_at IS NULL")
                    .bind(member_id)
                    .fetch_optional(&self.pool)
                    .await?;
            if found.is_none() {
                return Err(ServiceError::field("member_id", "Member not found"));
            }
        }

        let request = sqlx::query_as::<_, PrayerRequest>(
            r#"
            INSERT INTO prayer_requests (member_id, title, body, is_confidential, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(input.member_id)
        .bind(title)
        .bind(clean_text(input.body))
        .bind(input.is_confidential)
        .bind(actor.user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(request)
    }

    pub async fn get(&self, id: Uuid, viewer: &Actor) -> ServiceResult<PrayerRequest> {
        sqlx::query_as::<_, PrayerRequest>("SELECT * FROM prayer_requests WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .filter(|r| can_view(r, viewer))
            .ok_or_else(request_not_found)
    }

    pub async fn list(&self, query: PrayerQuery, viewer: &Actor) -> ServiceResult<Vec<PrayerRequest>> {
        let requests = sqlx::query_as::<_, PrayerRequest>(
            r#"
            SELECT * FROM prayer_requests
            WHERE deleted_at IS NULL
              AND ($1::text IS NULL OR status = $1)
              AND ($2 OR NOT is_confidential OR created_by = $3)
            ORDER BY created_at DESC
            "#,
        )
        .bind(query.status)
        .bind(viewer.access >= AccessLevel::Full)
        .bind(viewer.user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    pub async fn update(&self, id: Uuid, patch: PrayerPatch, viewer: &Actor) -> ServiceResult<PrayerRequest> {
        let title = patched_text("title", patch.title)?;

        let mut tx = self.pool.begin().await?;
        let current = sqlx::query_as::<_, PrayerRequest>(
            "SELECT * FROM prayer_requests WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .filter(|r| can_view(r, viewer))
        .ok_or_else(request_not_found)?;

        let status = patch.status.unwrap_or(current.status);
        let stamped = answered_at(current.status, current.answered_at, status, Utc::now());

        let updated = sqlx::query_as::<_, PrayerRequest>(
            r#"
            UPDATE prayer_requests SET
                title = $2,
                body = $3,
                is_confidential = $4,
                status = $5,
                answered_at = $6,
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(title.unwrap_or(current.title))
        .bind(patch_text(patch.body, current.body))
        .bind(patch.is_confidential.unwrap_or(current.is_confidential))
        .bind(status)
        .bind(stamped)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid, viewer: &Actor) -> ServiceResult<PrayerRequest> {
        // Visibility check first so hidden requests read as missing
        self.get(id, viewer).await?;
        sqlx::query_as::<_, PrayerRequest>(
            "UPDATE prayer_requests SET deleted_at = now(), updated_at = now() WHERE id = $1 AND deleted_at IS NULL RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(request_not_found)
    }
}

fn request_not_found() -> ServiceError {
    ServiceError::not_found("Prayer request not found")
}
