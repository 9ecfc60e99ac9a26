use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use super::member_service::member_not_found;
use super::{patched_text, required_text, Actor, ServiceError, ServiceResult};
use crate::config;
use crate::database::models::{clean_text, patch_text};
use crate::database::models::giving::{
    DateRange, FundTotal, Gift, GiftPatch, GivingQuery, GivingSummary, NewGift,
};
use crate::database::models::Page;
use crate::types::GivingMethod;

/// Largest amount NUMERIC(12, 2) holds: 999_999_999_999 at scale 2, split into 32-bit words
const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

pub struct GivingService {
    pool: PgPool,
}

/// Positive, at most two decimal places, fits the column
pub fn validate_amount(amount: Decimal) -> ServiceResult<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(ServiceError::field("amount", "Amount must be greater than zero"));
    }
    let normalized = amount.normalize();
    if normalized.scale() > 2 {
        return Err(ServiceError::field("amount", "Amount can have at most two decimal places"));
    }
    if normalized > MAX_AMOUNT {
        return Err(ServiceError::field("amount", "Amount is too large"));
    }
    Ok(normalized)
}

fn validate_range(from: Option<chrono::NaiveDate>, to: Option<chrono::NaiveDate>) -> ServiceResult<()> {
    match (from, to) {
        (Some(from), Some(to)) if from > to => Err(ServiceError::validation("'from' must not be after 'to'")),
        _ => Ok(()),
    }
}

impl GivingService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, input: NewGift, actor: &Actor) -> ServiceResult<Gift> {
        let amount = validate_amount(input.amount)?;
        let fund = required_text("fund", &input.fund)?;
        if let Some(member_id) = input.member_id {
            self.ensure_member(member_id).await?;
        }

        let gift = sqlx::query_as::<_, Gift>(
            r#"
            INSERT INTO giving_log (member_id, amount, fund, method, given_on, reference, notes, recorded_by)
            VALUES ($1, $2, $3, $4, COALESCE($5, CURRENT_DATE), $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(input.member_id)
        .bind(amount)
        .bind(fund)
        .bind(input.method.unwrap_or(GivingMethod::Cash))
        .bind(input.given_on)
        .bind(clean_text(input.reference))
        .bind(clean_text(input.notes))
        .bind(actor.user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(gift)
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<Gift> {
        sqlx::query_as::<_, Gift>("SELECT * FROM giving_log WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(gift_not_found)
    }

    pub async fn list(&self, query: GivingQuery) -> ServiceResult<Page<Gift>> {
        validate_range(query.from, query.to)?;
        let limit = config::config().page_size(query.limit);
        let offset = query.offset.unwrap_or(0).max(0);
        let fund = clean_text(query.fund);

        const WHERE: &str = r#"
            WHERE deleted_at IS NULL
              AND ($1::uuid IS NULL OR member_id = $1)
              AND ($2::text IS NULL OR lower(fund) = lower($2))
              AND ($3::date IS NULL OR given_on >= $3)
              AND ($4::date IS NULL OR given_on <= $4)
        "#;

        let items = sqlx::query_as::<_, Gift>(&format!(
            "SELECT * FROM giving_log {} ORDER BY given_on DESC, created_at DESC LIMIT $5 OFFSET $6",
            WHERE
        ))
        .bind(query.member_id)
        .bind(fund.as_deref())
        .bind(query.from)
        .bind(query.to)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM giving_log {}", WHERE))
            .bind(query.member_id)
            .bind(fund.as_deref())
            .bind(query.from)
            .bind(query.to)
            .fetch_one(&self.pool)
            .await?;

        Ok(Page { items, total: total.0, limit, offset })
    }

    pub async fn update(&self, id: Uuid, patch: GiftPatch) -> ServiceResult<Gift> {
        let amount = patch.amount.map(validate_amount).transpose()?;
        let fund = patched_text("fund", patch.fund)?;

        let mut tx = self.pool.begin().await?;
        let current = sqlx::query_as::<_, Gift>(
            "SELECT * FROM giving_log WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(gift_not_found)?;

        let gift = sqlx::query_as::<_, Gift>(
            r#"
            UPDATE giving_log SET
                amount = $2,
                fund = $3,
                method = $4,
                given_on = $5,
                reference = $6,
                notes = $7
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(amount.unwrap_or(current.amount))
        .bind(fund.unwrap_or(current.fund))
        .bind(patch.method.unwrap_or(current.method))
        .bind(patch.given_on.unwrap_or(current.given_on))
        .bind(patch_text(patch.reference, current.reference))
        .bind(patch_text(patch.notes, current.notes))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(gift)
    }

    pub async fn delete(&self, id: Uuid) -> ServiceResult<Gift> {
        sqlx::query_as::<_, Gift>(
            "UPDATE giving_log SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(gift_not_found)
    }

    /// Per-fund totals for one member over an optional date range
    pub async fn member_summary(&self, member_id: Uuid, range: DateRange) -> ServiceResult<GivingSummary> {
        validate_range(range.from, range.to)?;
        self.ensure_member(member_id).await?;

        let funds = sqlx::query_as::<_, FundTotal>(
            r#"
            SELECT fund, SUM(amount) AS total, COUNT(*) AS gifts
            FROM giving_log
            WHERE member_id = $1 AND deleted_at IS NULL
              AND ($2::date IS NULL OR given_on >= $2)
              AND ($3::date IS NULL OR given_on <= $3)
            GROUP BY fund
            ORDER BY fund
            "#,
        )
        .bind(member_id)
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&self.pool)
        .await?;

        Ok(GivingSummary {
            member_id,
            from: range.from,
            to: range.to,
            total: funds.iter().map(|f| f.total).sum(),
            gifts: funds.iter().map(|f| f.gifts).sum(),
            funds,
        })
    }

    async fn ensure_member(&self, member_id: Uuid) -> ServiceResult<()> {
        let found: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM members WHERE id = $1 AND deleted_at IS NULL")
            .bind(member_id)
            .fetch_optional(&self.pool)
            .await?;
        found.map(|_| ()).ok_or_else(member_not_found)
    }
}

fn gift_not_found() -> ServiceError {
    ServiceError::not_found("Gift not found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::member::NewMember;
    use crate::services::MemberService;
    use crate::testing::TestContext;
    use crate::types::AccessLevel;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn amounts_are_positive_with_cents() {
        assert_eq!(validate_amount(dec("25.50")).unwrap(), dec("25.5"));
        assert!(validate_amount(dec("10.500")).is_ok());
        assert!(validate_amount(dec("0")).is_err());
        assert!(validate_amount(dec("-5")).is_err());
        assert!(validate_amount(dec("1.005")).is_err());
        assert!(validate_amount(dec("9999999999.99")).is_ok());
        assert!(validate_amount(dec("10000000000")).is_err());
    }

    #[test]
    fn max_amount_matches_column_precision() {
        assert_eq!(MAX_AMOUNT, dec("9999999999.99"));
        assert_eq!(MAX_AMOUNT.scale(), 2);
    }

    #[test]
    fn ranges_must_be_ordered() {
        let d = |s: &str| chrono::NaiveDate::from_str(s).ok();
        assert!(validate_range(d("2024-01-01"), d("2024-12-31")).is_ok());
        assert!(validate_range(d("2024-12-31"), d("2024-01-01")).is_err());
        assert!(validate_range(None, d("2024-01-01")).is_ok());
    }

    #[tokio::test]
    async fn summary_totals_per_fund() {
        let Some(ctx) = TestContext::try_new().await else { return };
        let member = MemberService::new(ctx.pool.clone())
            .create(NewMember { first_name: "Widow".into(), last_name: "Zarephath".into(), ..Default::default() })
            .await
            .unwrap();
        let giving = GivingService::new(ctx.pool.clone());
        let actor = Actor { user_id: Uuid::new_v4(), access: AccessLevel::Edit };

        for (amount, fund) in [("10.00", "tithe"), ("2.50", "tithe"), ("40", "missions")] {
            giving
                .record(
                    NewGift {
                        member_id: Some(member.id),
                        amount: dec(amount),
                        fund: fund.into(),
                        method: None,
                        given_on: None,
                        reference: None,
                        notes: None,
                    },
                    &actor,
                )
                .await
                .unwrap();
        }

        let summary = giving.member_summary(member.id, DateRange::default()).await.unwrap();
        assert_eq!(summary.total, dec("52.50"));
        assert_eq!(summary.gifts, 3);
        assert_eq!(summary.funds.len(), 2);
        assert_eq!(summary.funds[1].fund, "tithe");
        assert_eq!(summary.funds[1].total, dec("12.50"));

        let err = giving
            .record(
                NewGift {
                    member_id: Some(Uuid::new_v4()),
                    amount: dec("1"),
                    fund: "tithe".into(),
                    method: None,
                    given_on: None,
                    reference: None,
                    notes: None,
                },
                &actor,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        ctx.cleanup().await;
    }

    #[tokio::test]
    async fn null_patch_clears_gift_notes() {
        let Some(ctx) = TestContext::try_new().await else { return };
        let giving = GivingService::new(ctx.pool.clone());
        let actor = Actor { user_id: Uuid::new_v4(), access: AccessLevel::Edit };

        let gift = giving
            .record(
                NewGift {
                    member_id: None,
                    amount: dec("20"),
                    fund: "building".into(),
                    method: Some(GivingMethod::Check),
                    given_on: None,
                    reference: Some("#1042".into()),
                    notes: Some("loose offering".into()),
                },
                &actor,
            )
            .await
            .unwrap();

        let patch: GiftPatch = serde_json::from_value(serde_json::json!({ "notes": null, "amount": "25" })).unwrap();
        let updated = giving.update(gift.id, patch).await.unwrap();
        assert_eq!(updated.notes, None);
        assert_eq!(updated.reference.as_deref(), Some("#1042"));
        assert_eq!(updated.amount, dec("25"));
        assert_eq!(updated.method, GivingMethod::Check);

        ctx.cleanup().await;
    }
}
