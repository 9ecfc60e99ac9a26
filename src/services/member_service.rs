use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::{patched_text, required_text, ServiceError, ServiceResult};
use crate::config;
use crate::database::models::member::{Member, MemberPatch, MemberQuery, NewMember};
use crate::database::models::{clean_text, patch_text, Page};
use crate::filter::{bind_params, ColumnSpec, Filter, FilterData};
use crate::types::MemberStatus;

/// Columns reachable from `POST /api/members/find`
const MEMBER_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new("id", "uuid"),
    ColumnSpec::new("first_name", "text"),
    ColumnSpec::new("last_name", "text"),
    ColumnSpec::new("email", "text"),
    ColumnSpec::new("phone", "text"),
    ColumnSpec::new("birth_date", "date"),
    ColumnSpec::new("gender", "text"),
    ColumnSpec::new("address", "text"),
    ColumnSpec::new("status", "text"),
    ColumnSpec::new("joined_on", "date"),
    ColumnSpec::new("created_at", "timestamptz"),
    ColumnSpec::new("updated_at", "timestamptz"),
];

pub struct MemberService {
    pool: PgPool,
}

impl MemberService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: NewMember) -> ServiceResult<Member> {
        let first_name = required_text("first_name", &input.first_name)?;
        let last_name = required_text("last_name", &input.last_name)?;
        let email = validate_email(clean_text(input.email))?;
        let status = input.status.unwrap_or(MemberStatus::Active);
        if status == MemberStatus::Inactive {
            return Err(ServiceError::field("status", "Members become inactive only by recording an exit"));
        }

        let member = sqlx::query_as::<_, Member>(
            r#"
            INSERT INTO members
                (first_name, last_name, email, phone, birth_date, gender, address, status, joined_on, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .bind(clean_text(input.phone))
        .bind(input.birth_date)
        .bind(clean_text(input.gender))
        .bind(clean_text(input.address))
        .bind(status)
        .bind(input.joined_on)
        .bind(clean_text(input.notes))
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("Created member {} ({} {})", member.id, member.first_name, member.last_name);
        Ok(member)
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<Member> {
        sqlx::query_as::<_, Member>("SELECT * FROM members WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(member_not_found)
    }

    pub async fn list(&self, query: MemberQuery) -> ServiceResult<Page<Member>> {
        let limit = config::config().page_size(query.limit);
        let offset = query.offset.unwrap_or(0).max(0);
        let search = clean_text(query.search).map(|s| format!("%{}%", s));

        const WHERE: &str = r#"
            WHERE deleted_at IS NULL
              AND ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR first_name ILIKE $2 OR last_name ILIKE $2 OR email ILIKE $2)
              AND ($3::uuid IS NULL OR EXISTS (
                    SELECT 1 FROM cell_members cm
                    WHERE cm.member_id = members.id AND cm.cell_group_id = $3 AND cm.is_active))
        "#;

        let items = sqlx::query_as::<_, Member>(&format!(
            "SELECT * FROM members {} ORDER BY last_name, first_name, id LIMIT $4 OFFSET $5",
            WHERE
        ))
        .bind(query.status)
        .bind(search.as_deref())
        .bind(query.cell_group_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM members {}", WHERE))
            .bind(query.status)
            .bind(search.as_deref())
            .bind(query.cell_group_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(Page { items, total: total.0, limit, offset })
    }

    pub async fn find(&self, data: FilterData) -> ServiceResult<Page<Member>> {
        let mut filter = Filter::new("members", MEMBER_COLUMNS);
        filter.assign(data)?;
        let (limit, offset) = filter.page();

        let select = filter.to_sql()?;
        let items = bind_params(sqlx::query_as::<_, Member>(&select.query), &select.params)
            .fetch_all(&self.pool)
            .await?;

        let count = filter.to_count_sql()?;
        let total: (i64,) = bind_params(sqlx::query_as(&count.query), &count.params)
            .fetch_one(&self.pool)
            .await?;

        Ok(Page { items, total: total.0, limit, offset })
    }

    pub async fn update(&self, id: Uuid, patch: MemberPatch) -> ServiceResult<Member> {
        let first_name = patched_text("first_name", patch.first_name)?;
        let last_name = patched_text("last_name", patch.last_name)?;
        let email = patch.email.map(|e| validate_email(clean_text(e))).transpose()?;

        let mut tx = self.pool.begin().await?;
        let current = lock_member(&mut tx, id).await?;
        if let Some(requested) = patch.status {
            check_status_change(current.status, requested)?;
            if current.status == MemberStatus::Active && requested != MemberStatus::Active {
                if let Some(cell) = leading_cell(&mut tx, id).await? {
                    return Err(ServiceError::conflict(format!(
                        "Member leads cell group '{}'; assign a new leader before changing status",
                        cell
                    )));
                }
            }
        }

        let member = sqlx::query_as::<_, Member>(
            r#"
            UPDATE members SET
                first_name = $2,
                last_name = $3,
                email = $4,
                phone = $5,
                birth_date = $6,
                gender = $7,
                address = $8,
                status = $9,
                joined_on = $10,
                notes = $11,
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(first_name.unwrap_or(current.first_name))
        .bind(last_name.unwrap_or(current.last_name))
        .bind(email.unwrap_or(current.email))
        .bind(patch_text(patch.phone, current.phone))
        .bind(patch.birth_date.unwrap_or(current.birth_date))
        .bind(patch_text(patch.gender, current.gender))
        .bind(patch_text(patch.address, current.address))
        .bind(patch.status.unwrap_or(current.status))
        .bind(patch.joined_on.unwrap_or(current.joined_on))
        .bind(patch_text(patch.notes, current.notes))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(member)
    }

    /// Soft delete. Ends the member's cell membership; refused while they lead a cell.
    pub async fn delete(&self, id: Uuid) -> ServiceResult<Member> {
        let mut tx = self.pool.begin().await?;
        lock_member(&mut tx, id).await?;

        if let Some(cell) = leading_cell(&mut tx, id).await? {
            return Err(ServiceError::conflict(format!(
                "Member leads cell group '{}'; assign a new leader first",
                cell
            )));
        }

        sqlx::query("UPDATE cell_members SET is_active = false, left_on = CURRENT_DATE WHERE member_id = $1 AND is_active")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let member = sqlx::query_as::<_, Member>(
            "UPDATE members SET deleted_at = now(), updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!("Deleted member {}", id);
        Ok(member)
    }
}

/// Name of the live cell group the member leads, if any
pub(crate) async fn leading_cell(conn: &mut PgConnection, member_id: Uuid) -> ServiceResult<Option<String>> {
    let leads: Option<(String,)> =
        sqlx::query_as("SELECT name FROM cell_groups WHERE leader_id = $1 AND deleted_at IS NULL")
            .bind(member_id)
            .fetch_optional(conn)
            .await?;
    Ok(leads.map(|(name,)| name))
}

/// Lock a live member row for the rest of the transaction.
pub(crate) async fn lock_member(conn: &mut PgConnection, id: Uuid) -> ServiceResult<Member> {
    sqlx::query_as::<_, Member>("SELECT * FROM members WHERE id = $1 AND deleted_at IS NULL FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(member_not_found)
}

/// Error for a member id that does not resolve to a live member
pub(crate) fn member_not_found() -> ServiceError {
    ServiceError::not_found("Member not found")
}

/// Only active and visitor may be swapped directly; `inactive` belongs to exits.
pub fn check_status_change(current: MemberStatus, requested: MemberStatus) -> ServiceResult<()> {
    if current == requested {
        return Ok(());
    }
    match (current, requested) {
        (_, MemberStatus::Inactive) => Err(ServiceError::conflict("Record an exit to make a member inactive")),
        (MemberStatus::Inactive, _) => Err(ServiceError::conflict(
            "Reinstate the member's exit to make them active again",
        )),
        _ => Ok(()),
    }
}

fn validate_email(email: Option<String>) -> ServiceResult<Option<String>> {
    match email {
        Some(e) if !e.contains('@') => Err(ServiceError::field("email", "Email address must contain '@'")),
        other => Ok(other),
    }
}
