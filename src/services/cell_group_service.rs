//! Cell groups and their memberships.
//!
//! Leadership invariants, all checked inside one transaction with the
//! candidate's member row locked:
//! - a leader is an active member holding an active leadership role
//! - a member leads at most one live cell
//! - a member is active in at most one cell, and a leader is an active
//!   member of their own cell with the `leader` role
//!
//! Partial unique indexes back the last two so concurrent writers that slip
//! past the checks still fail with a conflict.

use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use super::{patched_text, required_text, unique_conflict, ServiceError, ServiceResult};
use crate::database::models::cell_group::{
    AddCellMember, CellGroup, CellGroupPatch, CellGroupQuery, CellGroupSummary, CellMember, CellMemberDetail,
    NewCellGroup,
};
use crate::database::models::{clean_text, patch_text};
use crate::types::{CellRole, MemberStatus};

const CELL_CONSTRAINTS: &[(&str, &str)] = &[
    ("cell_groups_name_uniq", "A cell group with that name already exists"),
    ("cell_groups_leader_uniq", "Member already leads another cell group"),
    ("cell_members_active_uniq", "Member is already active in another cell group"),
];

const SUMMARY_SELECT: &str = r#"
    SELECT cg.*,
           m.first_name || ' ' || m.last_name AS leader_name,
           (SELECT COUNT(*) FROM cell_members cm
            WHERE cm.cell_group_id = cg.id AND cm.is_active) AS member_count
    FROM cell_groups cg
    LEFT JOIN members m ON m.id = cg.leader_id
"#;

/// What the database says about a leader candidate
#[derive(Debug, Clone, FromRow)]
pub struct LeaderFacts {
    pub status: MemberStatus,
    pub has_leadership_role: bool,
    /// Live cell the candidate currently leads
    pub leads_cell: Option<Uuid>,
    /// Cell the candidate is currently an active member of
    pub active_cell: Option<Uuid>,
}

/// Decide whether a candidate may lead `cell_id` (`None` for a cell not yet created).
pub fn check_leader(cell_id: Option<Uuid>, facts: &LeaderFacts) -> ServiceResult<()> {
    if facts.status != MemberStatus::Active {
        return Err(ServiceError::conflict(format!(
            "Cell leader must be an active member (member is {})",
            facts.status
        )));
    }
    if !facts.has_leadership_role {
        return Err(ServiceError::conflict("Cell leader must hold an active leadership role"));
    }
    if let Some(led) = facts.leads_cell {
        if Some(led) != cell_id {
            return Err(ServiceError::conflict("Member already leads another cell group"));
        }
    }
    if let Some(active) = facts.active_cell {
        if Some(active) != cell_id {
            return Err(ServiceError::conflict("Member is already active in another cell group"));
        }
    }
    Ok(())
}

/// Roles a member may be given through `add_member`
pub fn membership_role(requested: Option<CellRole>) -> ServiceResult<CellRole> {
    match requested.unwrap_or(CellRole::Member) {
        CellRole::Leader => Err(ServiceError::field(
            "role",
            "Leaders are assigned by setting the cell group's leader",
        )),
        role => Ok(role),
    }
}

pub struct CellGroupService {
    pool: PgPool,
}

impl CellGroupService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: NewCellGroup) -> ServiceResult<CellGroup> {
        let name = required_text("name", &input.name)?;

        let mut tx = self.pool.begin().await?;
        if let Some(leader_id) = input.leader_id {
            let facts = lock_leader_candidate(&mut tx, leader_id).await?;
            check_leader(None, &facts)?;
        }

        let group = sqlx::query_as::<_, CellGroup>(
            r#"
            INSERT INTO cell_groups (name, description, meeting_day, meeting_time, location, leader_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(clean_text(input.description))
        .bind(clean_text(input.meeting_day))
        .bind(clean_text(input.meeting_time))
        .bind(clean_text(input.location))
        .bind(input.leader_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| unique_conflict(e, CELL_CONSTRAINTS))?;

        if let Some(leader_id) = group.leader_id {
            upsert_leader_membership(&mut tx, group.id, leader_id).await?;
        }

        tx.commit().await?;
        tracing::info!("Created cell group {} ({})", group.name, group.id);
        Ok(group)
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<CellGroupSummary> {
        sqlx::query_as::<_, CellGroupSummary>(&format!(
            "{} WHERE cg.id = $1 AND cg.deleted_at IS NULL",
            SUMMARY_SELECT
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(cell_not_found)
    }

    pub async fn list(&self, query: CellGroupQuery) -> ServiceResult<Vec<CellGroupSummary>> {
        let groups = sqlx::query_as::<_, CellGroupSummary>(&format!(
            "{} WHERE cg.deleted_at IS NULL AND (NOT $1 OR cg.is_active) ORDER BY cg.name",
            SUMMARY_SELECT
        ))
        .bind(query.active_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    pub async fn update(&self, id: Uuid, patch: CellGroupPatch) -> ServiceResult<CellGroup> {
        let name = patched_text("name", patch.name)?;

        let mut tx = self.pool.begin().await?;
        let current = lock_cell(&mut tx, id).await?;

        let new_leader = patch.leader_id.unwrap_or(current.leader_id);
        let leader_changed = new_leader != current.leader_id;

        if leader_changed {
            if let Some(candidate) = new_leader {
                let facts = lock_leader_candidate(&mut tx, candidate).await?;
                check_leader(Some(id), &facts)?;
            }
            if let Some(previous) = current.leader_id {
                // The outgoing leader stays in the cell as an ordinary member
                sqlx::query(
                    r#"
                    UPDATE cell_members SET role = 'member'
                    WHERE cell_group_id = $1 AND member_id = $2 AND is_active AND role = 'leader'
                    "#,
                )
                .bind(id)
                .bind(previous)
                .execute(&mut *tx)
                .await?;
            }
        }

        let group = sqlx::query_as::<_, CellGroup>(
            r#"
            UPDATE cell_groups SET
                name = $2,
                description = $3,
                meeting_day = $4,
                meeting_time = $5,
                location = $6,
                leader_id = $7,
                is_active = $8,
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name.unwrap_or(current.name))
        .bind(patch_text(patch.description, current.description))
        .bind(patch_text(patch.meeting_day, current.meeting_day))
        .bind(patch_text(patch.meeting_time, current.meeting_time))
        .bind(patch_text(patch.location, current.location))
        .bind(new_leader)
        .bind(patch.is_active.unwrap_or(current.is_active))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| unique_conflict(e, CELL_CONSTRAINTS))?;

        if leader_changed {
            if let Some(leader_id) = new_leader {
                upsert_leader_membership(&mut tx, id, leader_id).await?;
            }
        }

        tx.commit().await?;
        if leader_changed {
            tracing::info!("Cell group {} leader changed {:?} -> {:?}", id, current.leader_id, new_leader);
        }
        Ok(group)
    }

    /// Soft delete. Ends every membership and clears the leader.
    pub async fn delete(&self, id: Uuid) -> ServiceResult<CellGroup> {
        let mut tx = self.pool.begin().await?;
        lock_cell(&mut tx, id).await?;

        sqlx::query(
            "UPDATE cell_members SET is_active = false, left_on = CURRENT_DATE WHERE cell_group_id = $1 AND is_active",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let group = sqlx::query_as::<_, CellGroup>(
            r#"
            UPDATE cell_groups
            SET deleted_at = now(), leader_id = NULL, is_active = false, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!("Deleted cell group {}", id);
        Ok(group)
    }

    pub async fn add_member(&self, cell_id: Uuid, input: AddCellMember) -> ServiceResult<CellMember> {
        let role = membership_role(input.role)?;

        let mut tx = self.pool.begin().await?;
        let cell = lock_cell(&mut tx, cell_id).await?;
        if !cell.is_active {
            return Err(ServiceError::conflict(format!(
                "Cell group '{}' is inactive; reactivate it before adding members",
                cell.name
            )));
        }

        let status: Option<(MemberStatus,)> =
            sqlx::query_as("SELECT status FROM members WHERE id = $1 AND deleted_at IS NULL FOR UPDATE")
                .bind(input.member_id)
                .fetch_optional(&mut *tx)
                .await?;
        match status {
            None => return Err(ServiceError::field("member_id", "Member not found")),
            Some((MemberStatus::Active,)) => {}
            Some((other,)) => {
                return Err(ServiceError::conflict(format!(
                    "Only active members can join a cell group (member is {})",
                    other
                )))
            }
        }

        let existing: Option<(Uuid,)> =
            sqlx::query_as("SELECT cell_group_id FROM cell_members WHERE member_id = $1 AND is_active")
                .bind(input.member_id)
                .fetch_optional(&mut *tx)
                .await?;
        if let Some((current_cell,)) = existing {
            return Err(ServiceError::conflict(if current_cell == cell_id {
                "Member is already a member of this cell group"
            } else {
                "Member is already active in another cell group"
            }));
        }

        let membership = sqlx::query_as::<_, CellMember>(
            "INSERT INTO cell_members (cell_group_id, member_id, role) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(cell_id)
        .bind(input.member_id)
        .bind(role)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| unique_conflict(e, CELL_CONSTRAINTS))?;

        tx.commit().await?;
        Ok(membership)
    }

    pub async fn remove_member(&self, cell_id: Uuid, member_id: Uuid) -> ServiceResult<CellMember> {
        let mut tx = self.pool.begin().await?;
        let cell = lock_cell(&mut tx, cell_id).await?;
        if cell.leader_id == Some(member_id) {
            return Err(ServiceError::conflict(
                "Cannot remove the cell leader; assign a new leader first",
            ));
        }

        let membership = sqlx::query_as::<_, CellMember>(
            r#"
            UPDATE cell_members SET is_active = false, left_on = CURRENT_DATE
            WHERE cell_group_id = $1 AND member_id = $2 AND is_active
            RETURNING *
            "#,
        )
        .bind(cell_id)
        .bind(member_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ServiceError::not_found("Member is not active in this cell group"))?;

        tx.commit().await?;
        Ok(membership)
    }

    pub async fn list_members(&self, cell_id: Uuid) -> ServiceResult<Vec<CellMemberDetail>> {
        let exists: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM cell_groups WHERE id = $1 AND deleted_at IS NULL")
                .bind(cell_id)
                .fetch_optional(&self.pool)
                .await?;
        if exists.is_none() {
            return Err(cell_not_found());
        }

        let members = sqlx::query_as::<_, CellMemberDetail>(
            r#"
            SELECT cm.*, m.first_name, m.last_name
            FROM cell_members cm
            JOIN members m ON m.id = cm.member_id
            WHERE cm.cell_group_id = $1 AND cm.is_active
            ORDER BY (cm.role = 'leader') DESC, m.last_name, m.first_name
            "#,
        )
        .bind(cell_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }
}

fn cell_not_found() -> ServiceError {
    ServiceError::not_found("Cell group not found")
}

async fn lock_cell(conn: &mut PgConnection, id: Uuid) -> ServiceResult<CellGroup> {
    sqlx::query_as::<_, CellGroup>("SELECT * FROM cell_groups WHERE id = $1 AND deleted_at IS NULL FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(cell_not_found)
}

/// Lock the candidate's member row and gather what the leader check needs.
async fn lock_leader_candidate(conn: &mut PgConnection, member_id: Uuid) -> ServiceResult<LeaderFacts> {
    sqlx::query_as::<_, LeaderFacts>(
        r#"
        SELECT
            m.status,
            EXISTS (SELECT 1 FROM leadership_roles lr
                    WHERE lr.member_id = m.id AND lr.is_active) AS has_leadership_role,
            (SELECT cg.id FROM cell_groups cg
             WHERE cg.leader_id = m.id AND cg.deleted_at IS NULL
             LIMIT 1) AS leads_cell,
            (SELECT cm.cell_group_id FROM cell_members cm
             WHERE cm.member_id = m.id AND cm.is_active
             LIMIT 1) AS active_cell
        FROM members m
        WHERE m.id = $1 AND m.deleted_at IS NULL
        FOR UPDATE
        "#,
    )
    .bind(member_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| ServiceError::field("leader_id", "Leader member not found"))
}

/// Promote an existing active membership in this cell to `leader`, or insert one.
async fn upsert_leader_membership(conn: &mut PgConnection, cell_id: Uuid, member_id: Uuid) -> ServiceResult<()> {
    let promoted = sqlx::query(
        "UPDATE cell_members SET role = 'leader' WHERE cell_group_id = $1 AND member_id = $2 AND is_active",
    )
    .bind(cell_id)
    .bind(member_id)
    .execute(&mut *conn)
    .await?;

    if promoted.rows_affected() == 0 {
        sqlx::query("INSERT INTO cell_members (cell_group_id, member_id, role) VALUES ($1, $2, 'leader')")
            .bind(cell_id)
            .bind(member_id)
            .execute(&mut *conn)
            .await
            .map_err(|e| unique_conflict(e, CELL_CONSTRAINTS))?;
    }
    Ok(())
}
