//! Exits and reinstatements. Every state change writes an `exit_audit` row
//! with before/after snapshots in the same transaction as the change.

use chrono::Utc;
use serde_json::{json, Value};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use super::member_service::{lock_member, member_not_found};
use super::{Actor, ServiceError, ServiceResult};
use crate::database::models::member::Member;
use crate::database::models::{clean_text, patch_text};
use crate::database::models::exit::{Exit, ExitAudit, ExitPatch, ExitQuery, NewExit, Reinstatement};
use crate::types::{AuditAction, CellRole, ExitStatus, ExitType, MemberStatus};

pub struct ExitService {
    pool: PgPool,
}

/// Member state captured into the audit trail
#[derive(Debug, Clone, FromRow)]
struct MemberSnapshot {
    status: MemberStatus,
    cell_group_id: Option<Uuid>,
    cell_role: Option<CellRole>,
    leads_cell_id: Option<Uuid>,
}

impl MemberSnapshot {
    fn to_json(&self) -> Value {
        json!({
            "member_status": self.status,
            "cell_group_id": self.cell_group_id,
            "cell_role": self.cell_role,
            "leads_cell_id": self.leads_cell_id,
        })
    }
}

pub fn check_can_exit(status: MemberStatus) -> ServiceResult<()> {
    if status == MemberStatus::Inactive {
        return Err(ServiceError::conflict("Member is already inactive"));
    }
    Ok(())
}

pub fn check_can_update(exit: &Exit) -> ServiceResult<()> {
    if exit.status == ExitStatus::Reinstated {
        return Err(ServiceError::conflict("A reinstated exit can no longer be changed"));
    }
    Ok(())
}

pub fn check_can_reinstate(exit: &Exit) -> ServiceResult<()> {
    if exit.status == ExitStatus::Reinstated {
        return Err(ServiceError::conflict("Exit has already been reinstated"));
    }
    if exit.exit_type == ExitType::Deceased {
        return Err(ServiceError::conflict("A deceased member cannot be reinstated"));
    }
    Ok(())
}

/// Status a reinstated member returns to
pub fn restored_status(previous: MemberStatus) -> MemberStatus {
    match previous {
        MemberStatus::Inactive => MemberStatus::Active,
        other => other,
    }
}

impl ExitService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Mark a member inactive: end their cell membership and any cell leadership, record the exit.
    pub async fn record_exit(&self, input: NewExit, actor: &Actor) -> ServiceResult<Exit> {
        let today = Utc::now().date_naive();
        let exit_date = input.exit_date.unwrap_or(today);
        if exit_date > today {
            return Err(ServiceError::field("exit_date", "Exit date cannot be in the future"));
        }

        let mut tx = self.pool.begin().await?;
        let member = lock_member(&mut tx, input.member_id).await?;
        check_can_exit(member.status)?;

        let before = snapshot(&mut tx, member.id).await?;

        sqlx::query("UPDATE members SET status = 'inactive', updated_at = now() WHERE id = $1")
            .bind(member.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE cell_members SET is_active = false, left_on = $2 WHERE member_id = $1 AND is_active")
            .bind(member.id)
            .bind(exit_date)
            .execute(&mut *tx)
            .await?;
        let cleared = sqlx::query(
            "UPDATE cell_groups SET leader_id = NULL, updated_at = now() WHERE leader_id = $1 AND deleted_at IS NULL",
        )
        .bind(member.id)
        .execute(&mut *tx)
        .await?;
        if cleared.rows_affected() > 0 {
            tracing::info!("Member {} exited while leading a cell; leader cleared", member.id);
        }

        let exit = sqlx::query_as::<_, Exit>(
            r#"
            INSERT INTO exits (member_id, exit_type, exit_date, reason, destination_church, previous_status, recorded_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(member.id)
        .bind(input.exit_type)
        .bind(exit_date)
        .bind(clean_text(input.reason))
        .bind(clean_text(input.destination_church))
        .bind(member.status)
        .bind(actor.user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| super::unique_conflict(e, &[("exits_active_uniq", "Member already has an active exit")]))?;

        let after = snapshot(&mut tx, member.id).await?;
        write_audit(
            &mut tx,
            &exit,
            AuditAction::ExitRecorded,
            before.to_json(),
            with_exit(after.to_json(), &exit),
            actor,
        )
        .await?;

        tx.commit().await?;
        tracing::info!("Recorded {} exit {} for member {}", exit.exit_type, exit.id, member.id);
        Ok(exit)
    }

    pub async fn update_exit(&self, id: Uuid, patch: ExitPatch, actor: &Actor) -> ServiceResult<Exit> {
        if let Some(date) = patch.exit_date {
            if date > Utc::now().date_naive() {
                return Err(ServiceError::field("exit_date", "Exit date cannot be in the future"));
            }
        }

        let mut tx = self.pool.begin().await?;
        let current = lock_exit(&mut tx, id).await?;
        check_can_update(&current)?;

        let updated = sqlx::query_as::<_, Exit>(
            r#"
            UPDATE exits SET
                exit_type = $2,
                exit_date = $3,
                reason = $4,
                destination_church = $5,
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.exit_type.unwrap_or(current.exit_type))
        .bind(patch.exit_date.unwrap_or(current.exit_date))
        .bind(patch_text(patch.reason, current.reason.clone()))
        .bind(patch_text(patch.destination_church, current.destination_church.clone()))
        .fetch_one(&mut *tx)
        .await?;

        write_audit(
            &mut tx,
            &updated,
            AuditAction::ExitUpdated,
            exit_json(&current),
            exit_json(&updated),
            actor,
        )
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Return an exited member to their status before the exit. Cell membership is not restored.
    pub async fn reinstate(&self, id: Uuid, input: Reinstatement, actor: &Actor) -> ServiceResult<Exit> {
        let mut tx = self.pool.begin().await?;

        // Member first, then exit: the same order record_exit takes its locks in
        let (member_id,): (Uuid,) = sqlx::query_as("SELECT member_id FROM exits WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(exit_not_found)?;
        let member = lock_member_any(&mut tx, member_id).await?;
        if member.deleted_at.is_some() {
            return Err(ServiceError::conflict(
                "Member record was deleted and cannot be reinstated",
            ));
        }
        let exit = lock_exit(&mut tx, id).await?;
        check_can_reinstate(&exit)?;

        let before = with_exit(snapshot(&mut tx, member.id).await?.to_json(), &exit);
        let status = restored_status(exit.previous_status);

        sqlx::query("UPDATE members SET status = $2, updated_at = now() WHERE id = $1")
            .bind(member.id)
            .bind(status)
            .execute(&mut *tx)
            .await?;

        let reinstated = sqlx::query_as::<_, Exit>(
            r#"
            UPDATE exits SET
                status = 'reinstated',
                reinstated_at = now(),
                reinstated_by = $2,
                reinstatement_notes = $3,
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(actor.user_id)
        .bind(clean_text(input.notes))
        .fetch_one(&mut *tx)
        .await?;

        let after = with_exit(snapshot(&mut tx, member.id).await?.to_json(), &reinstated);
        write_audit(&mut tx, &reinstated, AuditAction::Reinstated, before, after, actor).await?;

        tx.commit().await?;
        tracing::info!("Reinstated member {} as {} (exit {})", member.id, status, id);
        Ok(reinstated)
    }

    pub async fn get_exit(&self, id: Uuid) -> ServiceResult<Exit> {
        sqlx::query_as::<_, Exit>("SELECT * FROM exits WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(exit_not_found)
    }

    pub async fn list_exits(&self, query: ExitQuery) -> ServiceResult<Vec<Exit>> {
        let exits = sqlx::query_as::<_, Exit>(
            r#"
            SELECT * FROM exits
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR exit_type = $2)
            ORDER BY exit_date DESC, created_at DESC
            "#,
        )
        .bind(query.status)
        .bind(query.exit_type)
        .fetch_all(&self.pool)
        .await?;
        Ok(exits)
    }

    pub async fn list_member_exits(&self, member_id: Uuid) -> ServiceResult<Vec<Exit>> {
        ensure_member_exists(&self.pool, member_id).await?;
        let exits = sqlx::query_as::<_, Exit>(
            "SELECT * FROM exits WHERE member_id = $1 ORDER BY exit_date DESC, created_at DESC",
        )
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(exits)
    }

    pub async fn member_audit(&self, member_id: Uuid) -> ServiceResult<Vec<ExitAudit>> {
        ensure_member_exists(&self.pool, member_id).await?;
        let trail = sqlx::query_as::<_, ExitAudit>(
            "SELECT * FROM exit_audit WHERE member_id = $1 ORDER BY performed_at, id",
        )
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(trail)
    }
}

fn exit_not_found() -> ServiceError {
    ServiceError::not_found("Exit not found")
}

/// Audit history stays readable for soft-deleted members
async fn ensure_member_exists(pool: &PgPool, member_id: Uuid) -> ServiceResult<()> {
    let found: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM members WHERE id = $1")
        .bind(member_id)
        .fetch_optional(pool)
        .await?;
    found.map(|_| ()).ok_or_else(member_not_found)
}

/// Lock a member row whether or not it has been soft-deleted.
async fn lock_member_any(conn: &mut PgConnection, id: Uuid) -> ServiceResult<Member> {
    sqlx::query_as::<_, Member>("SELECT * FROM members WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(member_not_found)
}

async fn lock_exit(conn: &mut PgConnection, id: Uuid) -> ServiceResult<Exit> {
    sqlx::query_as::<_, Exit>("SELECT * FROM exits WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(exit_not_found)
}

async fn snapshot(conn: &mut PgConnection, member_id: Uuid) -> ServiceResult<MemberSnapshot> {
    let snap = sqlx::query_as::<_, MemberSnapshot>(
        r#"
        SELECT
            m.status,
            cm.cell_group_id,
            cm.role AS cell_role,
            (SELECT cg.id FROM cell_groups cg
             WHERE cg.leader_id = m.id AND cg.deleted_at IS NULL
             LIMIT 1) AS leads_cell_id
        FROM members m
        LEFT JOIN cell_members cm ON cm.member_id = m.id AND cm.is_active
        WHERE m.id = $1
        "#,
    )
    .bind(member_id)
    .fetch_one(conn)
    .await?;
    Ok(snap)
}

fn exit_json(exit: &Exit) -> Value {
    json!({
        "exit_type": exit.exit_type,
        "exit_date": exit.exit_date,
        "reason": exit.reason,
        "destination_church": exit.destination_church,
        "status": exit.status,
    })
}

fn with_exit(mut state: Value, exit: &Exit) -> Value {
    state["exit"] = exit_json(exit);
    state
}

async fn write_audit(
    conn: &mut PgConnection,
    exit: &Exit,
    action: AuditAction,
    before: Value,
    after: Value,
    actor: &Actor,
) -> ServiceResult<()> {
    sqlx::query(
        r#"
        INSERT INTO exit_audit (exit_id, member_id, action, before_state, after_state, performed_by)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(exit.id)
    .bind(exit.member_id)
    .bind(action)
    .bind(before)
    .bind(after)
    .bind(actor.user_id)
    .execute(conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::cell_group::NewCellGroup;
    use crate::database::models::leadership::GrantRole;
    use crate::database::models::member::NewMember;
    use crate::services::{CellGroupService, LeadershipService, MemberService};
    use crate::testing::TestContext;
    use crate::types::{AccessLevel, LeadershipRole};
    use chrono::NaiveDate;

    fn sample_exit(exit_type: ExitType, status: ExitStatus) -> Exit {
        let now = Utc::now();
        Exit {
            id: Uuid::new_v4(),
            member_id: Uuid::new_v4(),
            exit_type,
            exit_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            reason: None,
            destination_church: None,
            status,
            previous_status: MemberStatus::Visitor,
            recorded_by: None,
            reinstated_at: None,
            reinstated_by: None,
            reinstatement_notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn actor() -> Actor {
        Actor { user_id: Uuid::new_v4(), access: AccessLevel::Full }
    }

    #[test]
    fn reinstated_exits_are_frozen() {
        let done = sample_exit(ExitType::Moved, ExitStatus::Reinstated);
        assert!(check_can_update(&done).is_err());
        assert!(check_can_reinstate(&done).is_err());
        assert!(check_can_update(&sample_exit(ExitType::Moved, ExitStatus::Active)).is_ok());
    }

    #[test]
    fn deceased_cannot_be_reinstated() {
        assert!(check_can_reinstate(&sample_exit(ExitType::Deceased, ExitStatus::Active)).is_err());
        assert!(check_can_reinstate(&sample_exit(ExitType::Transferred, ExitStatus::Active)).is_ok());
    }

    #[test]
    fn reinstatement_restores_previous_status() {
        assert_eq!(restored_status(MemberStatus::Visitor), MemberStatus::Visitor);
        assert_eq!(restored_status(MemberStatus::Active), MemberStatus::Active);
        assert_eq!(restored_status(MemberStatus::Inactive), MemberStatus::Active);
    }

    #[test]
    fn inactive_members_cannot_exit_again() {
        assert!(check_can_exit(MemberStatus::Active).is_ok());
        assert!(check_can_exit(MemberStatus::Visitor).is_ok());
        assert!(matches!(check_can_exit(MemberStatus::Inactive), Err(ServiceError::Conflict(_))));
    }

    #[tokio::test]
    async fn exit_and_reinstatement_are_audited() {
        let Some(ctx) = TestContext::try_new().await else { return };
        let members = MemberService::new(ctx.pool.clone());
        let exits = ExitService::new(ctx.pool.clone());
        let actor = actor();

        let leader = members
            .create(NewMember { first_name: "Demas".into(), last_name: "Forsaker".into(), ..Default::default() })
            .await
            .unwrap();
        LeadershipService::new(ctx.pool.clone())
            .grant(leader.id, GrantRole { role: LeadershipRole::CellLeader, notes: None })
            .await
            .unwrap();
        let cells = CellGroupService::new(ctx.pool.clone());
        let cell = cells
            .create(NewCellGroup { name: "Thessalonica".into(), leader_id: Some(leader.id), ..Default::default() })
            .await
            .unwrap();

        let exit = exits
            .record_exit(
                NewExit {
                    member_id: leader.id,
                    exit_type: ExitType::Withdrawn,
                    exit_date: None,
                    reason: Some("loved this present world".into()),
                    destination_church: None,
                },
                &actor,
            )
            .await
            .unwrap();
        assert_eq!(exit.previous_status, MemberStatus::Active);
        assert_eq!(members.get(leader.id).await.unwrap().status, MemberStatus::Inactive);

        // Leadership and membership ended with the exit
        let summary = cells.get(cell.id).await.unwrap();
        assert_eq!(summary.group.leader_id, None);
        assert_eq!(summary.member_count, 0);

        let again = exits
            .record_exit(
                NewExit {
                    member_id: leader.id,
                    exit_type: ExitType::Other,
                    exit_date: None,
                    reason: None,
                    destination_church: None,
                },
                &actor,
            )
            .await;
        assert!(matches!(again, Err(ServiceError::Conflict(_))));

        exits
            .update_exit(exit.id, ExitPatch { reason: Some(Some("moved away".into())), ..Default::default() }, &actor)
            .await
            .unwrap();
        let cleared = exits
            .update_exit(exit.id, ExitPatch { destination_church: Some(None), ..Default::default() }, &actor)
            .await
            .unwrap();
        assert_eq!(cleared.reason.as_deref(), Some("moved away"));
        assert_eq!(cleared.destination_church, None);
        let reinstated = exits.reinstate(exit.id, Reinstatement { notes: Some("returned".into()) }, &actor).await.unwrap();
        assert_eq!(reinstated.status, ExitStatus::Reinstated);
        assert_eq!(members.get(leader.id).await.unwrap().status, MemberStatus::Active);

        let frozen = exits.update_exit(exit.id, ExitPatch::default(), &actor).await;
        assert!(matches!(frozen, Err(ServiceError::Conflict(_))));

        let trail = exits.member_audit(leader.id).await.unwrap();
        let actions: Vec<AuditAction> = trail.iter().map(|a| a.action).collect();
        assert_eq!(
            actions,
            vec![AuditAction::ExitRecorded, AuditAction::ExitUpdated, AuditAction::ExitUpdated, AuditAction::Reinstated]
        );
        assert_eq!(trail[0].before_state["member_status"], "active");
        assert_eq!(trail[0].before_state["cell_group_id"], serde_json::json!(cell.id));
        assert_eq!(trail[0].after_state["member_status"], "inactive");
        assert_eq!(trail[0].performed_by, Some(actor.user_id));

        ctx.cleanup().await;
    }

    #[tokio::test]
    async fn reinstating_missing_exit_is_not_found() {
        let Some(ctx) = TestContext::try_new().await else { return };
        let err = ExitService::new(ctx.pool.clone())
            .reinstate(Uuid::new_v4(), Reinstatement::default(), &actor())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        ctx.cleanup().await;
    }

    #[tokio::test]
    async fn deleted_member_cannot_be_reinstated() {
        let Some(ctx) = TestContext::try_new().await else { return };
        let members = MemberService::new(ctx.pool.clone());
        let exits = ExitService::new(ctx.pool.clone());
        let actor = actor();

        let member = members
            .create(NewMember { first_name: "Hymenaeus".into(), last_name: "Ephesian".into(), ..Default::default() })
            .await
            .unwrap();
        let exit = exits
            .record_exit(
                NewExit {
                    member_id: member.id,
                    exit_type: ExitType::Transferred,
                    exit_date: None,
                    reason: None,
                    destination_church: Some("Smyrna".into()),
                },
                &actor,
            )
            .await
            .unwrap();
        members.delete(member.id).await.unwrap();

        let err = exits.reinstate(exit.id, Reinstatement::default(), &actor).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(m) if m.contains("deleted")));
        assert_eq!(exits.get_exit(exit.id).await.unwrap().status, ExitStatus::Active);

        ctx.cleanup().await;
    }
}
