use sqlx::PgPool;
use uuid::Uuid;

use super::member_service::{lock_member, member_not_found};
use super::{unique_conflict, ServiceError, ServiceResult};
use crate::database::models::clean_text;
use crate::database::models::leadership::{GrantRole, Leader, LeadershipRoleRecord};
use crate::types::{LeadershipRole, MemberStatus};

pub struct LeadershipService {
    pool: PgPool,
}

impl LeadershipService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn grant(&self, member_id: Uuid, input: GrantRole) -> ServiceResult<LeadershipRoleRecord> {
        let mut tx = self.pool.begin().await?;
        let member = lock_member(&mut tx, member_id).await?;
        if member.status != MemberStatus::Active {
            return Err(ServiceError::conflict(format!(
                "Only active members can hold leadership roles (member is {})",
                member.status
            )));
        }

        let record = sqlx::query_as::<_, LeadershipRoleRecord>(
            "INSERT INTO leadership_roles (member_id, role, notes) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(member_id)
        .bind(input.role)
        .bind(clean_text(input.notes))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| unique_conflict(e, &[("leadership_roles_active_uniq", "Member already holds this role")]))?;

        tx.commit().await?;
        tracing::info!("Granted {} to member {}", input.role, member_id);
        Ok(record)
    }

    /// Revoke an active role. A member who leads a cell must keep at least one role.
    pub async fn revoke(&self, member_id: Uuid, role: LeadershipRole) -> ServiceResult<LeadershipRoleRecord> {
        let mut tx = self.pool.begin().await?;
        lock_member(&mut tx, member_id).await?;

        let record = sqlx::query_as::<_, LeadershipRoleRecord>(
            r#"
            UPDATE leadership_roles SET is_active = false, revoked_on = CURRENT_DATE
            WHERE member_id = $1 AND role = $2 AND is_active
            RETURNING *
            "#,
        )
        .bind(member_id)
        .bind(role)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("Member does not hold an active {} role", role)))?;

        let (remaining, leads_cell): (i64, bool) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM leadership_roles WHERE member_id = $1 AND is_active),
                EXISTS (SELECT 1 FROM cell_groups WHERE leader_id = $1 AND deleted_at IS NULL)
            "#,
        )
        .bind(member_id)
        .fetch_one(&mut *tx)
        .await?;

        if remaining == 0 && leads_cell {
            // Dropping tx rolls the revoke back
            return Err(ServiceError::conflict(
                "Member leads a cell group and must keep a leadership role; reassign the cell first",
            ));
        }

        tx.commit().await?;
        tracing::info!("Revoked {} from member {}", role, member_id);
        Ok(record)
    }

    pub async fn list_roles(&self, member_id: Uuid) -> ServiceResult<Vec<LeadershipRoleRecord>> {
        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM members WHERE id = $1 AND deleted_at IS NULL")
            .bind(member_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(member_not_found());
        }

        let roles = sqlx::query_as::<_, LeadershipRoleRecord>(
            "SELECT * FROM leadership_roles WHERE member_id = $1 ORDER BY is_active DESC, granted_on DESC, role",
        )
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(roles)
    }

    /// Members holding at least one active role, with the cell they lead if any
    pub async fn list_leaders(&self) -> ServiceResult<Vec<Leader>> {
        let leaders = sqlx::query_as::<_, Leader>(
            r#"
            SELECT
                m.id AS member_id,
                m.first_name,
                m.last_name,
                array_agg(lr.role ORDER BY lr.role) AS roles,
                (SELECT cg.id FROM cell_groups cg
                 WHERE cg.leader_id = m.id AND cg.deleted_at IS NULL
                 LIMIT 1) AS leads_cell_id
            FROM members m
            JOIN leadership_roles lr ON lr.member_id = m.id AND lr.is_active
            WHERE m.deleted_at IS NULL
            GROUP BY m.id
            ORDER BY m.last_name, m.first_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(leaders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::member::NewMember;
    use crate::services::MemberService;
    use crate::testing::TestContext;

    #[tokio::test]
    async fn granting_an_active_role_twice_conflicts() {
        let Some(ctx) = TestContext::try_new().await else { return };
        let member = MemberService::new(ctx.pool.clone())
            .create(NewMember { first_name: "Priscilla".into(), last_name: "Tentmaker".into(), ..Default::default() })
            .await
            .unwrap();
        let roles = LeadershipService::new(ctx.pool.clone());

        let grant = || GrantRole { role: LeadershipRole::Deacon, notes: None };
        roles.grant(member.id, grant()).await.unwrap();
        assert!(matches!(roles.grant(member.id, grant()).await, Err(ServiceError::Conflict(_))));

        roles.revoke(member.id, LeadershipRole::Deacon).await.unwrap();
        assert!(matches!(
            roles.revoke(member.id, LeadershipRole::Deacon).await,
            Err(ServiceError::NotFound(_))
        ));

        // Revoked roles can be granted again
        roles.grant(member.id, grant()).await.unwrap();
        assert_eq!(roles.list_roles(member.id).await.unwrap().len(), 2);

        let leaders = roles.list_leaders().await.unwrap();
        assert_eq!(leaders.len(), 1);
        assert_eq!(leaders[0].roles, vec!["deacon".to_string()]);

        ctx.cleanup().await;
    }
}
