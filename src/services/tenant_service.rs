use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tracing::{info, warn};

use super::user_service::{validate_auth, validate_password, UserService};
use super::{ServiceError, ServiceResult};
use crate::database::manager::DatabaseManager;
use crate::database::migrations;
use crate::database::models::tenant::{NewTenant, Tenant};
use crate::database::models::user::NewUser;
use crate::types::AccessLevel;

/// Tenant registry operations against the main database
pub struct TenantService {
    main_pool: PgPool,
}

impl TenantService {
    pub async fn new() -> ServiceResult<Self> {
        let main_pool = DatabaseManager::main_pool().await?;
        Ok(Self { main_pool })
    }

    /// Provision a tenant: database, schema, first `full` user, then the registry row.
    /// A failure after the database exists drops it again.
    pub async fn create_tenant(&self, input: NewTenant) -> ServiceResult<Tenant> {
        let name = input.name.trim().to_string();
        validate_tenant_name(&name)?;
        validate_auth(&input.admin_auth)?;
        validate_password(&input.admin_password)?;

        let display_name = input
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(&name)
            .to_string();
        let database = tenant_database_name(&name);

        if self.tenant_exists(&name).await? {
            return Err(ServiceError::conflict(format!("Tenant already exists: {}", name)));
        }

        DatabaseManager::create_database(&database).await?;

        let provisioned = self.provision(&database, &input.admin_auth, &input.admin_password).await;
        let registered = match provisioned {
            Ok(()) => self.register_tenant(&name, &display_name, &database).await,
            Err(e) => Err(e),
        };

        match registered {
            Ok(tenant) => {
                info!("Created tenant {} ({})", tenant.name, tenant.database);
                Ok(tenant)
            }
            Err(e) => {
                warn!("Tenant {} provisioning failed, dropping {}: {}", name, database, e);
                if let Err(drop_err) = DatabaseManager::drop_database(&database).await {
                    warn!("Could not drop {}: {}", database, drop_err);
                }
                Err(e)
            }
        }
    }

    async fn provision(&self, database: &str, admin_auth: &str, admin_password: &str) -> ServiceResult<()> {
        let pool = DatabaseManager::tenant_pool(database).await?;
        migrations::apply_tenant_schema(&pool).await?;
        UserService::new(pool)
            .create(NewUser {
                auth: admin_auth.to_string(),
                name: "Administrator".to_string(),
                password: admin_password.to_string(),
                access: Some(AccessLevel::Full),
            })
            .await?;
        Ok(())
    }

    async fn tenant_exists(&self, name: &str) -> ServiceResult<bool> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tenants WHERE name = $1 AND deleted_at IS NULL")
            .bind(name)
            .fetch_one(&self.main_pool)
            .await?;
        Ok(count.0 > 0)
    }

    async fn register_tenant(&self, name: &str, display_name: &str, database: &str) -> ServiceResult<Tenant> {
        let tenant = sqlx::query_as::<_, Tenant>(
            "INSERT INTO tenants (name, display_name, database) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(name)
        .bind(display_name)
        .bind(database)
        .fetch_one(&self.main_pool)
        .await
        .map_err(|e| super::unique_conflict(e, &[("tenants_name_key", "Tenant already exists")]))?;
        Ok(tenant)
    }

    /// Tenant by name, including trashed ones
    pub async fn get_tenant(&self, name: &str) -> ServiceResult<Tenant> {
        sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE name = $1 AND deleted_at IS NULL")
            .bind(name)
            .fetch_optional(&self.main_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Tenant not found: {}", name)))
    }

    /// Tenant that can currently accept logins
    pub async fn find_active_tenant(&self, name: &str) -> ServiceResult<Option<Tenant>> {
        let tenant = sqlx::query_as::<_, Tenant>(
            "SELECT * FROM tenants WHERE name = $1 AND is_active AND trashed_at IS NULL AND deleted_at IS NULL",
        )
        .bind(name)
        .fetch_optional(&self.main_pool)
        .await?;
        Ok(tenant)
    }

    pub async fn list_tenants(&self, include_trashed: bool) -> ServiceResult<Vec<Tenant>> {
        let tenants = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT * FROM tenants
            WHERE deleted_at IS NULL AND ($1 OR trashed_at IS NULL)
            ORDER BY created_at DESC
            "#,
        )
        .bind(include_trashed)
        .fetch_all(&self.main_pool)
        .await?;
        Ok(tenants)
    }

    /// Soft delete: the tenant stops accepting logins, its database is kept
    pub async fn delete_tenant(&self, name: &str) -> ServiceResult<Tenant> {
        sqlx::query_as::<_, Tenant>(
            r#"
            UPDATE tenants SET trashed_at = now(), is_active = false, updated_at = now()
            WHERE name = $1 AND trashed_at IS NULL AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(name)
        .fetch_optional(&self.main_pool)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("Tenant not found: {}", name)))
    }

    pub async fn restore_tenant(&self, name: &str) -> ServiceResult<Tenant> {
        sqlx::query_as::<_, Tenant>(
            r#"
            UPDATE tenants SET trashed_at = NULL, is_active = true, updated_at = now()
            WHERE name = $1 AND trashed_at IS NOT NULL AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(name)
        .fetch_optional(&self.main_pool)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("No trashed tenant named {}", name)))
    }

    /// Connection pool for a registered tenant
    pub async fn get_tenant_pool(&self, name: &str) -> ServiceResult<PgPool> {
        let tenant = self.get_tenant(name).await?;
        Ok(DatabaseManager::tenant_pool(&tenant.database).await?)
    }
}

/// Stable database name for a tenant: `tenant_` plus 16 hex chars of sha256(name)
pub fn tenant_database_name(name: &str) -> String {
    let hash = format!("{:x}", Sha256::digest(name.as_bytes()));
    format!("tenant_{}", &hash[..16])
}

pub fn validate_tenant_name(name: &str) -> ServiceResult<()> {
    if name.len() < 2 {
        return Err(ServiceError::field("name", "Tenant name must be at least 2 characters"));
    }
    if name.len() > 100 {
        return Err(ServiceError::field("name", "Tenant name must be at most 100 characters"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(ServiceError::field(
            "name",
            "Tenant name can only contain letters, numbers, hyphens, and underscores",
        ));
    }
    Ok(())
}
