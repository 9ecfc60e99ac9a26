// handlers/elevated/root/tenant/mod.rs - Tenant registry management
//
// Endpoints:
// - GET    /api/root/tenants               - List tenants (?include_trashed=true)
// - POST   /api/root/tenants               - Provision tenant database and admin user
// - GET    /api/root/tenants/:name         - Show tenant
// - DELETE /api/root/tenants/:name         - Trash tenant (logins refused)
// - POST   /api/root/tenants/:name/restore - Restore trashed tenant

pub mod create;
pub mod delete;
pub mod list;
pub mod restore;
pub mod show;

pub use create::tenant_create;
pub use delete::tenant_delete;
pub use list::tenant_list;
pub use restore::tenant_restore;
pub use show::tenant_show;
