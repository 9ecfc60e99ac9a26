// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Route prefix: /api/*. Middleware: JWT validation, then tenant validation
// (injects ValidatedTenant and TenantPool), then user validation (injects
// ValidatedUser). Each handler checks the access level it needs.

pub mod auth;
pub mod cell_groups;
pub mod exits;
pub mod giving;
pub mod leadership;
pub mod members;
pub mod prayer;
pub mod users;

pub use auth::*;
pub use cell_groups::*;
pub use exits::*;
pub use giving::*;
pub use leadership::*;
pub use members::*;
pub use prayer::*;
pub use users::*;
