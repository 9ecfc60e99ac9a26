// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition endpoints. Route prefix: /auth/*. No middleware.

pub mod auth;

pub use auth::*;
