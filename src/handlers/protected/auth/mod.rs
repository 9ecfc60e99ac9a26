// handlers/protected/auth/mod.rs - Session handlers for authenticated users

pub mod sudo; // POST /api/auth/sudo
pub mod whoami; // GET /api/auth/whoami

pub use sudo::sudo_post;
pub use whoami::whoami_get;
