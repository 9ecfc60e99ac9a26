// handlers/public/auth/mod.rs - Public authentication handlers

pub mod login; // POST /auth/login/:tenant/:user
pub mod refresh; // POST /auth/refresh
pub mod session; // Token response shared with sudo

pub use login::login_post;
pub use refresh::refresh_post;
pub use session::{SessionUser, TokenResponse};
