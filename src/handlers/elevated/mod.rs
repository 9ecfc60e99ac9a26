// handlers/elevated/mod.rs - Elevated handlers (root JWT required)
//
// Route prefix: /api/root/*. A root token is obtained from POST /api/auth/sudo
// and expires faster than a regular session token.

pub mod root;

pub use root::*;
