// handlers/mod.rs - Handlers grouped by security tier
//
// Public (no auth) -> Protected (tenant JWT) -> Elevated (root JWT from sudo)

pub mod elevated; // /api/root/*
pub mod protected; // /api/*
pub mod public; // /auth/*
