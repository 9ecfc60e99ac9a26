// handlers/elevated/root/mod.rs - Root administrative handlers

pub mod tenant;

pub use tenant::*;
