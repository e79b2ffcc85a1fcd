// src/core/mod.rs
pub mod identity;
pub mod services;
