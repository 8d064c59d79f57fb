// src/config/mod.rs
// Configuration parsing (raw) and validation (processed).

pub mod processed;
pub mod raw;
