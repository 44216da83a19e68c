//! Shared fixtures; each test binary uses a different subset
#![allow(dead_code)]

pub mod mcp;
pub mod provider;
