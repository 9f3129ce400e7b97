//! Common test utilities for layer-export E2E tests

#[allow(dead_code)]
pub mod config;
#[allow(dead_code)]
pub mod platform;

pub use config::*;
#[allow(unused_imports)]
pub use platform::*;
