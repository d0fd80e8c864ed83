pub mod common;
pub mod config;
pub mod market;
pub mod notify;
pub mod scan;

#[cfg(feature = "test-utils")]
pub mod testing;
