pub mod config;
pub mod core;
pub mod error;
pub mod indicators;
pub mod models;
pub mod store;
#[cfg(test)]
pub mod test_helpers;
