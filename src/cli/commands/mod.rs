//! CLI command implementations

pub mod utils;

pub mod completions;
pub mod creature;
pub mod handler;
pub mod init;
pub mod link;
pub mod moves;
pub mod types;
