//! CLI command implementations

pub mod completions;
pub mod fill;
pub mod init;
pub mod schema;
pub mod serve;
pub mod submissions;
pub mod submit;
pub mod validate;
