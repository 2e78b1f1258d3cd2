//! udyam: schema-driven multi-step registration intake
//!
//! A form schema (steps of typed fields) drives everything: the rules each
//! field must satisfy, the interactive wizard, and the server that accepts
//! submissions. Validation is shared by the client and the server.

pub mod cli;
pub mod core;
pub mod schema;
pub mod server;
