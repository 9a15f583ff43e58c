//! Domain model structs and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row, plus the `Deserialize` DTOs used to create it.

pub mod message_log;
pub mod subscriber;
pub mod subscription;
