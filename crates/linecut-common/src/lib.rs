//! Shared types for the linecut notification service: the notification
//! record, operating-schedule records, the snowflake id generator and the
//! timezone-aware clock every rule evaluates against.

pub mod id;
pub mod time;
pub mod types;
