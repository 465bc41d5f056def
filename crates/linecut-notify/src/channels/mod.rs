pub mod fcm;
pub mod log;
