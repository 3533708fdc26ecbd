//! Transport helpers shared by handlers.

pub mod cookies;
pub mod device;
