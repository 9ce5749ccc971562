//! Demo HTTP handlers served behind the request logger.

pub mod health;
pub mod items;
