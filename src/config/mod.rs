pub mod client;
pub mod database;
pub mod internal;
pub mod jwt;
pub mod rate_limit;
