pub mod auth;
pub mod internal;

pub use auth::AuthUser;
