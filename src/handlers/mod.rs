pub mod internal;
pub mod notification;
