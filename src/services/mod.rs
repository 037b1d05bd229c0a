pub mod notification;
pub mod trigger;
