pub mod notification;

pub use notification::{Entity as Notification, Model as NotificationModel, NotificationType};
