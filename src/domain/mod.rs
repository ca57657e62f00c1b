pub mod notification;
pub mod subscriber;
