pub mod device;
pub mod notification_service;
pub mod user;
