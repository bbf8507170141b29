pub mod contestation;
