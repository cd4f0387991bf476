// Domain layer - Readings, alerts, contacts, profile and the error taxonomy
pub mod alert;
pub mod contact;
pub mod device;
pub mod error;
pub mod network;
pub mod news;
pub mod profile;
pub mod reading;
