// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod device_outbox;
pub mod firestore;
pub mod kv_store;
pub mod news_client;
pub mod outbox_stream;
pub mod sensor_hub;
pub mod sms_gateway;
