// Application layer - Use cases over the telemetry store
pub mod anomaly_detector;
pub mod command_service;
pub mod ingest_service;
pub mod query_service;
pub mod telemetry_store;
pub mod window_aggregator;
