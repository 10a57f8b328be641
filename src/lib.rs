pub mod blob;
pub mod catalog;
pub mod config;
pub mod identity;
pub mod ingest;
pub mod lifecycle;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod schedule;
pub mod service;
pub mod session;
pub mod store;
