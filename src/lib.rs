pub mod api;
pub mod config;
pub mod gateway;
pub mod observability;
pub mod provider;
pub mod worker;
