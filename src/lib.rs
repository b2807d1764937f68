pub mod boundaries;
pub mod config;
pub mod dashboard;
pub mod filter;
pub mod generator;
pub mod geocode;
pub mod geometry;
pub mod index;
pub mod search;
pub mod selection;
pub mod server;
pub mod types;
