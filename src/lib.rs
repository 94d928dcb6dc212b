pub mod aggregator;
pub mod commands;
pub mod config;
pub mod context;
pub mod database;
pub mod dataset;
pub mod error;
pub mod features;
pub mod join;
pub mod memory_store;
pub mod models;
pub mod pairing;
pub mod pipeline;
pub mod ranker;
pub mod retry;
pub mod store;
pub mod windows;

#[cfg(test)]
mod test_fixtures;
