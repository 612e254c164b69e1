//! Steam catalog scraper: a generic fetch-and-persist engine wired into run modes that
//! fill a SQLite database from the Steam store.

pub mod cli;
pub mod config;
pub mod database_ops;
pub mod engine;
pub mod error;
pub mod normalization;
pub mod tracing;

pub mod util {
    pub mod env;
}
