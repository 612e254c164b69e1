pub mod db;
pub mod games;
pub mod record_sets;
pub mod steam;
pub mod tags;
