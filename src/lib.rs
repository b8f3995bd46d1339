pub mod app;
pub mod catalog;
pub mod config;
pub mod error;
pub mod id_set;
pub mod known;
pub mod models;
pub mod overview;
pub mod queue;
pub mod review;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod tags;

#[cfg(test)]
mod test_support;
