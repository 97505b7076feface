pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod observability;
pub mod offline;
pub mod routes;
pub mod services;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;
