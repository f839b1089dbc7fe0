//! # stockmarket-bootstrap
//!
//! Brings up the stock market's MongoDB replica-set connection.
//!
//! Build a [`MongoConfig`](config::MongoConfig), hand it to a
//! [`Bootstrapper`](bootstrap::Bootstrapper), call `initialize()` once at
//! startup and pass the returned [`Connection`](db::Connection) (or the
//! bootstrapper itself) to the components that need the database.

pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod db;
pub mod errors;
pub mod health;
pub mod listing;
pub mod logging;
