//! Tide record service library.
//!
//! Ingests a year of six-minute CO-OPS records for one station into an
//! in-memory interval store and answers timestamp queries against it.
//!
//! Modules:
//! - `model`   : record, product and error types shared by everything else.
//! - `store`   : append-only interval store with constant-time lookup.
//! - `ingest`  : window planning, CO-OPS client and the ordered ingestor.
//! - `query`   : path components to response, independent of the server.
//! - `server`  : axum routes over `query`.
//! - `station` : the monitored station.
//! - `verify`  : single-day probe of the configured station.
//! - `config`  : TOML file plus environment overrides.
//! - `logging` : source-tagged console/file logging.

pub mod config;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod query;
pub mod server;
pub mod station;
pub mod store;
pub mod verify;
