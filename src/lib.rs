//! csvchat-server – upload a CSV, then ask questions about it in plain
//! English.  Questions go to a hosted model that can call a small set of
//! dataframe tools; when the model is unreachable a keyword heuristic
//! answers instead.

pub mod agent;
pub mod config;
pub mod dataset;
pub mod entities;
pub mod error;
pub mod middleware;
pub mod registry;
pub mod routes;
pub mod schemas;
pub mod state;
