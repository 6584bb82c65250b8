//! Request / response bodies for the HTTP API.

pub mod chat;
pub mod session;
