//! Smart Condominium administration console.
//!
//! An authenticated client for the condominium backend and its AI detection
//! microservice, with session persistence and a command-line front end.

pub mod api;
pub mod commands;
pub mod config;
pub mod routes;
pub mod session;
pub mod state;
