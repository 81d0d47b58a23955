//! Portico - captive-portal HTTP engine
//!
//! Core library for the appliance's forced-portal web server.

pub mod config;
pub mod http;
pub mod portal;
pub mod server;
