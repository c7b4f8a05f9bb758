//! MEXC module - Client implementation for the MEXC spot REST API

pub mod auth;
pub mod messages;
pub mod rest;

pub use rest::MexcRestClient;
