//! stackctl library
//!
//! Detects the host's distribution family and manages virtual hosts, PHP
//! runtimes, certificates and the database root credential of a local web
//! development stack.

pub mod audit;
pub mod commands;
pub mod config;
pub mod database;
pub mod error;
pub mod executor;
pub mod files;
pub mod php;
pub mod platform;
pub mod services;
pub mod templates;
pub mod validation;
pub mod vhost;
