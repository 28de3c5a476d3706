//! Google Sheets Access Verification
//!
//! This library provides the core of the sheets-verify console: a single
//! active service-account credential, spreadsheet listing through Google
//! Drive, and asynchronous verification jobs that export, download and parse
//! a spreadsheet while clients poll for status.

pub mod app_state;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
