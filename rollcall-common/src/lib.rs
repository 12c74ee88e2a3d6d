//! # Rollcall Common Library
//!
//! Domain logic shared by the Rollcall service:
//! - Attendance eligibility (geofence, slot windows, face matching)
//! - Dictated mark entry (transcript extraction, roster correction, sheets)
//! - Configuration loading
//! - Database schema and models
//! - Credential and token primitives

pub mod api;
pub mod attendance;
pub mod config;
pub mod db;
pub mod error;
pub mod face;
pub mod geo;
pub mod marks;
pub mod slot;
pub mod time;

pub use error::{Error, ErrorKind, Result};
