//! Core library for the Collegium portal: institutions and agents submit
//! college information records, staff and admins review them, and the public
//! searches whatever has been approved.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
