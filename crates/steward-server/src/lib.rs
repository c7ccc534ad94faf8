//! Steward Server - process wiring
//!
//! Loads configuration, initializes logging and assembles the user service
//! graph (store, cache, lock service, coordinator, login service).

pub mod model;
pub mod startup;
