//! Public domain-level types for external API use.
//!
//! This module provides RM-agnostic data types that callers can use without coupling to FLAT
//! paths, AQL columns or archetype details.

pub mod vital_signs;

pub use vital_signs::{BloodPressure, VitalSignsRecord};
