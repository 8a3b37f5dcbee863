//! # Physio Core
//!
//! Core business logic for the physiotherapy clinic record system.
//!
//! This crate contains pure data operations over a sharded YAML document
//! store:
//! - Form templates (anamnesis/evaluation) and the snapshots embedded in
//!   filled records
//! - The filled-record state machine (draft → completed, one-way latch)
//! - Exercises, categories, and trainings with their derived category set
//! - Patient training assignments and action plans with completion linking
//!
//! **No API concerns**: authentication, authorisation, HTTP servers, and
//! request parsing belong to the request layer. Services here receive
//! already-deserialised, type-checked input and return plain data structures
//! or a [`ClinicError`].

pub mod assignments;
pub mod categories;
pub mod config;
mod constants;
pub mod error;
pub mod exercises;
pub mod fields;
pub mod plans;
pub mod records;
pub mod snapshot;
mod storage;
pub mod templates;
pub mod trainings;

pub use config::CoreConfig;
pub use error::{ClinicError, ClinicResult};

// Re-export the shared value types so downstream crates need only this one.
pub use physio_types::{NonEmptyText, TextError};
pub use physio_uuid::{IdError, RecordId};
