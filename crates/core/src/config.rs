//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core
//! services as `Arc<CoreConfig>`. The intent is to avoid reading process-wide
//! environment variables during request handling, which can lead to
//! inconsistent behaviour in multi-threaded runtimes and test harnesses.

use crate::constants::{
    ASSIGNMENTS_DIR_NAME, CATEGORIES_DIR_NAME, EXERCISES_DIR_NAME, PLANS_DIR_NAME,
    RECORDS_DIR_NAME, TEMPLATES_DIR_NAME, TRAININGS_DIR_NAME,
};
use crate::error::{ClinicError, ClinicResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
///
/// Owns the clinic data directory and derives one collection subdirectory per
/// document type.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    clinic_data_dir: PathBuf,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`ClinicError::ValidationFailed`] if `clinic_data_dir` is empty.
    pub fn new(clinic_data_dir: PathBuf) -> ClinicResult<Self> {
        if clinic_data_dir.as_os_str().is_empty() {
            return Err(ClinicError::ValidationFailed(
                "clinic_data_dir cannot be empty".into(),
            ));
        }

        Ok(Self { clinic_data_dir })
    }

    pub fn clinic_data_dir(&self) -> &Path {
        &self.clinic_data_dir
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.clinic_data_dir.join(TEMPLATES_DIR_NAME)
    }

    pub fn records_dir(&self) -> PathBuf {
        self.clinic_data_dir.join(RECORDS_DIR_NAME)
    }

    pub fn categories_dir(&self) -> PathBuf {
        self.clinic_data_dir.join(CATEGORIES_DIR_NAME)
    }

    pub fn exercises_dir(&self) -> PathBuf {
        self.clinic_data_dir.join(EXERCISES_DIR_NAME)
    }

    pub fn trainings_dir(&self) -> PathBuf {
        self.clinic_data_dir.join(TRAININGS_DIR_NAME)
    }

    pub fn assignments_dir(&self) -> PathBuf {
        self.clinic_data_dir.join(ASSIGNMENTS_DIR_NAME)
    }

    pub fn plans_dir(&self) -> PathBuf {
        self.clinic_data_dir.join(PLANS_DIR_NAME)
    }
}
