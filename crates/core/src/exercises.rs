//! Exercises.
//!
//! An exercise carries the category references that trainings later aggregate
//! over, so every referenced category is checked to exist before a save.

use crate::categories::CategoryService;
use crate::config::CoreConfig;
use crate::constants::EXERCISE_FILE_NAME;
use crate::error::{ClinicError, ClinicResult};
use crate::storage;
use chrono::{DateTime, Utc};
use physio_types::NonEmptyText;
use physio_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const ENTITY: &str = "exercise";

/// How an exercise is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseType {
    Isometric,
    Isotonic,
    Read,
    Custom,
}

/// A prescribable exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: RecordId,
    pub name: NonEmptyText,
    #[serde(rename = "type")]
    pub exercise_type: ExerciseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub categories: Vec<RecordId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an exercise.
#[derive(Debug, Clone)]
pub struct NewExercise {
    pub name: String,
    pub exercise_type: ExerciseType,
    pub link: Option<String>,
    pub description: Option<String>,
    pub categories: Vec<RecordId>,
}

/// Partial update; `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default)]
pub struct ExerciseUpdate {
    pub name: Option<String>,
    pub exercise_type: Option<ExerciseType>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub categories: Option<Vec<RecordId>>,
}

/// Service for managing exercises.
#[derive(Clone)]
pub struct ExerciseService {
    cfg: Arc<CoreConfig>,
}

impl ExerciseService {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }

    /// Creates a new exercise.
    ///
    /// # Errors
    ///
    /// Returns [`ClinicError::ValidationFailed`] for an empty name and
    /// [`ClinicError::NotFound`] when a referenced category does not exist.
    pub fn create(&self, input: NewExercise) -> ClinicResult<Exercise> {
        let name = NonEmptyText::new(&input.name).map_err(|_| {
            ClinicError::ValidationFailed("exercise name must be a non-empty string".into())
        })?;
        CategoryService::new(self.cfg.clone()).ensure_exist(&input.categories)?;

        let now = Utc::now();
        storage::create_document(&self.cfg.exercises_dir(), EXERCISE_FILE_NAME, |id| Exercise {
            id,
            name,
            exercise_type: input.exercise_type,
            link: input.link,
            description: input.description,
            categories: input.categories,
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies a partial update to an exercise.
    pub fn update(&self, id: RecordId, update: ExerciseUpdate) -> ClinicResult<Exercise> {
        let mut exercise = self.get(id)?;

        if let Some(name) = update.name {
            exercise.name = NonEmptyText::new(&name).map_err(|_| {
                ClinicError::ValidationFailed("exercise name must be a non-empty string".into())
            })?;
        }
        if let Some(exercise_type) = update.exercise_type {
            exercise.exercise_type = exercise_type;
        }
        if let Some(link) = update.link {
            exercise.link = Some(link);
        }
        if let Some(description) = update.description {
            exercise.description = Some(description);
        }
        if let Some(categories) = update.categories {
            CategoryService::new(self.cfg.clone()).ensure_exist(&categories)?;
            exercise.categories = categories;
        }
        exercise.updated_at = Utc::now();

        let doc_dir = storage::document_dir(&self.cfg.exercises_dir(), id);
        storage::write_document(&doc_dir, EXERCISE_FILE_NAME, &exercise)?;
        Ok(exercise)
    }

    pub fn get(&self, id: RecordId) -> ClinicResult<Exercise> {
        storage::read_document(&self.cfg.exercises_dir(), id, EXERCISE_FILE_NAME)?
            .ok_or_else(|| ClinicError::not_found(ENTITY, id))
    }

    /// Lists all exercises, sorted by name.
    pub fn list(&self) -> Vec<Exercise> {
        let mut exercises: Vec<Exercise> =
            storage::scan_documents(&self.cfg.exercises_dir(), EXERCISE_FILE_NAME);
        exercises.sort_by(|a, b| a.name.as_str().cmp(b.name.as_str()));
        exercises
    }

    pub fn delete(&self, id: RecordId) -> ClinicResult<()> {
        if !storage::delete_document(&self.cfg.exercises_dir(), id)? {
            return Err(ClinicError::not_found(ENTITY, id));
        }
        Ok(())
    }

    /// Fetches every referenced exercise, failing on the first missing id.
    pub(crate) fn fetch_many(&self, ids: &[RecordId]) -> ClinicResult<Vec<Exercise>> {
        ids.iter().map(|&id| self.get(id)).collect()
    }
}
