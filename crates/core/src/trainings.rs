//! Trainings and the derived category set.
//!
//! A training is an ordered list of exercise references. Its `categories`
//! field is derived - the deduplicated union of the referenced exercises'
//! category sets - and is recomputed whenever the exercise list changes,
//! eagerly, so category-based filtering never needs a join-time computation.
//! Callers can never set categories directly.

use crate::config::CoreConfig;
use crate::constants::TRAINING_FILE_NAME;
use crate::error::{ClinicError, ClinicResult};
use crate::exercises::ExerciseService;
use crate::storage;
use chrono::{DateTime, Utc};
use physio_types::NonEmptyText;
use physio_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const ENTITY: &str = "training";

/// A reusable training programme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Training {
    pub id: RecordId,
    pub name: NonEmptyText,
    /// Clinician the training belongs to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<RecordId>,
    pub exercises: Vec<RecordId>,
    /// Derived from the exercises' categories; never settable by callers.
    #[serde(default)]
    pub categories: Vec<RecordId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a training. Note the absence of a categories field.
#[derive(Debug, Clone)]
pub struct NewTraining {
    pub name: String,
    pub owner: Option<RecordId>,
    pub exercises: Vec<RecordId>,
}

/// Partial update; `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default)]
pub struct TrainingUpdate {
    pub name: Option<String>,
    pub owner: Option<RecordId>,
    pub exercises: Option<Vec<RecordId>>,
}

/// Derived-Category Aggregator.
///
/// Fetches every referenced exercise and returns the union of their category
/// sets, duplicates collapsed, first-seen order preserved (ordering carries no
/// meaning, it is just kept deterministic).
///
/// # Errors
///
/// Returns [`ClinicError::NotFound`] if any exercise id does not exist - the
/// training is not saved with a partially derived set.
pub fn derive_categories(
    exercises: &ExerciseService,
    exercise_ids: &[RecordId],
) -> ClinicResult<Vec<RecordId>> {
    let fetched = exercises.fetch_many(exercise_ids)?;

    let mut categories = Vec::new();
    for exercise in &fetched {
        for &category in &exercise.categories {
            if !categories.contains(&category) {
                categories.push(category);
            }
        }
    }
    Ok(categories)
}

/// Service for managing trainings.
#[derive(Clone)]
pub struct TrainingService {
    cfg: Arc<CoreConfig>,
}

impl TrainingService {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }

    /// Creates a training; the category set is derived before the first save.
    pub fn create(&self, input: NewTraining) -> ClinicResult<Training> {
        let name = NonEmptyText::new(&input.name).map_err(|_| {
            ClinicError::ValidationFailed("training name must be a non-empty string".into())
        })?;

        let exercise_service = ExerciseService::new(self.cfg.clone());
        let categories = derive_categories(&exercise_service, &input.exercises)?;

        let now = Utc::now();
        storage::create_document(&self.cfg.trainings_dir(), TRAINING_FILE_NAME, |id| Training {
            id,
            name,
            owner: input.owner,
            exercises: input.exercises,
            categories,
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies a partial update.
    ///
    /// Supplying an exercise list re-runs the aggregator and overwrites the
    /// stored categories; a name-only update leaves them untouched.
    pub fn update(&self, id: RecordId, update: TrainingUpdate) -> ClinicResult<Training> {
        let mut training = self.get(id)?;

        if let Some(name) = update.name {
            training.name = NonEmptyText::new(&name).map_err(|_| {
                ClinicError::ValidationFailed("training name must be a non-empty string".into())
            })?;
        }
        if let Some(owner) = update.owner {
            training.owner = Some(owner);
        }
        if let Some(exercises) = update.exercises {
            let exercise_service = ExerciseService::new(self.cfg.clone());
            training.categories = derive_categories(&exercise_service, &exercises)?;
            training.exercises = exercises;
            tracing::debug!("recomputed categories for training {}", training.id);
        }
        training.updated_at = Utc::now();

        let doc_dir = storage::document_dir(&self.cfg.trainings_dir(), id);
        storage::write_document(&doc_dir, TRAINING_FILE_NAME, &training)?;
        Ok(training)
    }

    pub fn get(&self, id: RecordId) -> ClinicResult<Training> {
        storage::read_document(&self.cfg.trainings_dir(), id, TRAINING_FILE_NAME)?
            .ok_or_else(|| ClinicError::not_found(ENTITY, id))
    }

    /// Lists all trainings, sorted by name.
    pub fn list(&self) -> Vec<Training> {
        let mut trainings: Vec<Training> =
            storage::scan_documents(&self.cfg.trainings_dir(), TRAINING_FILE_NAME);
        trainings.sort_by(|a, b| a.name.as_str().cmp(b.name.as_str()));
        trainings
    }

    pub fn delete(&self, id: RecordId) -> ClinicResult<()> {
        if !storage::delete_document(&self.cfg.trainings_dir(), id)? {
            return Err(ClinicError::not_found(ENTITY, id));
        }
        Ok(())
    }
}
