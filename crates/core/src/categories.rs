//! Exercise categories.
//!
//! Categories are the vocabulary the derived fields are built from: exercises
//! reference categories, trainings derive their category set from their
//! exercises, and evaluation templates scope themselves to categories.
//! Category names are unique across the collection; uniqueness is enforced by
//! an explicit pre-check here rather than by decoding a store error code.

use crate::config::CoreConfig;
use crate::constants::CATEGORY_FILE_NAME;
use crate::error::{ClinicError, ClinicResult};
use crate::storage;
use chrono::{DateTime, Utc};
use physio_types::NonEmptyText;
use physio_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const ENTITY: &str = "exercise category";

/// A named exercise category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseCategory {
    pub id: RecordId,
    pub name: NonEmptyText,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Service for managing exercise categories.
#[derive(Clone)]
pub struct CategoryService {
    cfg: Arc<CoreConfig>,
}

impl CategoryService {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }

    /// Creates a new category.
    ///
    /// # Errors
    ///
    /// Returns [`ClinicError::ValidationFailed`] for an empty name and
    /// [`ClinicError::DuplicateKey`] when the name is already taken.
    pub fn create(&self, name: &str) -> ClinicResult<ExerciseCategory> {
        let name = NonEmptyText::new(name).map_err(|_| {
            ClinicError::ValidationFailed("category name must be a non-empty string".into())
        })?;
        self.ensure_name_available(name.as_str(), None)?;

        let now = Utc::now();
        storage::create_document(&self.cfg.categories_dir(), CATEGORY_FILE_NAME, |id| {
            ExerciseCategory {
                id,
                name,
                created_at: now,
                updated_at: now,
            }
        })
    }

    /// Renames an existing category.
    pub fn update(&self, id: RecordId, name: &str) -> ClinicResult<ExerciseCategory> {
        let mut category = self.get(id)?;

        let name = NonEmptyText::new(name).map_err(|_| {
            ClinicError::ValidationFailed("category name must be a non-empty string".into())
        })?;
        self.ensure_name_available(name.as_str(), Some(id))?;

        category.name = name;
        category.updated_at = Utc::now();

        let doc_dir = storage::document_dir(&self.cfg.categories_dir(), id);
        storage::write_document(&doc_dir, CATEGORY_FILE_NAME, &category)?;
        Ok(category)
    }

    pub fn get(&self, id: RecordId) -> ClinicResult<ExerciseCategory> {
        storage::read_document(&self.cfg.categories_dir(), id, CATEGORY_FILE_NAME)?
            .ok_or_else(|| ClinicError::not_found(ENTITY, id))
    }

    /// Lists all categories, sorted by name.
    pub fn list(&self) -> Vec<ExerciseCategory> {
        let mut categories: Vec<ExerciseCategory> =
            storage::scan_documents(&self.cfg.categories_dir(), CATEGORY_FILE_NAME);
        categories.sort_by(|a, b| a.name.as_str().cmp(b.name.as_str()));
        categories
    }

    pub fn delete(&self, id: RecordId) -> ClinicResult<()> {
        if !storage::delete_document(&self.cfg.categories_dir(), id)? {
            return Err(ClinicError::not_found(ENTITY, id));
        }
        Ok(())
    }

    /// Checks every referenced category exists.
    pub(crate) fn ensure_exist(&self, ids: &[RecordId]) -> ClinicResult<()> {
        for &id in ids {
            self.get(id)?;
        }
        Ok(())
    }

    /// Duplicate-name pre-check; `exclude` skips the category being renamed.
    fn ensure_name_available(&self, name: &str, exclude: Option<RecordId>) -> ClinicResult<()> {
        let taken = self
            .list()
            .into_iter()
            .any(|category| category.name.as_str() == name && exclude != Some(category.id));

        if taken {
            return Err(ClinicError::DuplicateKey {
                entity: ENTITY,
                value: name.to_owned(),
            });
        }
        Ok(())
    }
}
