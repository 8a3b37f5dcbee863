//! Anamnesis and evaluation form templates.
//!
//! A template is a reusable, ordered list of field definitions a clinician
//! fills in against a patient. The two kinds are structurally identical
//! except that evaluation templates are additionally scoped to a set of
//! exercise categories, so a single [`Template`] type carries a
//! [`TemplateKind`] discriminant. Looking a template up under the wrong kind
//! behaves as if it did not exist.
//!
//! Deleting or editing a template never touches existing filled records:
//! those keep the snapshot captured when they were created.

use crate::categories::CategoryService;
use crate::config::CoreConfig;
use crate::constants::TEMPLATE_FILE_NAME;
use crate::error::{ClinicError, ClinicResult};
use crate::fields::{validate_fields, FieldDef, FieldInput};
use crate::storage;
use chrono::{DateTime, Utc};
use physio_types::NonEmptyText;
use physio_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which form family a template (or filled record) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    Anamnesis,
    Evaluation,
}

impl TemplateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::Anamnesis => "anamnesis",
            TemplateKind::Evaluation => "evaluation",
        }
    }

    /// Entity name used in `NotFound` errors for templates of this kind.
    pub(crate) fn template_entity(&self) -> &'static str {
        match self {
            TemplateKind::Anamnesis => "anamnesis template",
            TemplateKind::Evaluation => "evaluation template",
        }
    }

    /// Entity name used in `NotFound` errors for filled records of this kind.
    pub(crate) fn record_entity(&self) -> &'static str {
        match self {
            TemplateKind::Anamnesis => "anamnesis record",
            TemplateKind::Evaluation => "evaluation record",
        }
    }
}

/// A reusable form definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: RecordId,
    pub kind: TemplateKind,
    pub name: NonEmptyText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<FieldDef>,
    /// Evaluation templates only; always empty for anamnesis.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<RecordId>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a template.
#[derive(Debug, Clone)]
pub struct NewTemplate {
    pub name: String,
    pub description: Option<String>,
    pub fields: Vec<FieldInput>,
    /// Only meaningful for evaluation templates.
    pub categories: Vec<RecordId>,
    /// Defaults to `true`.
    pub is_active: Option<bool>,
}

/// Partial update; `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default)]
pub struct TemplateUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub fields: Option<Vec<FieldInput>>,
    pub categories: Option<Vec<RecordId>>,
    pub is_active: Option<bool>,
}

/// List filters; all optional, combined with AND.
#[derive(Debug, Clone, Default)]
pub struct TemplateFilter {
    pub kind: Option<TemplateKind>,
    pub is_active: Option<bool>,
    /// Case-insensitive substring match on the template name.
    pub search: Option<String>,
}

/// Service for managing form templates.
#[derive(Clone)]
pub struct TemplateService {
    cfg: Arc<CoreConfig>,
}

impl TemplateService {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }

    /// Creates a template of the given kind.
    ///
    /// # Errors
    ///
    /// Returns [`ClinicError::ValidationFailed`] for an empty name, an invalid
    /// field list, or categories supplied on an anamnesis template, and
    /// [`ClinicError::NotFound`] when an evaluation template references a
    /// category that does not exist.
    pub fn create(&self, kind: TemplateKind, input: NewTemplate) -> ClinicResult<Template> {
        let name = NonEmptyText::new(&input.name).map_err(|_| {
            ClinicError::ValidationFailed("template name must be a non-empty string".into())
        })?;
        let fields = validate_fields(input.fields)?;
        let categories = self.validated_categories(kind, input.categories)?;

        let now = Utc::now();
        storage::create_document(&self.cfg.templates_dir(), TEMPLATE_FILE_NAME, |id| Template {
            id,
            kind,
            name,
            description: input.description,
            fields,
            categories,
            is_active: input.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies a partial update to a template.
    ///
    /// Whatever is supplied is re-validated under the same rules as
    /// [`TemplateService::create`].
    pub fn update(&self, id: RecordId, update: TemplateUpdate) -> ClinicResult<Template> {
        let mut template = self.get(id)?;

        if let Some(name) = update.name {
            template.name = NonEmptyText::new(&name).map_err(|_| {
                ClinicError::ValidationFailed("template name must be a non-empty string".into())
            })?;
        }
        if let Some(description) = update.description {
            template.description = Some(description);
        }
        if let Some(fields) = update.fields {
            template.fields = validate_fields(fields)?;
        }
        if let Some(categories) = update.categories {
            template.categories = self.validated_categories(template.kind, categories)?;
        }
        if let Some(is_active) = update.is_active {
            template.is_active = is_active;
        }
        template.updated_at = Utc::now();

        let doc_dir = storage::document_dir(&self.cfg.templates_dir(), id);
        storage::write_document(&doc_dir, TEMPLATE_FILE_NAME, &template)?;
        Ok(template)
    }

    /// Fetches a template regardless of kind.
    pub fn get(&self, id: RecordId) -> ClinicResult<Template> {
        storage::read_document(&self.cfg.templates_dir(), id, TEMPLATE_FILE_NAME)?
            .ok_or_else(|| ClinicError::not_found("template", id))
    }

    /// Fetches a template of a specific kind; a kind mismatch reads as absent.
    pub fn get_of_kind(&self, id: RecordId, kind: TemplateKind) -> ClinicResult<Template> {
        match self.get(id) {
            Ok(template) if template.kind == kind => Ok(template),
            Ok(_) | Err(ClinicError::NotFound { .. }) => {
                Err(ClinicError::not_found(kind.template_entity(), id))
            }
            Err(err) => Err(err),
        }
    }

    /// Lists templates matching the filter, sorted by name.
    pub fn list(&self, filter: &TemplateFilter) -> Vec<Template> {
        let search = filter.search.as_ref().map(|s| s.to_lowercase());

        let mut templates: Vec<Template> =
            storage::scan_documents(&self.cfg.templates_dir(), TEMPLATE_FILE_NAME);
        templates.retain(|template| {
            filter.kind.map_or(true, |kind| template.kind == kind)
                && filter
                    .is_active
                    .map_or(true, |active| template.is_active == active)
                && search.as_ref().map_or(true, |needle| {
                    template.name.as_str().to_lowercase().contains(needle)
                })
        });
        templates.sort_by(|a, b| a.name.as_str().cmp(b.name.as_str()));
        templates
    }

    pub fn delete(&self, id: RecordId) -> ClinicResult<()> {
        if !storage::delete_document(&self.cfg.templates_dir(), id)? {
            return Err(ClinicError::not_found("template", id));
        }
        Ok(())
    }

    fn validated_categories(
        &self,
        kind: TemplateKind,
        categories: Vec<RecordId>,
    ) -> ClinicResult<Vec<RecordId>> {
        match kind {
            TemplateKind::Anamnesis => {
                if !categories.is_empty() {
                    return Err(ClinicError::ValidationFailed(
                        "anamnesis templates do not carry categories".into(),
                    ));
                }
                Ok(Vec::new())
            }
            TemplateKind::Evaluation => {
                CategoryService::new(self.cfg.clone()).ensure_exist(&categories)?;
                Ok(categories)
            }
        }
    }
}
