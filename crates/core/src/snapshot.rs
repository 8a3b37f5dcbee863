//! Template snapshots.
//!
//! A filled record never reads the live template after creation. At the moment
//! a record is created the template's definition is deep-copied into a
//! [`TemplateSnapshot`] embedded in the record, and that copy is never
//! re-synced - historical answers stay interpretable even if the template's
//! question wording or options later change, or the template is deleted.

use crate::error::{ClinicError, ClinicResult};
use crate::fields::FieldDef;
use crate::templates::{Template, TemplateKind, TemplateService};
use physio_types::NonEmptyText;
use physio_uuid::RecordId;
use serde::{Deserialize, Serialize};

/// A point-in-time copy of a template's definition, owned by a filled record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSnapshot {
    pub template_name: NonEmptyText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_description: Option<String>,
    pub fields: Vec<FieldDef>,
    /// Evaluation snapshots only; always empty for anamnesis.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<RecordId>,
}

impl TemplateSnapshot {
    /// Captures the template's definition verbatim, field order and options
    /// included.
    pub fn capture(template: &Template) -> Self {
        Self {
            template_name: template.name.clone(),
            template_description: template.description.clone(),
            fields: template.fields.clone(),
            categories: template.categories.clone(),
        }
    }

    /// Whether `label` names a field in this snapshot.
    pub(crate) fn contains_label(&self, label: &str) -> bool {
        self.fields.iter().any(|field| field.label == label)
    }
}

/// Snapshot Builder: fetches the live template and captures its definition.
///
/// # Errors
///
/// Returns [`ClinicError::NotFound`] when no template of that kind exists
/// under `template_id`, and [`ClinicError::TemplateInactive`] when the
/// template exists but is disabled.
pub fn build_snapshot(
    templates: &TemplateService,
    kind: TemplateKind,
    template_id: RecordId,
) -> ClinicResult<TemplateSnapshot> {
    let template = templates.get_of_kind(template_id, kind)?;
    if !template.is_active {
        return Err(ClinicError::TemplateInactive(template_id));
    }

    Ok(TemplateSnapshot::capture(&template))
}
