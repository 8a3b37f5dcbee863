//! Filled anamnesis and evaluation records.
//!
//! A filled record is one patient's submission against a snapshotted
//! template. Its lifecycle is a two-state machine:
//!
//! ```text
//! draft ──────> completed
//!   ^               │
//!   └───── X ───────┘   (completed is a one-way latch)
//! ```
//!
//! Entering `completed` requires an answer for every field in the record's
//! snapshot; the failure reports exactly the missing labels, in snapshot
//! field order. Answers always validate against the record's own snapshot -
//! never the live template - and are replaced wholesale when supplied.
//! `completedDate` is stamped the first time the record completes and is
//! never re-stamped, though an explicitly supplied value always wins.
//!
//! The engine has no side effects beyond the record's own state: no cascading
//! writes to templates or any other entity.

use crate::config::CoreConfig;
use crate::constants::RECORD_FILE_NAME;
use crate::error::{ClinicError, ClinicResult};
use crate::snapshot::{build_snapshot, TemplateSnapshot};
use crate::storage;
use crate::templates::{TemplateKind, TemplateService};
use chrono::{DateTime, Utc};
use physio_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Lifecycle state of a filled record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Draft,
    Completed,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Draft => "draft",
            RecordStatus::Completed => "completed",
        }
    }
}

/// A patient's answer to one snapshot field, keyed by field label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub field_label: String,
    pub value: String,
}

/// A patient's in-progress or completed submission against a snapshotted
/// template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilledRecord {
    pub id: RecordId,
    pub kind: TemplateKind,
    pub patient_id: RecordId,
    /// Kept for traceability only; never consulted after creation.
    pub template_id: RecordId,
    pub template_snapshot: TemplateSnapshot,
    pub answers: Vec<Answer>,
    pub filled_date: DateTime<Utc>,
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a filled record.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub template_id: RecordId,
    pub answers: Vec<Answer>,
    /// Defaults to [`RecordStatus::Draft`].
    pub status: Option<RecordStatus>,
    /// Defaults to the creation time.
    pub filled_date: Option<DateTime<Utc>>,
}

/// Partial update; `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default)]
pub struct RecordUpdate {
    /// Replaces the answer list wholesale when supplied.
    pub answers: Option<Vec<Answer>>,
    pub status: Option<RecordStatus>,
    /// Explicit completion date; overrides the automatic stamp.
    pub completed_date: Option<DateTime<Utc>>,
}

/// List filters; all optional, combined with AND.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub status: Option<RecordStatus>,
    pub template_id: Option<RecordId>,
    pub filled_from: Option<DateTime<Utc>>,
    pub filled_to: Option<DateTime<Utc>>,
}

/// Service for managing filled records - the filled-record state machine.
#[derive(Clone)]
pub struct RecordService {
    cfg: Arc<CoreConfig>,
}

impl RecordService {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }

    /// Creates a filled record for a patient from a live template.
    ///
    /// The template's definition is snapshotted into the record (see
    /// [`build_snapshot`]). A record may be created directly in the
    /// `completed` state, in which case the completeness guard runs and
    /// `completedDate` is stamped.
    ///
    /// # Errors
    ///
    /// - [`ClinicError::NotFound`] - no active-kind template under
    ///   `template_id`.
    /// - [`ClinicError::TemplateInactive`] - template exists but is disabled.
    /// - [`ClinicError::UnknownField`] - an answer names a label absent from
    ///   the snapshot.
    /// - [`ClinicError::IncompleteSubmission`] - created as `completed` with
    ///   unanswered fields; carries the missing labels.
    pub fn create(
        &self,
        kind: TemplateKind,
        patient_id: RecordId,
        input: NewRecord,
    ) -> ClinicResult<FilledRecord> {
        let templates = TemplateService::new(self.cfg.clone());
        let snapshot = build_snapshot(&templates, kind, input.template_id)?;

        validate_answers(&snapshot, &input.answers)?;

        let status = input.status.unwrap_or(RecordStatus::Draft);
        let now = Utc::now();
        let completed_date = match status {
            RecordStatus::Completed => {
                ensure_complete(&snapshot, &input.answers)?;
                Some(now)
            }
            RecordStatus::Draft => None,
        };

        storage::create_document(&self.cfg.records_dir(), RECORD_FILE_NAME, |id| FilledRecord {
            id,
            kind,
            patient_id,
            template_id: input.template_id,
            template_snapshot: snapshot,
            answers: input.answers,
            filled_date: input.filled_date.unwrap_or(now),
            status,
            completed_date,
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies a partial update to a patient's record.
    ///
    /// Guard order matches the lifecycle rules: the one-way latch is checked
    /// first (a rejected transition leaves the record untouched), answers are
    /// replaced next, and a transition into `completed` then validates
    /// completeness against the record's current answers.
    ///
    /// # Errors
    ///
    /// - [`ClinicError::NotFound`] - no record of this kind for this patient.
    /// - [`ClinicError::IllegalTransition`] - completed → draft.
    /// - [`ClinicError::UnknownField`] / [`ClinicError::IncompleteSubmission`]
    ///   - as on creation.
    pub fn update(
        &self,
        kind: TemplateKind,
        patient_id: RecordId,
        id: RecordId,
        update: RecordUpdate,
    ) -> ClinicResult<FilledRecord> {
        let mut record = self.fetch_scoped(kind, patient_id, id)?;

        if record.status == RecordStatus::Completed && update.status == Some(RecordStatus::Draft) {
            return Err(ClinicError::IllegalTransition {
                from: "completed",
                to: "draft",
            });
        }

        if let Some(answers) = update.answers {
            validate_answers(&record.template_snapshot, &answers)?;
            record.answers = answers;
        }

        if let Some(status) = update.status {
            if status == RecordStatus::Completed {
                ensure_complete(&record.template_snapshot, &record.answers)?;
                if record.completed_date.is_none() {
                    record.completed_date = Some(Utc::now());
                }
            }
            record.status = status;
        }

        if let Some(completed_date) = update.completed_date {
            record.completed_date = Some(completed_date);
        }

        record.updated_at = Utc::now();

        let doc_dir = storage::document_dir(&self.cfg.records_dir(), id);
        storage::write_document(&doc_dir, RECORD_FILE_NAME, &record)?;
        Ok(record)
    }

    /// Fetches a patient's record by id.
    pub fn get(
        &self,
        kind: TemplateKind,
        patient_id: RecordId,
        id: RecordId,
    ) -> ClinicResult<FilledRecord> {
        self.fetch_scoped(kind, patient_id, id)
    }

    /// Lists a patient's records matching the filter, most recently filled
    /// first.
    pub fn list(
        &self,
        kind: TemplateKind,
        patient_id: RecordId,
        filter: &RecordFilter,
    ) -> Vec<FilledRecord> {
        let mut records: Vec<FilledRecord> =
            storage::scan_documents(&self.cfg.records_dir(), RECORD_FILE_NAME);
        records.retain(|record| {
            record.kind == kind
                && record.patient_id == patient_id
                && filter.status.map_or(true, |status| record.status == status)
                && filter
                    .template_id
                    .map_or(true, |template_id| record.template_id == template_id)
                && filter.filled_from.map_or(true, |from| record.filled_date >= from)
                && filter.filled_to.map_or(true, |to| record.filled_date <= to)
        });
        records.sort_by(|a, b| b.filled_date.cmp(&a.filled_date));
        records
    }

    /// Deletes a patient's record.
    pub fn delete(
        &self,
        kind: TemplateKind,
        patient_id: RecordId,
        id: RecordId,
    ) -> ClinicResult<()> {
        self.fetch_scoped(kind, patient_id, id)?;
        storage::delete_document(&self.cfg.records_dir(), id)?;
        Ok(())
    }

    /// Reads a record and checks it belongs to this patient and kind; any
    /// mismatch reads as absent.
    fn fetch_scoped(
        &self,
        kind: TemplateKind,
        patient_id: RecordId,
        id: RecordId,
    ) -> ClinicResult<FilledRecord> {
        let record: Option<FilledRecord> =
            storage::read_document(&self.cfg.records_dir(), id, RECORD_FILE_NAME)?;

        match record {
            Some(record) if record.kind == kind && record.patient_id == patient_id => Ok(record),
            _ => Err(ClinicError::not_found(kind.record_entity(), id)),
        }
    }
}

/// Every submitted answer must name a field in the record's own snapshot and
/// carry a non-empty value.
fn validate_answers(snapshot: &TemplateSnapshot, answers: &[Answer]) -> ClinicResult<()> {
    for answer in answers {
        if !snapshot.contains_label(&answer.field_label) {
            return Err(ClinicError::UnknownField(answer.field_label.clone()));
        }
        if answer.value.trim().is_empty() {
            return Err(ClinicError::ValidationFailed(format!(
                "answer for \"{}\" must not be empty",
                answer.field_label
            )));
        }
    }
    Ok(())
}

/// Completeness guard for entering `completed`: every snapshot field label
/// must be answered. Missing labels are reported in snapshot field order.
fn ensure_complete(snapshot: &TemplateSnapshot, answers: &[Answer]) -> ClinicResult<()> {
    let answered: HashSet<&str> = answers.iter().map(|a| a.field_label.as_str()).collect();
    let missing_fields: Vec<String> = snapshot
        .fields
        .iter()
        .filter(|field| !answered.contains(field.label.as_str()))
        .map(|field| field.label.clone())
        .collect();

    if !missing_fields.is_empty() {
        return Err(ClinicError::IncompleteSubmission { missing_fields });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{FieldInput, FieldType};
    use crate::templates::{NewTemplate, TemplateUpdate};
    use std::path::Path;
    use tempfile::TempDir;

    fn test_cfg(dir: &Path) -> Arc<CoreConfig> {
        Arc::new(CoreConfig::new(dir.to_path_buf()).expect("CoreConfig::new should succeed"))
    }

    fn text_field(label: &str) -> FieldInput {
        FieldInput {
            label: label.into(),
            field_type: FieldType::Text,
            placeholder: None,
            options: Vec::new(),
            order: None,
        }
    }

    fn intake_template(service: &TemplateService, labels: &[&str]) -> crate::templates::Template {
        service
            .create(
                TemplateKind::Anamnesis,
                NewTemplate {
                    name: "Intake".into(),
                    description: None,
                    fields: labels.iter().map(|label| text_field(label)).collect(),
                    categories: Vec::new(),
                    is_active: None,
                },
            )
            .expect("template create should succeed")
    }

    fn answer(label: &str, value: &str) -> Answer {
        Answer {
            field_label: label.into(),
            value: value.into(),
        }
    }

    fn draft_record(template_id: RecordId, answers: Vec<Answer>) -> NewRecord {
        NewRecord {
            template_id,
            answers,
            status: None,
            filled_date: None,
        }
    }

    #[test]
    fn test_create_snapshots_template_and_defaults_to_draft() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let templates = TemplateService::new(cfg.clone());
        let records = RecordService::new(cfg);

        let template = intake_template(&templates, &["pain_level", "notes"]);
        let patient = RecordId::new();

        let record = records
            .create(TemplateKind::Anamnesis, patient, draft_record(template.id, Vec::new()))
            .expect("create should succeed");

        assert_eq!(record.status, RecordStatus::Draft);
        assert!(record.completed_date.is_none());
        assert_eq!(record.template_snapshot.fields, template.fields);
        assert_eq!(record.template_snapshot.template_name, template.name);
    }

    #[test]
    fn test_snapshot_survives_template_mutation() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let templates = TemplateService::new(cfg.clone());
        let records = RecordService::new(cfg);

        let template = intake_template(&templates, &["pain_level", "notes"]);
        let patient = RecordId::new();
        let record = records
            .create(TemplateKind::Anamnesis, patient, draft_record(template.id, Vec::new()))
            .expect("create should succeed");
        let original_fields = record.template_snapshot.fields.clone();

        templates
            .update(
                template.id,
                TemplateUpdate {
                    fields: Some(vec![text_field("entirely_new_question")]),
                    ..TemplateUpdate::default()
                },
            )
            .expect("template update should succeed");

        let stored = records
            .get(TemplateKind::Anamnesis, patient, record.id)
            .expect("get should succeed");
        assert_eq!(
            stored.template_snapshot.fields, original_fields,
            "snapshot must not track template edits"
        );
    }

    #[test]
    fn test_create_rejects_unknown_answer_label() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let templates = TemplateService::new(cfg.clone());
        let records = RecordService::new(cfg);

        let template = intake_template(&templates, &["notes"]);
        let err = records
            .create(
                TemplateKind::Anamnesis,
                RecordId::new(),
                draft_record(template.id, vec![answer("no_such_field", "5")]),
            )
            .expect_err("unknown label should fail");

        assert!(matches!(err, ClinicError::UnknownField(label) if label == "no_such_field"));
    }

    #[test]
    fn test_create_completed_requires_all_answers() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let templates = TemplateService::new(cfg.clone());
        let records = RecordService::new(cfg);

        let template = intake_template(&templates, &["pain_level", "notes"]);
        let err = records
            .create(
                TemplateKind::Anamnesis,
                RecordId::new(),
                NewRecord {
                    template_id: template.id,
                    answers: vec![answer("pain_level", "5")],
                    status: Some(RecordStatus::Completed),
                    filled_date: None,
                },
            )
            .expect_err("incomplete submission should fail");

        assert!(matches!(
            err,
            ClinicError::IncompleteSubmission { missing_fields } if missing_fields == vec!["notes"]
        ));
    }

    #[test]
    fn test_completed_to_draft_is_rejected_and_record_unchanged() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let templates = TemplateService::new(cfg.clone());
        let records = RecordService::new(cfg);

        let template = intake_template(&templates, &["notes"]);
        let patient = RecordId::new();
        let record = records
            .create(
                TemplateKind::Anamnesis,
                patient,
                NewRecord {
                    template_id: template.id,
                    answers: vec![answer("notes", "none")],
                    status: Some(RecordStatus::Completed),
                    filled_date: None,
                },
            )
            .expect("create should succeed");

        let err = records
            .update(
                TemplateKind::Anamnesis,
                patient,
                record.id,
                RecordUpdate {
                    status: Some(RecordStatus::Draft),
                    ..RecordUpdate::default()
                },
            )
            .expect_err("completed -> draft should be rejected");
        assert!(matches!(
            err,
            ClinicError::IllegalTransition { from: "completed", to: "draft" }
        ));

        let stored = records
            .get(TemplateKind::Anamnesis, patient, record.id)
            .expect("get should succeed");
        assert_eq!(stored.status, RecordStatus::Completed);
        assert_eq!(stored.updated_at, record.updated_at, "record must be unchanged");
    }

    #[test]
    fn test_completed_date_is_stamped_once() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let templates = TemplateService::new(cfg.clone());
        let records = RecordService::new(cfg);

        let template = intake_template(&templates, &["notes"]);
        let patient = RecordId::new();
        let record = records
            .create(
                TemplateKind::Anamnesis,
                patient,
                draft_record(template.id, vec![answer("notes", "none")]),
            )
            .expect("create should succeed");

        let completed = records
            .update(
                TemplateKind::Anamnesis,
                patient,
                record.id,
                RecordUpdate {
                    status: Some(RecordStatus::Completed),
                    ..RecordUpdate::default()
                },
            )
            .expect("completion should succeed");
        let first_stamp = completed.completed_date.expect("completedDate should be set");

        // Re-submitting completed is idempotent for the stamp.
        let again = records
            .update(
                TemplateKind::Anamnesis,
                patient,
                record.id,
                RecordUpdate {
                    status: Some(RecordStatus::Completed),
                    ..RecordUpdate::default()
                },
            )
            .expect("re-completion should succeed");
        assert_eq!(again.completed_date, Some(first_stamp));

        // An explicitly supplied date wins.
        let explicit = "2026-01-05T10:00:00Z"
            .parse::<DateTime<Utc>>()
            .expect("should parse");
        let overridden = records
            .update(
                TemplateKind::Anamnesis,
                patient,
                record.id,
                RecordUpdate {
                    completed_date: Some(explicit),
                    ..RecordUpdate::default()
                },
            )
            .expect("explicit date should succeed");
        assert_eq!(overridden.completed_date, Some(explicit));
    }

    #[test]
    fn test_update_replaces_answers_wholesale() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let templates = TemplateService::new(cfg.clone());
        let records = RecordService::new(cfg);

        let template = intake_template(&templates, &["pain_level", "notes"]);
        let patient = RecordId::new();
        let record = records
            .create(
                TemplateKind::Anamnesis,
                patient,
                draft_record(
                    template.id,
                    vec![answer("pain_level", "5"), answer("notes", "stiff")],
                ),
            )
            .expect("create should succeed");

        let updated = records
            .update(
                TemplateKind::Anamnesis,
                patient,
                record.id,
                RecordUpdate {
                    answers: Some(vec![answer("notes", "improving")]),
                    ..RecordUpdate::default()
                },
            )
            .expect("update should succeed");

        assert_eq!(
            updated.answers,
            vec![answer("notes", "improving")],
            "answers are replaced, not merged"
        );
    }

    #[test]
    fn test_update_rejects_unknown_label_and_leaves_record_unchanged() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let templates = TemplateService::new(cfg.clone());
        let records = RecordService::new(cfg);

        let template = intake_template(&templates, &["notes"]);
        let patient = RecordId::new();
        let record = records
            .create(
                TemplateKind::Anamnesis,
                patient,
                draft_record(template.id, vec![answer("notes", "none")]),
            )
            .expect("create should succeed");

        let err = records
            .update(
                TemplateKind::Anamnesis,
                patient,
                record.id,
                RecordUpdate {
                    answers: Some(vec![answer("bogus", "x")]),
                    ..RecordUpdate::default()
                },
            )
            .expect_err("unknown label should fail");
        assert!(matches!(err, ClinicError::UnknownField(_)));

        let stored = records
            .get(TemplateKind::Anamnesis, patient, record.id)
            .expect("get should succeed");
        assert_eq!(stored.answers, record.answers);
    }

    #[test]
    fn test_get_is_scoped_to_patient_and_kind() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let templates = TemplateService::new(cfg.clone());
        let records = RecordService::new(cfg);

        let template = intake_template(&templates, &["notes"]);
        let patient = RecordId::new();
        let record = records
            .create(TemplateKind::Anamnesis, patient, draft_record(template.id, Vec::new()))
            .expect("create should succeed");

        let err = records
            .get(TemplateKind::Anamnesis, RecordId::new(), record.id)
            .expect_err("another patient's id should read as absent");
        assert!(matches!(err, ClinicError::NotFound { .. }));

        let err = records
            .get(TemplateKind::Evaluation, patient, record.id)
            .expect_err("wrong kind should read as absent");
        assert!(matches!(err, ClinicError::NotFound { .. }));
    }

    #[test]
    fn test_list_filters_and_sorts_by_filled_date() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let templates = TemplateService::new(cfg.clone());
        let records = RecordService::new(cfg);

        let template = intake_template(&templates, &["notes"]);
        let patient = RecordId::new();

        let early = "2026-03-01T09:00:00Z".parse::<DateTime<Utc>>().expect("should parse");
        let late = "2026-03-08T09:00:00Z".parse::<DateTime<Utc>>().expect("should parse");

        records
            .create(
                TemplateKind::Anamnesis,
                patient,
                NewRecord {
                    template_id: template.id,
                    answers: Vec::new(),
                    status: None,
                    filled_date: Some(early),
                },
            )
            .expect("create should succeed");
        records
            .create(
                TemplateKind::Anamnesis,
                patient,
                NewRecord {
                    template_id: template.id,
                    answers: vec![answer("notes", "none")],
                    status: Some(RecordStatus::Completed),
                    filled_date: Some(late),
                },
            )
            .expect("create should succeed");

        let all = records.list(TemplateKind::Anamnesis, patient, &RecordFilter::default());
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].filled_date, late, "most recently filled first");

        let drafts = records.list(
            TemplateKind::Anamnesis,
            patient,
            &RecordFilter {
                status: Some(RecordStatus::Draft),
                ..RecordFilter::default()
            },
        );
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].filled_date, early);
    }

    // The full lifecycle: template -> draft with partial answers -> failed
    // completion listing the missing label -> successful completion.
    #[test]
    fn test_end_to_end_anamnesis_lifecycle() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let templates = TemplateService::new(cfg.clone());
        let records = RecordService::new(cfg);

        let template = intake_template(&templates, &["pain_level", "notes"]);
        let patient = RecordId::new();

        let record = records
            .create(
                TemplateKind::Anamnesis,
                patient,
                draft_record(template.id, vec![answer("pain_level", "5")]),
            )
            .expect("create should succeed");

        let err = records
            .update(
                TemplateKind::Anamnesis,
                patient,
                record.id,
                RecordUpdate {
                    status: Some(RecordStatus::Completed),
                    ..RecordUpdate::default()
                },
            )
            .expect_err("completion with a missing answer should fail");
        assert!(matches!(
            err,
            ClinicError::IncompleteSubmission { missing_fields } if missing_fields == vec!["notes"]
        ));

        let completed = records
            .update(
                TemplateKind::Anamnesis,
                patient,
                record.id,
                RecordUpdate {
                    answers: Some(vec![answer("pain_level", "5"), answer("notes", "none")]),
                    status: Some(RecordStatus::Completed),
                    ..RecordUpdate::default()
                },
            )
            .expect("completion should succeed");

        assert_eq!(completed.status, RecordStatus::Completed);
        assert!(completed.completed_date.is_some());
    }
}
