//! Patient training assignments.
//!
//! An assignment is one training scheduled for one patient on one date.
//! Scheduling is bulk by design: a clinician picks a training and a list of
//! dates, and one assignment is created per date. Assignment status is
//! reversible (unlike filled records and action plans there is no latch);
//! `completedDate` is stamped the first time an assignment completes, and an
//! explicitly supplied date always wins.
//!
//! The [`CompletedAssignments`] trait is the query seam the action-plan
//! completion linker depends on, taken as an explicit dependency rather than
//! resolved through any global registry.

use crate::config::CoreConfig;
use crate::constants::ASSIGNMENT_FILE_NAME;
use crate::error::{ClinicError, ClinicResult};
use crate::storage;
use crate::trainings::TrainingService;
use chrono::{DateTime, Utc};
use physio_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const ENTITY: &str = "patient training";

/// Completion state of an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Incompleted,
    Completed,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Incompleted => "incompleted",
            AssignmentStatus::Completed => "completed",
        }
    }
}

/// A training assigned to a patient for a specific date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientTraining {
    pub id: RecordId,
    pub patient_id: RecordId,
    pub training_id: RecordId,
    pub assigned_date: DateTime<Utc>,
    pub scheduled_date: DateTime<Utc>,
    pub status: AssignmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for bulk-scheduling a training: one assignment per scheduled date.
#[derive(Debug, Clone)]
pub struct ScheduleAssignments {
    pub training_id: RecordId,
    pub scheduled_dates: Vec<DateTime<Utc>>,
    /// Defaults to the creation time.
    pub assigned_date: Option<DateTime<Utc>>,
    /// Defaults to [`AssignmentStatus::Incompleted`].
    pub status: Option<AssignmentStatus>,
}

/// Partial update; `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default)]
pub struct AssignmentUpdate {
    pub scheduled_date: Option<DateTime<Utc>>,
    pub status: Option<AssignmentStatus>,
    /// Explicit completion date; overrides the automatic stamp.
    pub completed_date: Option<DateTime<Utc>>,
}

/// List filters; all optional, combined with AND.
#[derive(Debug, Clone, Default)]
pub struct AssignmentFilter {
    pub status: Option<AssignmentStatus>,
    pub scheduled_from: Option<DateTime<Utc>>,
    pub scheduled_to: Option<DateTime<Utc>>,
}

/// Query interface for completed assignments within a date window.
///
/// The action-plan completion linker takes this as an injected dependency, so
/// the data flow between plans and assignments stays visible and the linker
/// can be tested against a stub.
pub trait CompletedAssignments {
    /// Ids of the patient's assignments with status `completed` and a
    /// completion date within `[start, end]` **inclusive**.
    fn completed_in_range(
        &self,
        patient_id: RecordId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ClinicResult<Vec<RecordId>>;
}

/// Service for managing patient training assignments.
#[derive(Clone)]
pub struct AssignmentService {
    cfg: Arc<CoreConfig>,
}

impl AssignmentService {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }

    /// Bulk-creates assignments, one per scheduled date.
    ///
    /// # Errors
    ///
    /// Returns [`ClinicError::ValidationFailed`] when `scheduled_dates` is
    /// empty and [`ClinicError::NotFound`] when the training does not exist.
    pub fn schedule(
        &self,
        patient_id: RecordId,
        input: ScheduleAssignments,
    ) -> ClinicResult<Vec<PatientTraining>> {
        if input.scheduled_dates.is_empty() {
            return Err(ClinicError::ValidationFailed(
                "at least one scheduled date is required".into(),
            ));
        }
        TrainingService::new(self.cfg.clone()).get(input.training_id)?;

        let now = Utc::now();
        let status = input.status.unwrap_or(AssignmentStatus::Incompleted);
        let completed_date = match status {
            AssignmentStatus::Completed => Some(now),
            AssignmentStatus::Incompleted => None,
        };
        let assigned_date = input.assigned_date.unwrap_or(now);

        let mut created = Vec::with_capacity(input.scheduled_dates.len());
        for &scheduled_date in &input.scheduled_dates {
            let assignment = storage::create_document(
                &self.cfg.assignments_dir(),
                ASSIGNMENT_FILE_NAME,
                |id| PatientTraining {
                    id,
                    patient_id,
                    training_id: input.training_id,
                    assigned_date,
                    scheduled_date,
                    status,
                    completed_date,
                    created_at: now,
                    updated_at: now,
                },
            )?;
            created.push(assignment);
        }
        Ok(created)
    }

    /// Applies a partial update to a patient's assignment.
    pub fn update(
        &self,
        patient_id: RecordId,
        id: RecordId,
        update: AssignmentUpdate,
    ) -> ClinicResult<PatientTraining> {
        let mut assignment = self.fetch_scoped(patient_id, id)?;

        if let Some(scheduled_date) = update.scheduled_date {
            assignment.scheduled_date = scheduled_date;
        }
        if let Some(status) = update.status {
            // First completion stamps the date; reverting leaves it in place.
            if status == AssignmentStatus::Completed && assignment.completed_date.is_none() {
                assignment.completed_date = Some(Utc::now());
            }
            assignment.status = status;
        }
        if let Some(completed_date) = update.completed_date {
            assignment.completed_date = Some(completed_date);
        }
        assignment.updated_at = Utc::now();

        let doc_dir = storage::document_dir(&self.cfg.assignments_dir(), id);
        storage::write_document(&doc_dir, ASSIGNMENT_FILE_NAME, &assignment)?;
        Ok(assignment)
    }

    /// Fetches a patient's assignment by id.
    pub fn get(&self, patient_id: RecordId, id: RecordId) -> ClinicResult<PatientTraining> {
        self.fetch_scoped(patient_id, id)
    }

    /// Lists a patient's assignments matching the filter, earliest scheduled
    /// first.
    pub fn list(&self, patient_id: RecordId, filter: &AssignmentFilter) -> Vec<PatientTraining> {
        let mut assignments: Vec<PatientTraining> =
            storage::scan_documents(&self.cfg.assignments_dir(), ASSIGNMENT_FILE_NAME);
        assignments.retain(|assignment| {
            assignment.patient_id == patient_id
                && filter
                    .status
                    .map_or(true, |status| assignment.status == status)
                && filter
                    .scheduled_from
                    .map_or(true, |from| assignment.scheduled_date >= from)
                && filter
                    .scheduled_to
                    .map_or(true, |to| assignment.scheduled_date <= to)
        });
        assignments.sort_by(|a, b| a.scheduled_date.cmp(&b.scheduled_date));
        assignments
    }

    /// Deletes a patient's assignment.
    pub fn delete(&self, patient_id: RecordId, id: RecordId) -> ClinicResult<()> {
        self.fetch_scoped(patient_id, id)?;
        storage::delete_document(&self.cfg.assignments_dir(), id)?;
        Ok(())
    }

    fn fetch_scoped(&self, patient_id: RecordId, id: RecordId) -> ClinicResult<PatientTraining> {
        let assignment: Option<PatientTraining> =
            storage::read_document(&self.cfg.assignments_dir(), id, ASSIGNMENT_FILE_NAME)?;

        match assignment {
            Some(assignment) if assignment.patient_id == patient_id => Ok(assignment),
            _ => Err(ClinicError::not_found(ENTITY, id)),
        }
    }
}

impl CompletedAssignments for AssignmentService {
    fn completed_in_range(
        &self,
        patient_id: RecordId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ClinicResult<Vec<RecordId>> {
        let assignments: Vec<PatientTraining> =
            storage::scan_documents(&self.cfg.assignments_dir(), ASSIGNMENT_FILE_NAME);

        let mut completed: Vec<(DateTime<Utc>, RecordId)> = assignments
            .into_iter()
            .filter(|assignment| {
                assignment.patient_id == patient_id
                    && assignment.status == AssignmentStatus::Completed
                    && assignment
                        .completed_date
                        .map_or(false, |date| date >= start && date <= end)
            })
            .map(|assignment| {
                (
                    assignment.completed_date.unwrap_or(assignment.updated_at),
                    assignment.id,
                )
            })
            .collect();
        completed.sort();

        Ok(completed.into_iter().map(|(_, id)| id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn test_cfg(dir: &Path) -> Arc<CoreConfig> {
        Arc::new(CoreConfig::new(dir.to_path_buf()).expect("CoreConfig::new should succeed"))
    }

    fn seeded_training(cfg: &Arc<CoreConfig>) -> RecordId {
        TrainingService::new(cfg.clone())
            .create(crate::trainings::NewTraining {
                name: "Core stability".into(),
                owner: None,
                exercises: Vec::new(),
            })
            .expect("training create should succeed")
            .id
    }

    fn date(s: &str) -> DateTime<Utc> {
        s.parse().expect("should parse date")
    }

    #[test]
    fn test_schedule_creates_one_assignment_per_date() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let training_id = seeded_training(&cfg);
        let service = AssignmentService::new(cfg);
        let patient = RecordId::new();

        let created = service
            .schedule(
                patient,
                ScheduleAssignments {
                    training_id,
                    scheduled_dates: vec![
                        date("2026-04-01T08:00:00Z"),
                        date("2026-04-03T08:00:00Z"),
                        date("2026-04-05T08:00:00Z"),
                    ],
                    assigned_date: None,
                    status: None,
                },
            )
            .expect("schedule should succeed");

        assert_eq!(created.len(), 3);
        for assignment in &created {
            assert_eq!(assignment.status, AssignmentStatus::Incompleted);
            assert!(assignment.completed_date.is_none());
            assert_eq!(assignment.training_id, training_id);
        }
    }

    #[test]
    fn test_schedule_rejects_empty_date_list() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let training_id = seeded_training(&cfg);
        let service = AssignmentService::new(cfg);

        let err = service
            .schedule(
                RecordId::new(),
                ScheduleAssignments {
                    training_id,
                    scheduled_dates: Vec::new(),
                    assigned_date: None,
                    status: None,
                },
            )
            .expect_err("empty date list should fail");
        assert!(matches!(err, ClinicError::ValidationFailed(_)));
    }

    #[test]
    fn test_schedule_rejects_missing_training() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let service = AssignmentService::new(test_cfg(temp_dir.path()));

        let err = service
            .schedule(
                RecordId::new(),
                ScheduleAssignments {
                    training_id: RecordId::new(),
                    scheduled_dates: vec![date("2026-04-01T08:00:00Z")],
                    assigned_date: None,
                    status: None,
                },
            )
            .expect_err("missing training should fail");
        assert!(matches!(err, ClinicError::NotFound { .. }));
    }

    #[test]
    fn test_completion_stamps_date_once() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let training_id = seeded_training(&cfg);
        let service = AssignmentService::new(cfg);
        let patient = RecordId::new();

        let assignment = service
            .schedule(
                patient,
                ScheduleAssignments {
                    training_id,
                    scheduled_dates: vec![date("2026-04-01T08:00:00Z")],
                    assigned_date: None,
                    status: None,
                },
            )
            .expect("schedule should succeed")
            .remove(0);

        let completed = service
            .update(
                patient,
                assignment.id,
                AssignmentUpdate {
                    status: Some(AssignmentStatus::Completed),
                    ..AssignmentUpdate::default()
                },
            )
            .expect("update should succeed");
        let stamp = completed.completed_date.expect("completedDate should be set");

        // Reverting and completing again keeps the original stamp.
        service
            .update(
                patient,
                assignment.id,
                AssignmentUpdate {
                    status: Some(AssignmentStatus::Incompleted),
                    ..AssignmentUpdate::default()
                },
            )
            .expect("revert should succeed");
        let recompleted = service
            .update(
                patient,
                assignment.id,
                AssignmentUpdate {
                    status: Some(AssignmentStatus::Completed),
                    ..AssignmentUpdate::default()
                },
            )
            .expect("re-completion should succeed");

        assert_eq!(recompleted.completed_date, Some(stamp));
    }

    #[test]
    fn test_completed_in_range_bounds_are_inclusive() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let training_id = seeded_training(&cfg);
        let service = AssignmentService::new(cfg);
        let patient = RecordId::new();

        let start = date("2026-04-01T00:00:00Z");
        let end = date("2026-04-30T00:00:00Z");

        let completed_at = |when: DateTime<Utc>| -> RecordId {
            let assignment = service
                .schedule(
                    patient,
                    ScheduleAssignments {
                        training_id,
                        scheduled_dates: vec![when],
                        assigned_date: None,
                        status: None,
                    },
                )
                .expect("schedule should succeed")
                .remove(0);
            service
                .update(
                    patient,
                    assignment.id,
                    AssignmentUpdate {
                        status: Some(AssignmentStatus::Completed),
                        completed_date: Some(when),
                        ..AssignmentUpdate::default()
                    },
                )
                .expect("update should succeed")
                .id
        };

        let on_start = completed_at(start);
        let on_end = completed_at(end);
        let inside = completed_at(date("2026-04-15T12:00:00Z"));
        let after = completed_at(date("2026-05-01T00:00:00Z"));

        let ids = service
            .completed_in_range(patient, start, end)
            .expect("query should succeed");

        assert_eq!(ids.len(), 3);
        for id in [on_start, on_end, inside] {
            assert!(ids.contains(&id));
        }
        assert!(!ids.contains(&after));
    }

    #[test]
    fn test_completed_in_range_ignores_other_patients_and_incompleted() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let training_id = seeded_training(&cfg);
        let service = AssignmentService::new(cfg);
        let patient = RecordId::new();
        let other_patient = RecordId::new();

        let when = date("2026-04-10T08:00:00Z");
        // Incompleted assignment for our patient.
        service
            .schedule(
                patient,
                ScheduleAssignments {
                    training_id,
                    scheduled_dates: vec![when],
                    assigned_date: None,
                    status: None,
                },
            )
            .expect("schedule should succeed");
        // Completed assignment for a different patient.
        service
            .schedule(
                other_patient,
                ScheduleAssignments {
                    training_id,
                    scheduled_dates: vec![when],
                    assigned_date: None,
                    status: Some(AssignmentStatus::Completed),
                },
            )
            .expect("schedule should succeed");

        let ids = service
            .completed_in_range(patient, date("2026-04-01T00:00:00Z"), date("2026-04-30T00:00:00Z"))
            .expect("query should succeed");
        assert!(ids.is_empty());
    }

    #[test]
    fn test_update_is_scoped_to_patient() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());
        let training_id = seeded_training(&cfg);
        let service = AssignmentService::new(cfg);
        let patient = RecordId::new();

        let assignment = service
            .schedule(
                patient,
                ScheduleAssignments {
                    training_id,
                    scheduled_dates: vec![date("2026-04-01T08:00:00Z")],
                    assigned_date: None,
                    status: None,
                },
            )
            .expect("schedule should succeed")
            .remove(0);

        let err = service
            .update(RecordId::new(), assignment.id, AssignmentUpdate::default())
            .expect_err("another patient's id should read as absent");
        assert!(matches!(err, ClinicError::NotFound { .. }));
    }
}
