//! Patient action plans.
//!
//! An action plan frames a treatment period for one patient: a date range, a
//! diagnosis, and a plan description. Its status is a one-way latch
//! (`in_progress` → `completed`), and its `trainings` field is derived - at
//! the moment the status changes to `completed`, the patient's completed
//! training assignments within the plan's date range are attached. This is a
//! snapshot-at-completion, not a live view: an assignment completed inside
//! the window *after* the plan completes never appears retroactively.
//!
//! The linker takes its assignment query as an injected
//! [`CompletedAssignments`] dependency.

use crate::assignments::CompletedAssignments;
use crate::config::CoreConfig;
use crate::constants::PLAN_FILE_NAME;
use crate::error::{ClinicError, ClinicResult};
use crate::storage;
use chrono::{DateTime, Utc};
use physio_types::NonEmptyText;
use physio_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const ENTITY: &str = "action plan";

/// Lifecycle state of an action plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    InProgress,
    Completed,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::InProgress => "in_progress",
            PlanStatus::Completed => "completed",
        }
    }
}

/// A treatment action plan for one patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionPlan {
    pub id: RecordId,
    pub patient_id: RecordId,
    pub start_date: DateTime<Utc>,
    /// Always after `start_date`.
    pub end_date: DateTime<Utc>,
    pub diagnosis: NonEmptyText,
    pub plan_description: NonEmptyText,
    pub status: PlanStatus,
    /// Derived: completed assignment ids attached when the plan completes.
    #[serde(default)]
    pub trainings: Vec<RecordId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an action plan.
#[derive(Debug, Clone)]
pub struct NewPlan {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub diagnosis: String,
    pub plan_description: String,
    /// Defaults to [`PlanStatus::InProgress`].
    pub status: Option<PlanStatus>,
}

/// Partial update; `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default)]
pub struct PlanUpdate {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub diagnosis: Option<String>,
    pub plan_description: Option<String>,
    pub status: Option<PlanStatus>,
}

/// List filters; all optional, combined with AND.
#[derive(Debug, Clone, Default)]
pub struct PlanFilter {
    pub status: Option<PlanStatus>,
    /// Plans starting on or after this instant.
    pub starts_from: Option<DateTime<Utc>>,
    /// Plans ending on or before this instant.
    pub ends_until: Option<DateTime<Utc>>,
}

/// Service for managing action plans.
#[derive(Clone)]
pub struct PlanService {
    cfg: Arc<CoreConfig>,
}

impl PlanService {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }

    /// Creates an action plan.
    ///
    /// A plan created directly in the `completed` state links its trainings
    /// immediately - the status field is being set to `completed`, so the
    /// linker fires exactly as it would on an update.
    ///
    /// # Errors
    ///
    /// Returns [`ClinicError::ValidationFailed`] when the diagnosis or
    /// description is empty, or `end_date` is not after `start_date`.
    pub fn create(
        &self,
        patient_id: RecordId,
        input: NewPlan,
        completed: &dyn CompletedAssignments,
    ) -> ClinicResult<ActionPlan> {
        let diagnosis = NonEmptyText::new(&input.diagnosis).map_err(|_| {
            ClinicError::ValidationFailed("diagnosis must be a non-empty string".into())
        })?;
        let plan_description = NonEmptyText::new(&input.plan_description).map_err(|_| {
            ClinicError::ValidationFailed("plan description must be a non-empty string".into())
        })?;
        ensure_date_order(input.start_date, input.end_date)?;

        let status = input.status.unwrap_or(PlanStatus::InProgress);
        let trainings = match status {
            PlanStatus::Completed => {
                completed.completed_in_range(patient_id, input.start_date, input.end_date)?
            }
            PlanStatus::InProgress => Vec::new(),
        };

        let now = Utc::now();
        storage::create_document(&self.cfg.plans_dir(), PLAN_FILE_NAME, |id| ActionPlan {
            id,
            patient_id,
            start_date: input.start_date,
            end_date: input.end_date,
            diagnosis,
            plan_description,
            status,
            trainings,
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies a partial update to a patient's plan.
    ///
    /// The date invariant is re-checked after the updates are applied, so a
    /// partial date change cannot invert the range. When the status field
    /// changes to `completed` the linker replaces `trainings` with the
    /// patient's completed assignments inside the (possibly just-updated)
    /// date range - once, at that moment. It never re-runs while the plan
    /// stays completed.
    ///
    /// # Errors
    ///
    /// - [`ClinicError::NotFound`] - no plan for this patient under `id`.
    /// - [`ClinicError::IllegalTransition`] - completed → in_progress.
    /// - [`ClinicError::ValidationFailed`] - inverted date range or empty
    ///   text fields.
    pub fn update(
        &self,
        patient_id: RecordId,
        id: RecordId,
        update: PlanUpdate,
        completed: &dyn CompletedAssignments,
    ) -> ClinicResult<ActionPlan> {
        let mut plan = self.fetch_scoped(patient_id, id)?;

        if plan.status == PlanStatus::Completed && update.status == Some(PlanStatus::InProgress) {
            return Err(ClinicError::IllegalTransition {
                from: "completed",
                to: "in_progress",
            });
        }

        if let Some(start_date) = update.start_date {
            plan.start_date = start_date;
        }
        if let Some(end_date) = update.end_date {
            plan.end_date = end_date;
        }
        ensure_date_order(plan.start_date, plan.end_date)?;

        if let Some(diagnosis) = update.diagnosis {
            plan.diagnosis = NonEmptyText::new(&diagnosis).map_err(|_| {
                ClinicError::ValidationFailed("diagnosis must be a non-empty string".into())
            })?;
        }
        if let Some(plan_description) = update.plan_description {
            plan.plan_description = NonEmptyText::new(&plan_description).map_err(|_| {
                ClinicError::ValidationFailed("plan description must be a non-empty string".into())
            })?;
        }

        if let Some(status) = update.status {
            let entering_completed =
                status == PlanStatus::Completed && plan.status != PlanStatus::Completed;
            if entering_completed {
                plan.trainings =
                    completed.completed_in_range(plan.patient_id, plan.start_date, plan.end_date)?;
                tracing::debug!(
                    "linked {} completed assignment(s) to plan {}",
                    plan.trainings.len(),
                    plan.id
                );
            }
            plan.status = status;
        }

        plan.updated_at = Utc::now();

        let doc_dir = storage::document_dir(&self.cfg.plans_dir(), id);
        storage::write_document(&doc_dir, PLAN_FILE_NAME, &plan)?;
        Ok(plan)
    }

    /// Fetches a patient's plan by id.
    pub fn get(&self, patient_id: RecordId, id: RecordId) -> ClinicResult<ActionPlan> {
        self.fetch_scoped(patient_id, id)
    }

    /// Lists a patient's plans matching the filter, most recent start first.
    pub fn list(&self, patient_id: RecordId, filter: &PlanFilter) -> Vec<ActionPlan> {
        let mut plans: Vec<ActionPlan> =
            storage::scan_documents(&self.cfg.plans_dir(), PLAN_FILE_NAME);
        plans.retain(|plan| {
            plan.patient_id == patient_id
                && filter.status.map_or(true, |status| plan.status == status)
                && filter
                    .starts_from
                    .map_or(true, |from| plan.start_date >= from)
                && filter.ends_until.map_or(true, |until| plan.end_date <= until)
        });
        plans.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        plans
    }

    /// Deletes a patient's plan.
    pub fn delete(&self, patient_id: RecordId, id: RecordId) -> ClinicResult<()> {
        self.fetch_scoped(patient_id, id)?;
        storage::delete_document(&self.cfg.plans_dir(), id)?;
        Ok(())
    }

    fn fetch_scoped(&self, patient_id: RecordId, id: RecordId) -> ClinicResult<ActionPlan> {
        let plan: Option<ActionPlan> =
            storage::read_document(&self.cfg.plans_dir(), id, PLAN_FILE_NAME)?;

        match plan {
            Some(plan) if plan.patient_id == patient_id => Ok(plan),
            _ => Err(ClinicError::not_found(ENTITY, id)),
        }
    }
}

fn ensure_date_order(start: DateTime<Utc>, end: DateTime<Utc>) -> ClinicResult<()> {
    if end <= start {
        return Err(ClinicError::ValidationFailed(
            "end date must be after start date".into(),
        ));
    }
    Ok(())
}
