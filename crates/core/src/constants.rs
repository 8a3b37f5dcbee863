//! Collection directory names and document filenames.

/// Subdirectory of the clinic data dir holding form templates.
pub(crate) const TEMPLATES_DIR_NAME: &str = "templates";
/// Subdirectory holding filled anamnesis/evaluation records.
pub(crate) const RECORDS_DIR_NAME: &str = "records";
/// Subdirectory holding exercise categories.
pub(crate) const CATEGORIES_DIR_NAME: &str = "categories";
/// Subdirectory holding exercises.
pub(crate) const EXERCISES_DIR_NAME: &str = "exercises";
/// Subdirectory holding trainings.
pub(crate) const TRAININGS_DIR_NAME: &str = "trainings";
/// Subdirectory holding patient training assignments.
pub(crate) const ASSIGNMENTS_DIR_NAME: &str = "assignments";
/// Subdirectory holding patient action plans.
pub(crate) const PLANS_DIR_NAME: &str = "plans";

/// Document filename within each record's sharded directory.
pub(crate) const TEMPLATE_FILE_NAME: &str = "template.yaml";
pub(crate) const RECORD_FILE_NAME: &str = "record.yaml";
pub(crate) const CATEGORY_FILE_NAME: &str = "category.yaml";
pub(crate) const EXERCISE_FILE_NAME: &str = "exercise.yaml";
pub(crate) const TRAINING_FILE_NAME: &str = "training.yaml";
pub(crate) const ASSIGNMENT_FILE_NAME: &str = "assignment.yaml";
pub(crate) const PLAN_FILE_NAME: &str = "plan.yaml";
