//! Form field definitions and validation.
//!
//! Templates are ordered lists of [`FieldDef`]s. Incoming definitions arrive
//! as [`FieldInput`]s (order optional) and pass through [`validate_fields`]
//! before anything is persisted, so a stored template always satisfies the
//! field invariants: at least one field, non-empty unique labels, and a
//! non-empty options list for choice types.

use crate::error::{ClinicError, ClinicResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The input control a form field renders as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Textarea,
    Checkbox,
    Radio,
    Select,
    Date,
    Time,
}

impl FieldType {
    /// Choice types carry a fixed list of options the patient picks from.
    pub fn requires_options(&self) -> bool {
        matches!(self, FieldType::Checkbox | FieldType::Radio | FieldType::Select)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Checkbox => "checkbox",
            FieldType::Radio => "radio",
            FieldType::Select => "select",
            FieldType::Date => "date",
            FieldType::Time => "time",
        }
    }
}

/// A single field definition within a template (or template snapshot).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    /// Unique within the owning template; answers reference fields by label.
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// Display rank.
    pub order: i64,
}

/// An incoming field definition, before validation.
///
/// `order` may be omitted; it is auto-assigned from the field's position
/// (`index + 1`) during validation.
#[derive(Debug, Clone)]
pub struct FieldInput {
    pub label: String,
    pub field_type: FieldType,
    pub placeholder: Option<String>,
    pub options: Vec<String>,
    pub order: Option<i64>,
}

/// Validates incoming field definitions and produces the stored form.
///
/// # Errors
///
/// Returns [`ClinicError::ValidationFailed`] when:
/// - the list is empty (a template must have at least one field),
/// - a label is empty after trimming,
/// - two fields share a label (answers map to fields by label, so duplicates
///   would make that mapping ambiguous),
/// - a choice-type field has no options.
pub(crate) fn validate_fields(inputs: Vec<FieldInput>) -> ClinicResult<Vec<FieldDef>> {
    if inputs.is_empty() {
        return Err(ClinicError::ValidationFailed(
            "template must have at least one field".into(),
        ));
    }

    let mut seen_labels = HashSet::new();
    let mut fields = Vec::with_capacity(inputs.len());

    for (index, input) in inputs.into_iter().enumerate() {
        let label = input.label.trim().to_owned();
        if label.is_empty() {
            return Err(ClinicError::ValidationFailed(format!(
                "field {}: label is required",
                index + 1
            )));
        }

        if !seen_labels.insert(label.clone()) {
            return Err(ClinicError::ValidationFailed(format!(
                "duplicate field label: \"{label}\""
            )));
        }

        if input.field_type.requires_options() && input.options.is_empty() {
            return Err(ClinicError::ValidationFailed(format!(
                "field {}: type {} requires a non-empty options list",
                index + 1,
                input.field_type.as_str()
            )));
        }

        fields.push(FieldDef {
            label,
            field_type: input.field_type,
            placeholder: input.placeholder,
            options: input.options,
            order: input.order.unwrap_or(index as i64 + 1),
        });
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_field(label: &str) -> FieldInput {
        FieldInput {
            label: label.into(),
            field_type: FieldType::Text,
            placeholder: None,
            options: Vec::new(),
            order: None,
        }
    }

    #[test]
    fn test_validate_assigns_order_from_position() {
        let fields = validate_fields(vec![text_field("pain_level"), text_field("notes")])
            .expect("should validate");

        assert_eq!(fields[0].order, 1);
        assert_eq!(fields[1].order, 2);
    }

    #[test]
    fn test_validate_keeps_explicit_order() {
        let mut input = text_field("pain_level");
        input.order = Some(7);

        let fields = validate_fields(vec![input]).expect("should validate");
        assert_eq!(fields[0].order, 7);
    }

    #[test]
    fn test_validate_rejects_empty_field_list() {
        let err = validate_fields(Vec::new()).expect_err("empty list should be rejected");
        assert!(matches!(err, ClinicError::ValidationFailed(_)));
    }

    #[test]
    fn test_validate_rejects_blank_label() {
        let err = validate_fields(vec![text_field("   ")]).expect_err("blank label should fail");
        assert!(matches!(err, ClinicError::ValidationFailed(_)));
    }

    #[test]
    fn test_validate_rejects_duplicate_labels() {
        let err = validate_fields(vec![text_field("notes"), text_field("notes")])
            .expect_err("duplicate labels should fail");
        assert!(matches!(err, ClinicError::ValidationFailed(_)));
    }

    #[test]
    fn test_validate_requires_options_for_choice_types() {
        let input = FieldInput {
            label: "side".into(),
            field_type: FieldType::Radio,
            placeholder: None,
            options: Vec::new(),
            order: None,
        };

        let err = validate_fields(vec![input]).expect_err("radio without options should fail");
        assert!(matches!(err, ClinicError::ValidationFailed(_)));
    }

    #[test]
    fn test_validate_accepts_choice_type_with_options() {
        let input = FieldInput {
            label: "side".into(),
            field_type: FieldType::Select,
            placeholder: None,
            options: vec!["left".into(), "right".into()],
            order: None,
        };

        let fields = validate_fields(vec![input]).expect("should validate");
        assert_eq!(fields[0].options, vec!["left", "right"]);
    }
}
