//! Promotion validator
//!
//! Business-rule checks run before any mutation. The UI runs the same checks
//! for early feedback, but the server re-enforces them and is the authority.

use uuid::Uuid;

use super::model::StudentRecord;

/// A violated promotion rule, with a user-facing message per rule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Kelas lama harus dipilih")]
    SourceClassMissing,

    #[error("Kelas baru harus dipilih")]
    DestinationClassMissing,

    #[error("Kelas lama dan kelas baru harus berbeda")]
    SameSourceAndDestination,

    #[error("Pilih minimal satu santri")]
    EmptySelection,

    #[error("Santri berikut tidak bisa mundur ke kelas yang sudah pernah dijalani: {names}")]
    BackwardReentry { names: String },
}

/// Validate a proposed promotion, short-circuiting on the first violated rule.
///
/// The backward re-entry check aggregates every offending student into one
/// message rather than stopping at the first.
pub fn validate_promotion(
    source_class_id: Option<Uuid>,
    destination_class_id: Option<Uuid>,
    selected: &[StudentRecord],
) -> Result<(), ValidationError> {
    let source = source_class_id.ok_or(ValidationError::SourceClassMissing)?;
    let destination = destination_class_id.ok_or(ValidationError::DestinationClassMissing)?;

    if source == destination {
        return Err(ValidationError::SameSourceAndDestination);
    }
    if selected.is_empty() {
        return Err(ValidationError::EmptySelection);
    }

    let offenders: Vec<&str> = selected
        .iter()
        .filter(|student| {
            student
                .history
                .iter()
                .any(|entry| entry.new_class_id == destination)
        })
        .map(|student| student.name.as_str())
        .collect();

    if !offenders.is_empty() {
        return Err(ValidationError::BackwardReentry {
            names: offenders.join(", "),
        });
    }

    Ok(())
}
