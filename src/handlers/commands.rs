//! Command and result definitions
//!
//! Commands represent intentions to change the system state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::StudentRecord;

/// Command to promote a cohort of students from one class to another.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoteCohortCommand {
    pub student_ids: Vec<Uuid>,
    pub source_class_id: Uuid,
    pub destination_class_id: Uuid,
}

impl PromoteCohortCommand {
    pub fn new(student_ids: Vec<Uuid>, source_class_id: Uuid, destination_class_id: Uuid) -> Self {
        Self {
            student_ids,
            source_class_id,
            destination_class_id,
        }
    }
}

/// Result of a completed promotion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionResult {
    pub students_promoted: usize,
    pub source_class: String,
    pub destination_class: String,
    /// Name of the destination class's academic year, when it has one.
    pub academic_year: Option<String>,
    pub academic_year_active: bool,
    pub bills_migrated: usize,
}

/// A promotion candidate: the student record, optionally enriched with
/// outstanding-balance aggregates.
///
/// `tagihan_belum_lunas` mirrors `total_tagihan`: both are the sum of all
/// non-paid bills. The frontend renders them as separate columns, so both
/// are kept on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibleStudent {
    #[serde(flatten)]
    pub student: StudentRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tagihan: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tagihan_belum_lunas: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promote_command_deserializes_camel_case() {
        let json = r#"{
            "studentIds": ["550e8400-e29b-41d4-a716-446655440000"],
            "sourceClassId": "550e8400-e29b-41d4-a716-446655440001",
            "destinationClassId": "550e8400-e29b-41d4-a716-446655440002"
        }"#;

        let command: PromoteCohortCommand = serde_json::from_str(json).unwrap();
        assert_eq!(command.student_ids.len(), 1);
        assert_ne!(command.source_class_id, command.destination_class_id);
    }

    #[test]
    fn test_promotion_result_serializes_camel_case() {
        let result = PromotionResult {
            students_promoted: 3,
            source_class: "1A".to_string(),
            destination_class: "2A".to_string(),
            academic_year: Some("2025/2026".to_string()),
            academic_year_active: true,
            bills_migrated: 2,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["studentsPromoted"], 3);
        assert_eq!(json["billsMigrated"], 2);
        assert_eq!(json["academicYearActive"], true);
    }
}
