//! Core record types
//!
//! Plain data types shared between the store layer and the handlers.
//! Wire names follow the camelCase convention of the admin frontend.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bill status value with special meaning: everything else counts as outstanding.
pub const BILL_STATUS_PAID: &str = "paid";

/// Notification type tag for a class promotion.
pub const NOTIF_PROMOTION: &str = "naik_kelas";

/// Notification type tag for bills moved by a promotion.
pub const NOTIF_BILLS_MOVED: &str = "tagihan_dipindah";

/// An academic year (tahun ajaran). At most one is active at a time;
/// the store enforces that invariant at the write boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicYear {
    pub id: Uuid,
    pub name: String,
    pub active: bool,
}

/// A class (kelas) with its optional ordinal level and owning academic year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassInfo {
    pub id: Uuid,
    pub name: String,
    /// Ordinal level used for promotion-direction checks. A class without a
    /// level places no constraint on promotion targets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub academic_year: Option<AcademicYear>,
}

/// One past class assignment of a student, as shown in the promotion UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassHistoryView {
    pub new_class_id: Uuid,
    pub new_class: ClassInfo,
}

/// A student (santri) with their current class and full class history,
/// newest entry first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub id: Uuid,
    pub name: String,
    /// External roll number (NIS).
    pub nis: String,
    /// Linked user account, if the student has one. Students without an
    /// account are a valid variant and simply receive no notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<Uuid>,
    pub class: ClassInfo,
    pub history: Vec<ClassHistoryView>,
}

/// Optional filter for the eligibility query.
#[derive(Debug, Clone, Default)]
pub struct StudentFilter {
    pub class_id: Option<Uuid>,
}

/// Immutable class-history entry to append. One per student per promotion
/// event; never merged with prior history.
#[derive(Debug, Clone)]
pub struct NewClassHistoryEntry {
    pub student_id: Uuid,
    pub previous_class_id: Uuid,
    pub new_class_id: Uuid,
    pub recorded_at: DateTime<Utc>,
}

/// A bill (tagihan) row as read from the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: Uuid,
    pub student_id: Uuid,
    pub bill_type_id: Uuid,
    pub amount: Decimal,
    pub due_date: DateTime<Utc>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub academic_year_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Bill {
    pub fn is_paid(&self) -> bool {
        self.status == BILL_STATUS_PAID
    }
}

/// A bill row to create. Migration preserves the original creation time.
#[derive(Debug, Clone)]
pub struct NewBill {
    pub student_id: Uuid,
    pub bill_type_id: Uuid,
    pub amount: Decimal,
    pub due_date: DateTime<Utc>,
    pub status: String,
    pub description: Option<String>,
    pub academic_year_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A notification to create, fire-and-forget from the pipeline's perspective.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: String,
    pub audience: String,
}

/// Minimal view of a student's current assignment, used for the
/// post-reassignment verification pass.
#[derive(Debug, Clone)]
pub struct StudentClassAssignment {
    pub id: Uuid,
    pub name: String,
    pub class_id: Uuid,
}

/// The caller resolved from a bearer token or session cookie.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}
