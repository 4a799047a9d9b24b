//! Store module
//!
//! The relational store behind a trait so the promotion pipeline and the API
//! layer stay independent of the backing database. Production uses
//! [`postgres::PgStore`]; tests use an in-memory implementation with
//! operation logging and failure injection.

pub mod postgres;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{
    AcademicYear, AuthUser, Bill, ClassInfo, NewBill, NewClassHistoryEntry, NewNotification,
    StudentClassAssignment, StudentFilter, StudentRecord,
};

/// Errors from store operations.
///
/// Timeouts are classified separately so callers can surface them as a
/// retryable condition with smaller-cohort guidance.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store operation timed out")]
    Timeout,

    #[error("store error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, StoreError::Timeout)
    }
}

/// Postgres error code for a cancelled statement (statement_timeout).
const PG_QUERY_CANCELED: &str = "57014";

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::PoolTimedOut => StoreError::Timeout,
            sqlx::Error::Database(db) if db.code().as_deref() == Some(PG_QUERY_CANCELED) => {
                StoreError::Timeout
            }
            _ => StoreError::Backend(error.to_string()),
        }
    }
}

/// The relational store as seen by this service: point lookups, filtered
/// list queries, single-row writes and one bulk delete. The promotion
/// pipeline deliberately does not use a transactional wrapper; batch size
/// and pause are its only admission-control levers.
#[async_trait]
pub trait Store: Send + Sync {
    /// Resolve a session token to its user, if the session is valid.
    async fn find_session_user(&self, token: &str) -> Result<Option<AuthUser>, StoreError>;

    /// The currently active academic year, if any.
    async fn find_active_academic_year(&self) -> Result<Option<AcademicYear>, StoreError>;

    async fn find_class(&self, id: Uuid) -> Result<Option<ClassInfo>, StoreError>;

    /// All classes, ordered by name.
    async fn list_classes(&self) -> Result<Vec<ClassInfo>, StoreError>;

    /// Students matching the filter, ordered by name, each with class
    /// context and newest-first history.
    async fn list_students(&self, filter: &StudentFilter) -> Result<Vec<StudentRecord>, StoreError>;

    /// The given students, ordered by name, with class context and history.
    async fn find_students(&self, ids: &[Uuid]) -> Result<Vec<StudentRecord>, StoreError>;

    /// Current class assignment per student, used to verify a reassignment.
    async fn student_class_assignments(
        &self,
        ids: &[Uuid],
    ) -> Result<Vec<StudentClassAssignment>, StoreError>;

    async fn update_student_class(&self, student_id: Uuid, class_id: Uuid)
        -> Result<(), StoreError>;

    async fn insert_class_history(&self, entry: &NewClassHistoryEntry) -> Result<(), StoreError>;

    /// The user account linked to a student, if any.
    async fn find_student_account(&self, student_id: Uuid) -> Result<Option<Uuid>, StoreError>;

    /// Bills with status other than paid for the given students.
    async fn list_unpaid_bills(&self, student_ids: &[Uuid]) -> Result<Vec<Bill>, StoreError>;

    /// Sum of all non-paid bill amounts for one student.
    async fn sum_unpaid_bills(&self, student_id: Uuid) -> Result<Decimal, StoreError>;

    async fn create_bill(&self, bill: &NewBill) -> Result<(), StoreError>;

    /// Bulk delete by id set; returns the number of rows removed.
    async fn delete_bills(&self, ids: &[Uuid]) -> Result<u64, StoreError>;

    async fn create_notification(&self, notification: &NewNotification)
        -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_classified_as_timeout() {
        let error: StoreError = sqlx::Error::PoolTimedOut.into();
        assert!(error.is_timeout());
    }

    #[test]
    fn test_other_errors_are_backend() {
        let error: StoreError = sqlx::Error::RowNotFound.into();
        assert!(!error.is_timeout());
    }
}
