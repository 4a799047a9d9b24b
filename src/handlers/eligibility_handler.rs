//! Eligibility Handler
//!
//! Read-only query behind `GET /promotion-candidates`: students of a class
//! (or all students) with class context, newest-first history and, on
//! request, outstanding-balance aggregates.

use std::sync::Arc;

use crate::domain::StudentFilter;
use crate::error::AppError;
use crate::store::Store;

use super::EligibleStudent;

pub struct EligibilityHandler<S> {
    store: Arc<S>,
}

impl<S: Store> EligibilityHandler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// List promotion candidates. Read-only; store failures surface as-is
    /// and the caller may retry the whole request.
    pub async fn execute(
        &self,
        filter: StudentFilter,
        with_balance: bool,
    ) -> Result<Vec<EligibleStudent>, AppError> {
        let students = self.store.list_students(&filter).await?;

        let mut candidates = Vec::with_capacity(students.len());
        for student in students {
            let (total_tagihan, tagihan_belum_lunas) = if with_balance {
                let total = self.store.sum_unpaid_bills(student.id).await?;
                // Both columns carry the same sum; see EligibleStudent.
                (Some(total), Some(total))
            } else {
                (None, None)
            };

            candidates.push(EligibleStudent {
                student,
                total_tagihan,
                tagihan_belum_lunas,
            });
        }

        Ok(candidates)
    }
}
