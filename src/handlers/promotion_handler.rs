//! Promotion Handler
//!
//! The class-promotion pipeline: five strictly ordered stages, each applied
//! to the whole cohort before the next begins, each chunked into fixed-size
//! batches. The batch size and the pause between batches exist solely to
//! bound concurrent-connection pressure on the store; they are not needed
//! for correctness.
//!
//! There is no isolation across stages and no transactional wrapper: a
//! failure mid-pipeline triggers a best-effort batched rollback of stage 1
//! (class reassignment) only. History entries, notifications and bill
//! migrations from completed stages are never rolled back, and callers must
//! expect manual reconciliation after a partial failure.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::try_join_all;
use uuid::Uuid;

use crate::domain::{
    validate_promotion, ClassInfo, NewBill, NewClassHistoryEntry, NewNotification,
    NOTIF_BILLS_MOVED, NOTIF_PROMOTION,
};
use crate::error::AppError;
use crate::store::{Store, StoreError};

use super::{PromoteCohortCommand, PromotionResult};

/// Audience tag stamped on every notification this pipeline creates.
const AUDIENCE_SANTRI: &str = "santri";

/// Admission-control levers for the batched mutation stages.
#[derive(Debug, Clone, Copy)]
pub struct BatchPolicy {
    /// Students (or bills) mutated concurrently per batch.
    pub size: usize,
    /// Pause between batches.
    pub pause: Duration,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            size: 5,
            pause: Duration::from_millis(100),
        }
    }
}

/// The pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Reassign,
    RecordHistory,
    NotifyPromotion,
    MigrateBills,
    NotifyBillMigration,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineStage::Reassign => "reassign",
            PipelineStage::RecordHistory => "record-history",
            PipelineStage::NotifyPromotion => "notify-promotion",
            PipelineStage::MigrateBills => "migrate-bills",
            PipelineStage::NotifyBillMigration => "notify-bill-migration",
        };
        f.write_str(name)
    }
}

/// Whether the stage-1 rollback restored the cohort's class assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompensationOutcome {
    Reverted,
    Failed,
}

impl std::fmt::Display for CompensationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompensationOutcome::Reverted => f.write_str("reverted"),
            CompensationOutcome::Failed => f.write_str("failed"),
        }
    }
}

/// A pipeline abort: the failing stage, whether the reassignment rollback
/// succeeded, and the underlying store error.
#[derive(Debug, thiserror::Error)]
#[error("promotion pipeline aborted during {stage} (compensation {compensation}): {source}")]
pub struct PipelineError {
    pub stage: PipelineStage,
    pub compensation: CompensationOutcome,
    #[source]
    pub source: StoreError,
}

struct StageFailure {
    stage: PipelineStage,
    error: StoreError,
}

impl StageFailure {
    fn at(stage: PipelineStage) -> impl FnOnce(StoreError) -> StageFailure {
        move |error| StageFailure { stage, error }
    }
}

/// Handler for the class-promotion workflow.
pub struct PromotionHandler<S> {
    store: Arc<S>,
    batch: BatchPolicy,
}

impl<S: Store> PromotionHandler<S> {
    pub fn new(store: Arc<S>, batch: BatchPolicy) -> Self {
        Self { store, batch }
    }

    /// Execute a promotion: validate, check preconditions, run the five
    /// stages, and compensate stage 1 on failure.
    pub async fn execute(&self, command: PromoteCohortCommand) -> Result<PromotionResult, AppError> {
        let students = self.store.find_students(&command.student_ids).await?;
        validate_promotion(
            Some(command.source_class_id),
            Some(command.destination_class_id),
            &students,
        )?;

        let active_year = self
            .store
            .find_active_academic_year()
            .await?
            .ok_or(AppError::NoActiveAcademicYear)?;
        let source = self
            .store
            .find_class(command.source_class_id)
            .await?
            .ok_or(AppError::ClassNotFound(command.source_class_id))?;
        let destination = self
            .store
            .find_class(command.destination_class_id)
            .await?
            .ok_or(AppError::ClassNotFound(command.destination_class_id))?;

        tracing::info!(
            cohort = command.student_ids.len(),
            source = %source.name,
            destination = %destination.name,
            active_year = %active_year.name,
            "starting class promotion"
        );

        match self
            .run_stages(&command.student_ids, &source, &destination)
            .await
        {
            Ok(bills_migrated) => {
                tracing::info!(
                    promoted = command.student_ids.len(),
                    bills_migrated,
                    "class promotion complete"
                );
                Ok(PromotionResult {
                    students_promoted: command.student_ids.len(),
                    source_class: source.name,
                    destination_class: destination.name,
                    academic_year: destination.academic_year.as_ref().map(|y| y.name.clone()),
                    academic_year_active: destination
                        .academic_year
                        .as_ref()
                        .map(|y| y.active)
                        .unwrap_or(false),
                    bills_migrated,
                })
            }
            Err(failure) => {
                tracing::error!(
                    stage = %failure.stage,
                    error = %failure.error,
                    "pipeline stage failed, rolling back class assignments"
                );
                let compensation = self
                    .compensate(&command.student_ids, command.source_class_id)
                    .await;
                Err(AppError::Pipeline(PipelineError {
                    stage: failure.stage,
                    compensation,
                    source: failure.error,
                }))
            }
        }
    }

    /// Run all five stages; returns the number of bills migrated.
    async fn run_stages(
        &self,
        student_ids: &[Uuid],
        source: &ClassInfo,
        destination: &ClassInfo,
    ) -> Result<usize, StageFailure> {
        // Stage 1: reassign every student to the destination class.
        self.for_each_batched(student_ids, "reassign", |student_id| {
            self.store.update_student_class(student_id, destination.id)
        })
        .await
        .map_err(StageFailure::at(PipelineStage::Reassign))?;

        self.verify_reassignment(student_ids, destination)
            .await
            .map_err(StageFailure::at(PipelineStage::Reassign))?;

        // Stage 2: one immutable history entry per student.
        let recorded_at = Utc::now();
        self.for_each_batched(student_ids, "record-history", |student_id| {
            let entry = NewClassHistoryEntry {
                student_id,
                previous_class_id: source.id,
                new_class_id: destination.id,
                recorded_at,
            };
            async move { self.store.insert_class_history(&entry).await }
        })
        .await
        .map_err(StageFailure::at(PipelineStage::RecordHistory))?;

        // Stage 3: promotion notification for students with a linked account.
        let promotion_message = promotion_message(source, destination);
        self.for_each_batched(student_ids, "notify-promotion", |student_id| {
            let message = promotion_message.clone();
            async move {
                if let Some(user_id) = self.store.find_student_account(student_id).await? {
                    self.store
                        .create_notification(&NewNotification {
                            user_id,
                            title: "Kenaikan Kelas".to_string(),
                            message,
                            kind: NOTIF_PROMOTION.to_string(),
                            audience: AUDIENCE_SANTRI.to_string(),
                        })
                        .await?;
                }
                Ok(())
            }
        })
        .await
        .map_err(StageFailure::at(PipelineStage::NotifyPromotion))?;

        // Stage 4: migrate outstanding bills to the destination academic year.
        let bills = self
            .store
            .list_unpaid_bills(student_ids)
            .await
            .map_err(StageFailure::at(PipelineStage::MigrateBills))?;

        if bills.is_empty() {
            tracing::info!("no outstanding bills to migrate");
            return Ok(0);
        }

        let year_name = destination
            .academic_year
            .as_ref()
            .map(|y| y.name.as_str())
            .unwrap_or("tahun ajaran baru");
        tracing::info!(
            count = bills.len(),
            academic_year = year_name,
            "migrating outstanding bills"
        );

        self.for_each_batched(&bills, "migrate-bills", |bill| {
            let replacement = NewBill {
                student_id: bill.student_id,
                bill_type_id: bill.bill_type_id,
                amount: bill.amount,
                due_date: bill.due_date,
                status: bill.status.clone(),
                description: Some(annotate_description(bill.description.as_deref(), year_name)),
                academic_year_id: destination.academic_year.as_ref().map(|y| y.id),
                created_at: bill.created_at,
            };
            async move { self.store.create_bill(&replacement).await }
        })
        .await
        .map_err(StageFailure::at(PipelineStage::MigrateBills))?;

        let original_ids: Vec<Uuid> = bills.iter().map(|bill| bill.id).collect();
        let deleted = self
            .store
            .delete_bills(&original_ids)
            .await
            .map_err(StageFailure::at(PipelineStage::MigrateBills))?;
        tracing::info!(created = bills.len(), deleted, "bill migration complete");

        // Stage 5: bill-migration notification, only for students that had
        // at least one bill moved.
        let affected: Vec<Uuid> = student_ids
            .iter()
            .copied()
            .filter(|id| bills.iter().any(|bill| bill.student_id == *id))
            .collect();
        let bill_message = bill_migration_message(destination);
        self.for_each_batched(&affected, "notify-bill-migration", |student_id| {
            let message = bill_message.clone();
            async move {
                if let Some(user_id) = self.store.find_student_account(student_id).await? {
                    self.store
                        .create_notification(&NewNotification {
                            user_id,
                            title: "Tagihan Dipindah".to_string(),
                            message,
                            kind: NOTIF_BILLS_MOVED.to_string(),
                            audience: AUDIENCE_SANTRI.to_string(),
                        })
                        .await?;
                }
                Ok(())
            }
        })
        .await
        .map_err(StageFailure::at(PipelineStage::NotifyBillMigration))?;

        Ok(bills.len())
    }

    /// Apply one operation to every item, `batch.size` at a time. Operations
    /// within a batch run concurrently and are all awaited before the next
    /// batch starts; batches are separated by the configured pause.
    async fn for_each_batched<T, F, Fut>(
        &self,
        items: &[T],
        label: &str,
        op: F,
    ) -> Result<(), StoreError>
    where
        T: Clone,
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<(), StoreError>>,
    {
        let size = self.batch.size.max(1);
        let total_batches = items.len().div_ceil(size);

        for (index, batch) in items.chunks(size).enumerate() {
            try_join_all(batch.iter().cloned().map(&op)).await?;
            tracing::debug!(
                stage = label,
                batch = index + 1,
                total_batches,
                size = batch.len(),
                "batch complete"
            );
            if index + 1 < total_batches {
                tokio::time::sleep(self.batch.pause).await;
            }
        }

        Ok(())
    }

    /// Re-read the cohort after reassignment and report stragglers.
    /// Diagnostic only; a mismatch does not abort the pipeline.
    async fn verify_reassignment(
        &self,
        student_ids: &[Uuid],
        destination: &ClassInfo,
    ) -> Result<(), StoreError> {
        let assignments = self.store.student_class_assignments(student_ids).await?;
        let moved = assignments
            .iter()
            .filter(|a| a.class_id == destination.id)
            .count();
        tracing::info!(moved, cohort = student_ids.len(), "reassignment verified");

        for stray in assignments.iter().filter(|a| a.class_id != destination.id) {
            tracing::warn!(
                student = %stray.name,
                student_id = %stray.id,
                class_id = %stray.class_id,
                "student not reassigned to destination class"
            );
        }
        Ok(())
    }

    /// Best-effort rollback of stage 1: put every selected student back in
    /// the source class, batched the same way. A failure here is logged and
    /// swallowed; the caller is warned that state may be inconsistent.
    async fn compensate(&self, student_ids: &[Uuid], source_class_id: Uuid) -> CompensationOutcome {
        tracing::warn!(cohort = student_ids.len(), "rolling back class assignments");
        match self
            .for_each_batched(student_ids, "rollback", |student_id| {
                self.store.update_student_class(student_id, source_class_id)
            })
            .await
        {
            Ok(()) => {
                tracing::info!("rollback complete, class assignments restored");
                CompensationOutcome::Reverted
            }
            Err(error) => {
                tracing::error!(
                    %error,
                    "rollback failed, state may be inconsistent and needs manual reconciliation"
                );
                CompensationOutcome::Failed
            }
        }
    }
}

fn promotion_message(source: &ClassInfo, destination: &ClassInfo) -> String {
    let mut message = format!(
        "Selamat! Anda telah naik kelas dari {} ke {}.",
        source.name, destination.name
    );
    if let (Some(from), Some(to)) = (source.level, destination.level) {
        message.push_str(&format!(" (Level: {} -> {})", from, to));
    }
    message
}

fn annotate_description(existing: Option<&str>, year_name: &str) -> String {
    match existing {
        Some(text) => format!("{text} (Dipindah dari kelas lama ke {year_name})"),
        None => format!("Dipindah dari kelas lama ke {year_name}"),
    }
}

fn bill_migration_message(destination: &ClassInfo) -> String {
    let (year_name, active) = destination
        .academic_year
        .as_ref()
        .map(|y| (y.name.as_str(), y.active))
        .unwrap_or(("baru", false));
    format!(
        "Tagihan Anda telah dipindah ke kelas baru ({}) tahun ajaran {} ({}) karena kenaikan kelas. \
         Silakan periksa tagihan terbaru Anda.",
        destination.name,
        year_name,
        if active { "aktif" } else { "tidak aktif" }
    )
}
