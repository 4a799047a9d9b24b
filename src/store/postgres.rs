//! Postgres store
//!
//! [`Store`] implementation over sqlx. Queries are plain SQL against the
//! pesantren schema (santri, kelas, tahun_ajaran, riwayat_kelas, tagihan,
//! notifikasi, users, sessions).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{
    AcademicYear, AuthUser, Bill, ClassHistoryView, ClassInfo, NewBill, NewClassHistoryEntry,
    NewNotification, StudentClassAssignment, StudentFilter, StudentRecord,
};

use super::{Store, StoreError};

/// Store backed by a Postgres connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Load students plus their newest-first class history. `filter_by_ids`
    /// switches between the class filter and an explicit id set.
    async fn load_students(
        &self,
        class_id: Option<Uuid>,
        ids: Option<&[Uuid]>,
    ) -> Result<Vec<StudentRecord>, StoreError> {
        type StudentRow = (
            Uuid,
            String,
            String,
            Option<Uuid>,
            Uuid,
            String,
            Option<i32>,
            Option<Uuid>,
            Option<String>,
            Option<bool>,
        );

        let base = r#"
            SELECT s.id, s.name, s.nis, s.user_id,
                   k.id, k.name, k.level,
                   t.id, t.name, t.aktif
            FROM santri s
            JOIN kelas k ON k.id = s.kelas_id
            LEFT JOIN tahun_ajaran t ON t.id = k.tahun_ajaran_id
        "#;

        let rows: Vec<StudentRow> = if let Some(ids) = ids {
            sqlx::query_as(&format!("{base} WHERE s.id = ANY($1) ORDER BY s.name ASC"))
                .bind(ids.to_vec())
                .fetch_all(&self.pool)
                .await?
        } else if let Some(class_id) = class_id {
            sqlx::query_as(&format!("{base} WHERE s.kelas_id = $1 ORDER BY s.name ASC"))
                .bind(class_id)
                .fetch_all(&self.pool)
                .await?
        } else {
            sqlx::query_as(&format!("{base} ORDER BY s.name ASC"))
                .fetch_all(&self.pool)
                .await?
        };

        let student_ids: Vec<Uuid> = rows.iter().map(|row| row.0).collect();
        let mut history = self.load_history(&student_ids).await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, name, nis, user_id, class_id, class_name, level, year_id, year_name, aktif)| {
                    StudentRecord {
                        id,
                        name,
                        nis,
                        account_id: user_id,
                        class: ClassInfo {
                            id: class_id,
                            name: class_name,
                            level,
                            academic_year: assemble_year(year_id, year_name, aktif),
                        },
                        history: history.remove(&id).unwrap_or_default(),
                    }
                },
            )
            .collect())
    }

    /// History rows for a set of students, newest first, grouped by student.
    async fn load_history(
        &self,
        student_ids: &[Uuid],
    ) -> Result<std::collections::HashMap<Uuid, Vec<ClassHistoryView>>, StoreError> {
        type HistoryRow = (
            Uuid,
            Uuid,
            String,
            Option<i32>,
            Option<Uuid>,
            Option<String>,
            Option<bool>,
        );

        let mut grouped: std::collections::HashMap<Uuid, Vec<ClassHistoryView>> =
            std::collections::HashMap::new();
        if student_ids.is_empty() {
            return Ok(grouped);
        }

        let rows: Vec<HistoryRow> = sqlx::query_as(
            r#"
            SELECT r.santri_id, r.kelas_baru_id, k.name, k.level, t.id, t.name, t.aktif
            FROM riwayat_kelas r
            JOIN kelas k ON k.id = r.kelas_baru_id
            LEFT JOIN tahun_ajaran t ON t.id = k.tahun_ajaran_id
            WHERE r.santri_id = ANY($1)
            ORDER BY r.tanggal DESC
            "#,
        )
        .bind(student_ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        for (student_id, new_class_id, name, level, year_id, year_name, aktif) in rows {
            grouped.entry(student_id).or_default().push(ClassHistoryView {
                new_class_id,
                new_class: ClassInfo {
                    id: new_class_id,
                    name,
                    level,
                    academic_year: assemble_year(year_id, year_name, aktif),
                },
            });
        }

        Ok(grouped)
    }
}

fn assemble_year(
    id: Option<Uuid>,
    name: Option<String>,
    active: Option<bool>,
) -> Option<AcademicYear> {
    id.map(|id| AcademicYear {
        id,
        name: name.unwrap_or_default(),
        active: active.unwrap_or(false),
    })
}

#[async_trait]
impl Store for PgStore {
    async fn find_session_user(&self, token: &str) -> Result<Option<AuthUser>, StoreError> {
        let row: Option<(Uuid, String)> = sqlx::query_as(
            r#"
            SELECT u.id, u.role
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token_hash = encode(sha256($1::bytea), 'hex')
              AND s.expires_at > NOW()
            "#,
        )
        .bind(token.as_bytes())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(user_id, role)| AuthUser { user_id, role }))
    }

    async fn find_active_academic_year(&self) -> Result<Option<AcademicYear>, StoreError> {
        let row: Option<(Uuid, String, bool)> = sqlx::query_as(
            "SELECT id, name, aktif FROM tahun_ajaran WHERE aktif = true LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, name, active)| AcademicYear { id, name, active }))
    }

    async fn find_class(&self, id: Uuid) -> Result<Option<ClassInfo>, StoreError> {
        let row: Option<(Uuid, String, Option<i32>, Option<Uuid>, Option<String>, Option<bool>)> =
            sqlx::query_as(
                r#"
                SELECT k.id, k.name, k.level, t.id, t.name, t.aktif
                FROM kelas k
                LEFT JOIN tahun_ajaran t ON t.id = k.tahun_ajaran_id
                WHERE k.id = $1
                "#,
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(id, name, level, year_id, year_name, aktif)| ClassInfo {
            id,
            name,
            level,
            academic_year: assemble_year(year_id, year_name, aktif),
        }))
    }

    async fn list_classes(&self) -> Result<Vec<ClassInfo>, StoreError> {
        let rows: Vec<(Uuid, String, Option<i32>, Option<Uuid>, Option<String>, Option<bool>)> =
            sqlx::query_as(
                r#"
                SELECT k.id, k.name, k.level, t.id, t.name, t.aktif
                FROM kelas k
                LEFT JOIN tahun_ajaran t ON t.id = k.tahun_ajaran_id
                ORDER BY k.name ASC
                "#,
            )
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, level, year_id, year_name, aktif)| ClassInfo {
                id,
                name,
                level,
                academic_year: assemble_year(year_id, year_name, aktif),
            })
            .collect())
    }

    async fn list_students(
        &self,
        filter: &StudentFilter,
    ) -> Result<Vec<StudentRecord>, StoreError> {
        self.load_students(filter.class_id, None).await
    }

    async fn find_students(&self, ids: &[Uuid]) -> Result<Vec<StudentRecord>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.load_students(None, Some(ids)).await
    }

    async fn student_class_assignments(
        &self,
        ids: &[Uuid],
    ) -> Result<Vec<StudentClassAssignment>, StoreError> {
        let rows: Vec<(Uuid, String, Uuid)> =
            sqlx::query_as("SELECT id, name, kelas_id FROM santri WHERE id = ANY($1)")
                .bind(ids.to_vec())
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, class_id)| StudentClassAssignment { id, name, class_id })
            .collect())
    }

    async fn update_student_class(
        &self,
        student_id: Uuid,
        class_id: Uuid,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE santri SET kelas_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(student_id)
            .bind(class_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_class_history(&self, entry: &NewClassHistoryEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO riwayat_kelas (id, santri_id, kelas_lama_id, kelas_baru_id, tanggal)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.student_id)
        .bind(entry.previous_class_id)
        .bind(entry.new_class_id)
        .bind(entry.recorded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_student_account(&self, student_id: Uuid) -> Result<Option<Uuid>, StoreError> {
        let user_id: Option<Option<Uuid>> =
            sqlx::query_scalar("SELECT user_id FROM santri WHERE id = $1")
                .bind(student_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(user_id.flatten())
    }

    async fn list_unpaid_bills(&self, student_ids: &[Uuid]) -> Result<Vec<Bill>, StoreError> {
        type BillRow = (
            Uuid,
            Uuid,
            Uuid,
            Decimal,
            DateTime<Utc>,
            String,
            Option<String>,
            Option<Uuid>,
            DateTime<Utc>,
        );

        let rows: Vec<BillRow> = sqlx::query_as(
            r#"
            SELECT id, santri_id, jenis_tagihan_id, amount, due_date, status,
                   description, tahun_ajaran_id, created_at
            FROM tagihan
            WHERE santri_id = ANY($1) AND status <> 'paid'
            ORDER BY due_date ASC, id ASC
            "#,
        )
        .bind(student_ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(
                    id,
                    student_id,
                    bill_type_id,
                    amount,
                    due_date,
                    status,
                    description,
                    academic_year_id,
                    created_at,
                )| Bill {
                    id,
                    student_id,
                    bill_type_id,
                    amount,
                    due_date,
                    status,
                    description,
                    academic_year_id,
                    created_at,
                },
            )
            .collect())
    }

    async fn sum_unpaid_bills(&self, student_id: Uuid) -> Result<Decimal, StoreError> {
        let total: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM tagihan WHERE santri_id = $1 AND status <> 'paid'",
        )
        .bind(student_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    async fn create_bill(&self, bill: &NewBill) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO tagihan
                (id, santri_id, jenis_tagihan_id, amount, due_date, status,
                 description, tahun_ajaran_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(bill.student_id)
        .bind(bill.bill_type_id)
        .bind(bill.amount)
        .bind(bill.due_date)
        .bind(&bill.status)
        .bind(&bill.description)
        .bind(bill.academic_year_id)
        .bind(bill.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_bills(&self, ids: &[Uuid]) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM tagihan WHERE id = ANY($1)")
            .bind(ids.to_vec())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn create_notification(
        &self,
        notification: &NewNotification,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO notifikasi (id, user_id, title, message, type, role, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, false, NOW())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(notification.user_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.kind)
        .bind(&notification.audience)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
