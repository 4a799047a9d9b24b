//! Shared test fixtures: an in-memory store with operation logging and
//! failure injection, standing in for Postgres in integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use pesantren_api::domain::{
    AcademicYear, AuthUser, Bill, ClassHistoryView, ClassInfo, NewBill, NewClassHistoryEntry,
    NewNotification, StudentClassAssignment, StudentFilter, StudentRecord,
};
use pesantren_api::store::{Store, StoreError};

/// One logged mutation, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    UpdateStudentClass { student_id: Uuid, class_id: Uuid },
    InsertHistory { student_id: Uuid },
    CreateBill { student_id: Uuid },
    DeleteBills { count: usize },
    CreateNotification { user_id: Uuid, kind: String },
}

/// Mutation at which injected failures fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    UpdateStudentClass,
    InsertHistory,
    CreateBill,
    DeleteBills,
    CreateNotification,
}

#[derive(Debug, Clone)]
pub struct NotificationRecord {
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: String,
}

#[derive(Debug, Clone)]
struct SeededStudent {
    id: Uuid,
    name: String,
    nis: String,
    class_id: Uuid,
    user_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
struct HistoryRow {
    student_id: Uuid,
    previous_class_id: Uuid,
    new_class_id: Uuid,
    recorded_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<String, AuthUser>,
    academic_years: Vec<AcademicYear>,
    classes: HashMap<Uuid, ClassInfo>,
    students: Vec<SeededStudent>,
    history: Vec<HistoryRow>,
    bills: Vec<Bill>,
    notifications: Vec<NotificationRecord>,
    ops: Vec<Op>,
    fail: Option<(FailPoint, bool)>,
}

/// In-memory [`Store`] for tests. Mutations are logged to an op list, and a
/// fail point can be armed so every call of that kind errors.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_session(&self, token: &str, role: &str) -> Uuid {
        let user_id = Uuid::new_v4();
        self.inner.lock().unwrap().sessions.insert(
            token.to_string(),
            AuthUser {
                user_id,
                role: role.to_string(),
            },
        );
        user_id
    }

    pub fn seed_academic_year(&self, name: &str, active: bool) -> AcademicYear {
        let year = AcademicYear {
            id: Uuid::new_v4(),
            name: name.to_string(),
            active,
        };
        self.inner.lock().unwrap().academic_years.push(year.clone());
        year
    }

    pub fn seed_class(
        &self,
        name: &str,
        level: Option<i32>,
        academic_year: Option<AcademicYear>,
    ) -> ClassInfo {
        let class = ClassInfo {
            id: Uuid::new_v4(),
            name: name.to_string(),
            level,
            academic_year,
        };
        self.inner
            .lock()
            .unwrap()
            .classes
            .insert(class.id, class.clone());
        class
    }

    /// Seed a student; `with_account` controls whether a linked user exists.
    pub fn seed_student(
        &self,
        name: &str,
        nis: &str,
        class_id: Uuid,
        with_account: bool,
    ) -> (Uuid, Option<Uuid>) {
        let id = Uuid::new_v4();
        let user_id = with_account.then(Uuid::new_v4);
        self.inner.lock().unwrap().students.push(SeededStudent {
            id,
            name: name.to_string(),
            nis: nis.to_string(),
            class_id,
            user_id,
        });
        (id, user_id)
    }

    pub fn seed_history(&self, student_id: Uuid, previous_class_id: Uuid, new_class_id: Uuid) {
        self.inner.lock().unwrap().history.push(HistoryRow {
            student_id,
            previous_class_id,
            new_class_id,
            recorded_at: Utc::now(),
        });
    }

    pub fn seed_bill(
        &self,
        student_id: Uuid,
        amount: Decimal,
        status: &str,
        description: Option<&str>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.inner.lock().unwrap().bills.push(Bill {
            id,
            student_id,
            bill_type_id: Uuid::new_v4(),
            amount,
            due_date: Utc::now(),
            status: status.to_string(),
            description: description.map(str::to_string),
            academic_year_id: None,
            created_at: Utc::now(),
        });
        id
    }

    /// Arm a persistent failure: every matching call errors from now on.
    pub fn fail_on(&self, point: FailPoint, timeout: bool) {
        self.inner.lock().unwrap().fail = Some((point, timeout));
    }

    pub fn ops(&self) -> Vec<Op> {
        self.inner.lock().unwrap().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.inner.lock().unwrap().ops.clear();
    }

    pub fn notifications(&self) -> Vec<NotificationRecord> {
        self.inner.lock().unwrap().notifications.clone()
    }

    pub fn bills(&self) -> Vec<Bill> {
        self.inner.lock().unwrap().bills.clone()
    }

    pub fn class_of(&self, student_id: Uuid) -> Option<Uuid> {
        self.inner
            .lock()
            .unwrap()
            .students
            .iter()
            .find(|s| s.id == student_id)
            .map(|s| s.class_id)
    }

    pub fn history_count(&self, student_id: Uuid) -> usize {
        self.inner
            .lock()
            .unwrap()
            .history
            .iter()
            .filter(|h| h.student_id == student_id)
            .count()
    }

    fn check_fail(&self, point: FailPoint) -> Result<(), StoreError> {
        match self.inner.lock().unwrap().fail {
            Some((armed, timeout)) if armed == point => {
                if timeout {
                    Err(StoreError::Timeout)
                } else {
                    Err(StoreError::Backend("injected failure".to_string()))
                }
            }
            _ => Ok(()),
        }
    }

    fn build_record(inner: &Inner, seeded: &SeededStudent) -> StudentRecord {
        let class = inner
            .classes
            .get(&seeded.class_id)
            .cloned()
            .unwrap_or_else(|| ClassInfo {
                id: seeded.class_id,
                name: "unknown".to_string(),
                level: None,
                academic_year: None,
            });

        let mut rows: Vec<&HistoryRow> = inner
            .history
            .iter()
            .filter(|h| h.student_id == seeded.id)
            .collect();
        rows.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));

        let history = rows
            .into_iter()
            .filter_map(|row| {
                inner.classes.get(&row.new_class_id).map(|class| ClassHistoryView {
                    new_class_id: row.new_class_id,
                    new_class: class.clone(),
                })
            })
            .collect();

        StudentRecord {
            id: seeded.id,
            name: seeded.name.clone(),
            nis: seeded.nis.clone(),
            account_id: seeded.user_id,
            class,
            history,
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_session_user(&self, token: &str) -> Result<Option<AuthUser>, StoreError> {
        Ok(self.inner.lock().unwrap().sessions.get(token).cloned())
    }

    async fn find_active_academic_year(&self) -> Result<Option<AcademicYear>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .academic_years
            .iter()
            .find(|y| y.active)
            .cloned())
    }

    async fn find_class(&self, id: Uuid) -> Result<Option<ClassInfo>, StoreError> {
        Ok(self.inner.lock().unwrap().classes.get(&id).cloned())
    }

    async fn list_classes(&self) -> Result<Vec<ClassInfo>, StoreError> {
        let mut classes: Vec<ClassInfo> =
            self.inner.lock().unwrap().classes.values().cloned().collect();
        classes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(classes)
    }

    async fn list_students(
        &self,
        filter: &StudentFilter,
    ) -> Result<Vec<StudentRecord>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut records: Vec<StudentRecord> = inner
            .students
            .iter()
            .filter(|s| filter.class_id.map_or(true, |id| s.class_id == id))
            .map(|s| Self::build_record(&inner, s))
            .collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }

    async fn find_students(&self, ids: &[Uuid]) -> Result<Vec<StudentRecord>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut records: Vec<StudentRecord> = inner
            .students
            .iter()
            .filter(|s| ids.contains(&s.id))
            .map(|s| Self::build_record(&inner, s))
            .collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }

    async fn student_class_assignments(
        &self,
        ids: &[Uuid],
    ) -> Result<Vec<StudentClassAssignment>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .students
            .iter()
            .filter(|s| ids.contains(&s.id))
            .map(|s| StudentClassAssignment {
                id: s.id,
                name: s.name.clone(),
                class_id: s.class_id,
            })
            .collect())
    }

    async fn update_student_class(
        &self,
        student_id: Uuid,
        class_id: Uuid,
    ) -> Result<(), StoreError> {
        self.check_fail(FailPoint::UpdateStudentClass)?;
        let mut inner = self.inner.lock().unwrap();
        if let Some(student) = inner.students.iter_mut().find(|s| s.id == student_id) {
            student.class_id = class_id;
        }
        inner.ops.push(Op::UpdateStudentClass {
            student_id,
            class_id,
        });
        Ok(())
    }

    async fn insert_class_history(&self, entry: &NewClassHistoryEntry) -> Result<(), StoreError> {
        self.check_fail(FailPoint::InsertHistory)?;
        let mut inner = self.inner.lock().unwrap();
        inner.history.push(HistoryRow {
            student_id: entry.student_id,
            previous_class_id: entry.previous_class_id,
            new_class_id: entry.new_class_id,
            recorded_at: entry.recorded_at,
        });
        inner.ops.push(Op::InsertHistory {
            student_id: entry.student_id,
        });
        Ok(())
    }

    async fn find_student_account(&self, student_id: Uuid) -> Result<Option<Uuid>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .students
            .iter()
            .find(|s| s.id == student_id)
            .and_then(|s| s.user_id))
    }

    async fn list_unpaid_bills(&self, student_ids: &[Uuid]) -> Result<Vec<Bill>, StoreError> {
        let mut bills: Vec<Bill> = self
            .inner
            .lock()
            .unwrap()
            .bills
            .iter()
            .filter(|b| !b.is_paid() && student_ids.contains(&b.student_id))
            .cloned()
            .collect();
        bills.sort_by(|a, b| a.due_date.cmp(&b.due_date).then(a.id.cmp(&b.id)));
        Ok(bills)
    }

    async fn sum_unpaid_bills(&self, student_id: Uuid) -> Result<Decimal, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .bills
            .iter()
            .filter(|b| !b.is_paid() && b.student_id == student_id)
            .map(|b| b.amount)
            .sum())
    }

    async fn create_bill(&self, bill: &NewBill) -> Result<(), StoreError> {
        self.check_fail(FailPoint::CreateBill)?;
        let mut inner = self.inner.lock().unwrap();
        inner.bills.push(Bill {
            id: Uuid::new_v4(),
            student_id: bill.student_id,
            bill_type_id: bill.bill_type_id,
            amount: bill.amount,
            due_date: bill.due_date,
            status: bill.status.clone(),
            description: bill.description.clone(),
            academic_year_id: bill.academic_year_id,
            created_at: bill.created_at,
        });
        inner.ops.push(Op::CreateBill {
            student_id: bill.student_id,
        });
        Ok(())
    }

    async fn delete_bills(&self, ids: &[Uuid]) -> Result<u64, StoreError> {
        self.check_fail(FailPoint::DeleteBills)?;
        let mut inner = self.inner.lock().unwrap();
        let before = inner.bills.len();
        inner.bills.retain(|b| !ids.contains(&b.id));
        let removed = before - inner.bills.len();
        inner.ops.push(Op::DeleteBills { count: removed });
        Ok(removed as u64)
    }

    async fn create_notification(
        &self,
        notification: &NewNotification,
    ) -> Result<(), StoreError> {
        self.check_fail(FailPoint::CreateNotification)?;
        let mut inner = self.inner.lock().unwrap();
        inner.notifications.push(NotificationRecord {
            user_id: notification.user_id,
            title: notification.title.clone(),
            message: notification.message.clone(),
            kind: notification.kind.clone(),
        });
        inner.ops.push(Op::CreateNotification {
            user_id: notification.user_id,
            kind: notification.kind.clone(),
        });
        Ok(())
    }
}
