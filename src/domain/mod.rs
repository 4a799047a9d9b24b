//! Domain module
//!
//! Record types and the pure promotion rules: destination filtering and
//! pre-mutation validation.

mod filter;
mod model;
pub mod nis;
mod validate;

pub use filter::eligible_destinations;
pub use model::{
    AcademicYear, AuthUser, Bill, ClassHistoryView, ClassInfo, NewBill, NewClassHistoryEntry,
    NewNotification, StudentClassAssignment, StudentFilter, StudentRecord, BILL_STATUS_PAID,
    NOTIF_BILLS_MOVED, NOTIF_PROMOTION,
};
pub use validate::{validate_promotion, ValidationError};
