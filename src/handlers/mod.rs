//! Handlers module
//!
//! One handler per operation: a read-only candidate query and the
//! class-promotion pipeline. Handlers own their store handle and expose a
//! single `execute` method; the API layer stays a thin translation.

mod commands;
mod eligibility_handler;
mod promotion_handler;

pub use commands::{EligibleStudent, PromoteCohortCommand, PromotionResult};
pub use eligibility_handler::EligibilityHandler;
pub use promotion_handler::{
    BatchPolicy, CompensationOutcome, PipelineError, PipelineStage, PromotionHandler,
};
