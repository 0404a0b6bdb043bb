pub mod field_patch;
pub mod moderation_flow;

pub use field_patch::{FieldPatcher, FULL_CREDIT, WRONG_PENALTY};
pub use moderation_flow::{ClosedReport, ModerationWorkflow};
