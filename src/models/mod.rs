pub mod codes;
pub mod flag;
pub mod labels;
pub mod loaders;
pub mod question;

pub use codes::{FlagReason, FlagStatus, Resolution};
pub use flag::{Flag, FlagStatusRollup, FlagWithSubmitter, FlaggedQuestion, StatusCounts};
pub use labels::LabelCatalog;
pub use loaders::{load_configured_catalog, load_label_catalog};
pub use question::{Answer, AnswerField, FieldTarget, Question, QuestionField};
