pub mod audit_writer;
pub mod events;
pub mod flag_store;
pub mod notification;
pub mod question_bank;
pub mod status_aggregator;

pub use audit_writer::AuditLogWriter;
pub use events::{EventPublisher, FlagEvent, FlagEventSubscriber};
pub use flag_store::{FlagStore, NewFlag};
pub use notification::{
    ClosedOutcome, DeliveryError, DispatchReport, FlagNotification, LogNotifier, NotificationDispatcher,
    NotificationKind, Notifier, ReviewerAlert,
};
pub use question_bank::{QuestionBank, SqliteQuestionBank, UserRecord};
pub use status_aggregator::StatusAggregator;
