pub mod broadcaster;
pub mod overtime;
pub mod scheduler;

pub use broadcaster::ScoreBroadcaster;
pub use overtime::{overtime_decision, regulation_decision, OvertimeDecision, OvertimeEngine};
pub use scheduler::{halftime_due, match_scope, scope_date_range, MatchScheduler, SchedulerStats};
