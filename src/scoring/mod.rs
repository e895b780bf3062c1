//! The scoring core: pure point math, no I/O.

pub mod brand;
pub mod breakdown;
pub mod scarcity;
pub mod scope;
pub mod team;
pub mod trend;

pub use breakdown::{format, render_text, FormattedBreakdown, FormattedLine, LineSection};
pub use scarcity::{round2, scarcity_multiplier};
pub use scope::{iso_week_dates, iso_week_of, weekly_scope_of};
pub use team::{aggregate, SlotData, TEAM_BONUS_CAP};
pub use trend::{effective_trend_multiplier, streak_score, trend_multiplier};
