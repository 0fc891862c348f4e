pub mod leave_credits;
pub mod leaves;
pub mod shared;
pub mod time_logs;
