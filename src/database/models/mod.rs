pub mod leave;
pub mod leave_credit;
pub mod macros;
pub mod time_log;

// Re-export all models for easy importing
pub use leave::*;
pub use leave_credit::*;
pub use time_log::*;
