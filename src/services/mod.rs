pub mod auth;
pub mod duration;
pub mod leave;
pub mod leave_credit;
pub mod manual_entry;
pub mod time_log;
pub mod timer;

pub use auth::{Principal, Role};
pub use duration::WorkdayPolicy;
pub use leave::LeaveService;
pub use leave_credit::LeaveCreditService;
pub use time_log::TimeLogService;
