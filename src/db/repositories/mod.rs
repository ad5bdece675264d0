mod certificate_repository;
mod confirmation_repository;
mod evaluation_repository;
mod job_repository;
mod notification_repository;
mod profile_repository;
mod report_repository;
mod session_repository;
mod user_repository;
mod weekly_report_repository;

pub use certificate_repository::*;
pub use confirmation_repository::*;
pub use evaluation_repository::*;
pub use job_repository::*;
pub use notification_repository::*;
pub use profile_repository::*;
pub use report_repository::*;
pub use session_repository::*;
pub use user_repository::*;
pub use weekly_report_repository::*;
