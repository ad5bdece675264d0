mod certificate;
mod confirmation;
mod deadline_policy;
mod department_head;
mod evaluation;
mod final_report;
mod job;
mod notification;
mod progress_report;
mod session;
mod student_profile;
mod supervisor_profile;
mod user;
mod weekly_report;

pub use certificate::*;
pub use confirmation::*;
pub use deadline_policy::*;
pub use department_head::*;
pub use evaluation::*;
pub use final_report::*;
pub use job::*;
pub use notification::*;
pub use progress_report::*;
pub use session::*;
pub use student_profile::*;
pub use supervisor_profile::*;
pub use user::*;
pub use weekly_report::*;
