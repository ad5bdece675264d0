pub mod extractors;
pub mod password;
pub mod session;

pub use extractors::{
    require_role, AdminUser, AuthRejection, CurrentUser, DepartmentHeadUser, SessionUser,
    StaffUser, StudentUser, SupervisorUser,
};
pub use password::{check_new_password, generate_token, hash_password, hash_token, verify_password};
pub use session::{push_flash, start_session, take_flash};
