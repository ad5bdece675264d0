pub mod accounts;
pub mod admin;
pub mod certificates;
pub mod common;
pub mod i18n;
pub mod jobs;
pub mod kaprodi;
pub mod notifications;
pub mod student;
pub mod supervisor;
