pub mod activity;
pub mod billing;
pub mod interview;
pub mod resume;
pub mod user;
