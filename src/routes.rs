pub mod error;
pub mod exam_schedule;
pub mod health;
pub mod member;
pub mod session;
