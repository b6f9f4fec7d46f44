pub mod exam_schedule;
pub mod member;
pub mod postgres_repository;
pub mod session;
