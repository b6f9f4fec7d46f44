pub mod directory;
pub mod feed;
pub mod schedule;
