pub mod catalog;
pub mod student;
