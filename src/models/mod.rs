pub mod calendar;
pub mod tool;
