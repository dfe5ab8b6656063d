pub mod log;
pub mod matrix;
pub mod timereport;
