pub mod catalog;
pub mod chart;
pub mod consolidate;
pub mod engine;
pub mod error;
pub mod process;
pub mod profile;
