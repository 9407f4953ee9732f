pub mod runner;
pub mod sync;
