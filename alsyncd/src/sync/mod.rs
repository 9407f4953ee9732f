pub mod conflict;
pub mod deletion;
pub mod engine;
pub mod filter;
pub mod observer;
pub mod paths;
pub mod prune;
pub mod tasks;
