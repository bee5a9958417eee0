pub mod runner;

pub use runner::JobRunner;
