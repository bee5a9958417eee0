// src/cli/mod.rs
pub mod cli;

mod run;
mod run_export_results;
mod run_new_job;
mod run_server;
mod show_database_stats;
mod show_jobs;
