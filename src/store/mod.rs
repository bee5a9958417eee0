pub mod job_store;
pub mod registry;
pub mod result_store;

pub use job_store::JobStore;
pub use registry::JobRegistry;
pub use result_store::ResultStore;
