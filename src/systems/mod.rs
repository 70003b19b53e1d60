pub use jobs::{BatchProcessor, BatchResult, JobHandle, JobSystem};

pub mod jobs;
