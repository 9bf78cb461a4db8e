pub mod audit;
pub mod dlq;
pub mod jobs;
pub mod licenses;
pub mod usage;
