pub mod grade;
pub mod jobs;
pub mod migrate;
pub mod quiz;
pub mod registry;
pub mod submission;
pub mod token;
