// handlers/protected/mod.rs - Handlers behind JWT authentication (/api/*)
//
// Each handler follows the same order: role check, rate limit, input
// validation, then the service call.

pub mod announcements;
pub mod assignments;
pub mod auth;
pub mod courses;
pub mod expertfolio;
pub mod files;
pub mod grading;
pub mod messages;
pub mod modules;
pub mod notifications;
pub mod parent;
pub mod quizzes;
pub mod registry;
pub mod submissions;
