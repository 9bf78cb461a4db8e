// services/mod.rs - Data access for each platform resource
//
// Every function takes the pool explicitly and returns `DatabaseError`;
// authorization decisions live in `access` and the handlers.

pub mod access;
pub mod announcement_service;
pub mod assignment_service;
pub mod audit_service;
pub mod course_service;
pub mod dlq_service;
pub mod expertfolio_service;
pub mod file_service;
pub mod grading_service;
pub mod license_service;
pub mod message_service;
pub mod module_service;
pub mod notification_service;
pub mod parent_service;
pub mod profile_service;
pub mod quiz_service;
pub mod registry_service;
pub mod submission_service;
pub mod usage_service;
