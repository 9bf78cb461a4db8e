pub mod admin;
pub mod course;
pub mod expertfolio;
pub mod file;
pub mod messaging;
pub mod profile;
pub mod quiz;
pub mod registry;
pub mod submission;

pub use admin::{AuditLog, DlqMessage, License, UsageCounter};
pub use course::{Announcement, Assignment, Course, Enrollment, Module, ProgressSummary};
pub use expertfolio::{Assessment, Evaluation};
pub use file::{FileObject, StorageQuota};
pub use messaging::{Message, Notification};
pub use profile::Profile;
pub use quiz::{Quiz, QuizAttempt, QuizDetail, QuizQuestion};
pub use registry::{ProviderHealth, RegistryCourse, RegistryProvider, RegistryVersion};
pub use submission::{Grade, GradeView, Submission};
