//! Tenant-scoped Postgres repositories. Every read on a tenant-owned
//! table filters by `tenant_id`; admin/system call sites pass `None`
//! where the repository accepts it and get an explicit, auditable
//! bypass rather than a second code path.

pub mod api_key_repository;
pub mod course_repository;
pub mod error;
pub mod job_repository;
pub mod llm_call_repository;
pub mod node_repository;
pub mod snapshot_repository;

pub use api_key_repository::ApiKeyRepository;
pub use course_repository::CourseRepository;
pub use error::{Result, StorageError};
pub use job_repository::JobRepository;
pub use llm_call_repository::LlmCallRepository;
pub use node_repository::{InMemoryParentLookup, NodeRepository};
pub use snapshot_repository::SnapshotRepository;
