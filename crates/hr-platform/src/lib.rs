//! HR Platform
//!
//! Backend for an HR organisation with four kinds of principal (HR
//! managers, CEOs, departments and employees) providing:
//! - Email and phone uniqueness across every principal collection
//! - Transactional create, update and delete with audit entries
//! - Argon2id credentials with rotation and token-based reset
//! - Token authentication resolved across all kinds
//! - Supporting HR records: attendance, payroll, property requests, job postings
//!
//! ## Module Organization (Aggregate-based)
//!
//! Each aggregate contains:
//! - `entity` - Domain entities
//! - `repository` - Data access
//! - `api` - REST endpoints
//! - `operations` - Use case operations (where applicable)

// Core aggregates
pub mod principal;
pub mod records;

// Authentication & audit
pub mod auth;
pub mod audit;

// Shared infrastructure
pub mod shared;

// Cross-cutting concerns
pub mod usecase;
pub mod app;

// Re-export common types from shared
pub use shared::error::{PlatformError, Result};
pub use shared::indexes::initialize_indexes;
pub use shared::tsid::TsidGenerator;

// Re-export use case infrastructure
pub use usecase::{ExecutionContext, UnitOfWork, UseCaseError, UseCaseResult};

// Re-export main entity types for convenience
pub use audit::entity::{AuditAction, AuditLog};
pub use principal::entity::{LoginIdentifier, Principal, PrincipalKind, PrincipalProfile, PrincipalStatus};
pub use records::entity::{Attendance, EmployeeProperty, JobPosting, Payroll};

// Re-export storage
pub use principal::{DirectoryBackend, InMemoryDirectory, PrincipalRepository};

pub use app::{Platform, PlatformSettings};
