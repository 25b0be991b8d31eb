//! Principal Aggregate
//!
//! The four authenticable kinds (HR manager, CEO, department, employee),
//! their storage backends, the cross-collection uniqueness oracle and the
//! write use cases.

pub mod api;
pub mod bootstrap;
pub mod directory;
pub mod entity;
pub mod fields;
pub mod memory;
pub mod operations;
pub mod repository;
pub mod uniqueness;

pub use api::{all_principals_router, PrincipalResponse, PrincipalServices};
pub use bootstrap::{ensure_bootstrap_manager, BootstrapAccount};
pub use directory::{BackendSession, Directory, DirectoryBackend, DirectorySession};
pub use entity::{LoginIdentifier, Principal, PrincipalKind, PrincipalProfile, PrincipalStatus};
pub use fields::{PrincipalFields, SecretChange};
pub use memory::InMemoryDirectory;
pub use repository::PrincipalRepository;
pub use uniqueness::{UniquenessOracle, UniquenessProbe};
