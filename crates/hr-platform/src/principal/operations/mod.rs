//! Principal Operations
//!
//! Create, update and delete run through the unit of work; reads go
//! straight to the directory.

pub mod create;
pub mod delete;
pub mod query;
pub mod update;

pub use create::{CreatePrincipalCommand, CreatePrincipalUseCase};
pub use delete::{DeletePrincipalCommand, DeletePrincipalUseCase};
pub use query::PrincipalQueries;
pub use update::{UpdatePrincipalCommand, UpdatePrincipalUseCase};

use crate::details;
use crate::principal::entity::PrincipalKind;
use crate::usecase::UseCaseError;

pub(crate) fn principal_not_found(kind: PrincipalKind, id: &str) -> UseCaseError {
    UseCaseError::not_found_with_details(
        "PRINCIPAL_NOT_FOUND",
        format!("No {} found with that ID", kind.label()),
        details! { "id" => id },
    )
}
