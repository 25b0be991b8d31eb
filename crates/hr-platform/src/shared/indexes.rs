//! MongoDB Index Initialization
//!
//! Creates indexes for the principal collections, the identity claim
//! ledger and the audit log on startup.

use mongodb::{bson::doc, options::IndexOptions, Database, IndexModel};
use tracing::info;

use crate::principal::repository::{identity_collation, AUDIT_COLLECTION, CLAIMS_COLLECTION};
use crate::principal::PrincipalKind;

/// Initialize all MongoDB indexes
pub async fn initialize_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    info!("Initializing MongoDB indexes...");

    for kind in PrincipalKind::ALL {
        create_principal_indexes(db, kind).await?;
    }
    create_claim_indexes(db).await?;
    create_audit_log_indexes(db).await?;

    info!("MongoDB indexes initialized successfully");
    Ok(())
}

async fn create_principal_indexes(
    db: &Database,
    kind: PrincipalKind,
) -> Result<(), mongodb::error::Error> {
    let collection = db.collection::<mongodb::bson::Document>(kind.collection_name());

    // Email lookup, case-insensitive within the collection
    collection
        .create_index(
            IndexModel::builder()
                .keys(doc! { "email": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .sparse(true)
                        .collation(identity_collation())
                        .build(),
                )
                .build(),
        )
        .await?;

    // Phone or department contact
    collection
        .create_index(
            IndexModel::builder()
                .keys(doc! { "phone": 1 })
                .options(IndexOptions::builder().unique(true).sparse(true).build())
                .build(),
        )
        .await?;

    collection
        .create_index(
            IndexModel::builder()
                .keys(doc! { "username": 1 })
                .options(IndexOptions::builder().unique(true).sparse(true).build())
                .build(),
        )
        .await?;

    // Pending reset tokens
    collection
        .create_index(
            IndexModel::builder()
                .keys(doc! { "resetTokenDigest": 1 })
                .options(IndexOptions::builder().sparse(true).build())
                .build(),
        )
        .await?;

    // Listing, newest first
    collection
        .create_index(IndexModel::builder().keys(doc! { "createdAt": -1 }).build())
        .await?;

    info!("Created indexes on {}", kind.collection_name());
    Ok(())
}

async fn create_claim_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    // Uniqueness itself rides on _id; this serves release by owner.
    db.collection::<mongodb::bson::Document>(CLAIMS_COLLECTION)
        .create_index(IndexModel::builder().keys(doc! { "ownerId": 1 }).build())
        .await?;

    info!("Created indexes on {}", CLAIMS_COLLECTION);
    Ok(())
}

async fn create_audit_log_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    let audit_logs = db.collection::<mongodb::bson::Document>(AUDIT_COLLECTION);

    audit_logs
        .create_index(
            IndexModel::builder()
                .keys(doc! { "entityType": 1, "entityId": 1 })
                .build(),
        )
        .await?;

    audit_logs
        .create_index(IndexModel::builder().keys(doc! { "performedAt": -1 }).build())
        .await?;

    info!("Created indexes on {}", AUDIT_COLLECTION);
    Ok(())
}
