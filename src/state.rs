//! Shared state handed to every handler.

use crate::{
    config::AppConfig,
    services::{
        grant_service::UploadGrantService, layout::StorageLayout, metadata_store::MetadataStore,
        object_store::ObjectStoreService, signer::UrlSigner,
    },
};
use sqlx::SqlitePool;
use std::{path::PathBuf, sync::Arc};

#[derive(Clone)]
pub struct AppState {
    pub grants: UploadGrantService,
    pub objects: ObjectStoreService,
    pub metadata: MetadataStore,
}

impl AppState {
    /// Wire the three services over one pool and one signing secret.
    pub fn new(db: Arc<SqlitePool>, cfg: &AppConfig) -> Self {
        let signer = UrlSigner::new(cfg.signing_secret.clone());
        let layout = StorageLayout::new(cfg.public_base_url.clone());
        let objects =
            ObjectStoreService::new(db.clone(), PathBuf::from(&cfg.storage_dir), signer.clone());
        let metadata =
            MetadataStore::new(db, layout.clone(), objects.clone(), cfg.categories.clone());
        let grants = UploadGrantService::new(signer, layout, cfg.grant_ttl_secs);

        Self {
            grants,
            objects,
            metadata,
        }
    }
}
