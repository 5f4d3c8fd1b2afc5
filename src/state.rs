use std::sync::Arc;

use sqlx::SqlitePool;

use crate::identity::IdentityProvider;
use crate::services::{
    CatalogService, ContentService, EnrollmentService, ProgressService, ReviewService,
};
use crate::storage::BlobStore;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub identity: Arc<dyn IdentityProvider>,
    pub storage: Arc<dyn BlobStore>,
}

impl AppState {
    pub fn catalog(&self) -> CatalogService {
        CatalogService::new(self.db.clone(), self.storage.clone())
    }

    pub fn enrollments(&self) -> EnrollmentService {
        EnrollmentService::new(self.db.clone())
    }

    pub fn progress(&self) -> ProgressService {
        ProgressService::new(self.db.clone())
    }

    pub fn reviews(&self) -> ReviewService {
        ReviewService::new(self.db.clone())
    }

    pub fn content(&self) -> ContentService {
        ContentService::new(self.db.clone(), self.storage.clone())
    }
}
