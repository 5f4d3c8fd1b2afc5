pub mod catalog_service;
pub mod content_service;
pub mod enrollment_service;
pub mod progress_service;
pub mod review_service;

pub use catalog_service::CatalogService;
pub use content_service::ContentService;
pub use enrollment_service::EnrollmentService;
pub use progress_service::ProgressService;
pub use review_service::ReviewService;
