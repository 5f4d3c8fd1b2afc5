pub mod assessment;
pub mod category;
pub mod content;
pub mod course;
pub mod enrollment;
pub mod lesson;
pub mod module;
pub mod progress;
pub mod review;
pub mod section;
pub mod user;

pub use assessment::{
    Assignment, NewAssignmentRequest, NewQuizRequest, Quiz, QuizQuestion, QuizResult,
    QuizSubmission, QuizView,
};
pub use category::{Category, NewCategoryRequest};
pub use content::{ContentDescriptor, CourseOutline, DocumentPointer, VideoPointer};
pub use course::{
    Course, CourseDetail, CourseListQuery, CourseStatus, Difficulty, EnrollmentType,
    NewCourseRequest, StatusUpdateRequest, UpdateCourseRequest,
};
pub use enrollment::{
    EnrolledStudent, Enrollment, EnrollmentCheck, EnrollmentListQuery, EnrollmentScope,
    EnrollmentStatus, EnrollmentSummary, EnrollOutcome, RemovedStudent,
};
pub use lesson::{Lesson, LessonContentType, NewLessonRequest, UpdateLessonRequest};
pub use module::{Module, NewModuleRequest, ReorderRequest, UpdateModuleRequest};
pub use progress::{
    ActivityRequest, CourseProgress, LessonCompletion, Progress, ProgressReport,
    SectionCompletion, SectionProgress,
};
pub use review::{NewReviewRequest, RatingSummary, Review, UpdateReviewRequest};
pub use section::{NewSectionRequest, Section, SectionContentType, UpdateSectionRequest};
pub use user::{AuthUser, Role};
