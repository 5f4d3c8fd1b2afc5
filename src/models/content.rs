use serde::Serialize;

use super::lesson::LessonContentType;
use super::section::SectionContentType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoProvider {
    Youtube,
    External,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoPointer {
    pub provider: VideoProvider,
    pub id: Option<String>,
    pub url: String,
    pub embed_url: Option<String>,
}

impl VideoPointer {
    /// Stored refs are either a bare YouTube id or an absolute URL.
    pub fn from_ref(video_ref: &str) -> Self {
        if video_ref.starts_with("http://") || video_ref.starts_with("https://") {
            Self {
                provider: VideoProvider::External,
                id: None,
                url: video_ref.to_string(),
                embed_url: None,
            }
        } else {
            Self {
                provider: VideoProvider::Youtube,
                id: Some(video_ref.to_string()),
                url: format!("https://www.youtube.com/watch?v={}", video_ref),
                embed_url: Some(format!("https://www.youtube.com/embed/{}", video_ref)),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentPointer {
    pub handle: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContentDescriptor {
    pub section_id: String,
    pub kind: SectionContentType,
    pub video: Option<VideoPointer>,
    pub document: Option<DocumentPointer>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseOutline {
    pub course_id: String,
    pub title: String,
    pub modules: Vec<OutlineModule>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutlineModule {
    pub id: String,
    pub title: String,
    pub order: i64,
    pub sections: Vec<OutlineSection>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutlineSection {
    pub id: String,
    pub title: String,
    pub order: i64,
    pub content_type: SectionContentType,
    pub completed: bool,
    pub lessons: Vec<OutlineLesson>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutlineLesson {
    pub id: String,
    pub title: String,
    pub order: i64,
    pub content_type: LessonContentType,
    pub duration_minutes: i64,
    pub completed: bool,
}
