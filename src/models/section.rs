use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use url::Url;
use validator::Validate;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum SectionContentType {
    Video,
    Pdf,
    Both,
    Text,
    Quiz,
}

impl SectionContentType {
    /// Derives the content type from the populated reference fields.
    ///
    /// Media kinds are fully determined by the references. Without any
    /// reference the caller may pick `text` (default) or `quiz`; asking for a
    /// media kind that disagrees with the references is rejected.
    pub fn derive(
        has_video: bool,
        has_document: bool,
        requested: Option<SectionContentType>,
    ) -> Result<SectionContentType, AppError> {
        let derived = match (has_video, has_document) {
            (true, true) => Some(SectionContentType::Both),
            (true, false) => Some(SectionContentType::Video),
            (false, true) => Some(SectionContentType::Pdf),
            (false, false) => None,
        };

        match (derived, requested) {
            (Some(kind), None) => Ok(kind),
            (Some(kind), Some(req)) if req == kind => Ok(kind),
            (Some(kind), Some(req)) => Err(AppError::Validation(format!(
                "content_type {:?} does not match the attached references ({:?})",
                req, kind
            ))),
            (None, None) => Ok(SectionContentType::Text),
            (None, Some(req @ (SectionContentType::Text | SectionContentType::Quiz))) => Ok(req),
            (None, Some(req)) => Err(AppError::Validation(format!(
                "content_type {:?} requires a video or document reference",
                req
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Section {
    pub id: String,
    pub module_id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "order")]
    pub position: i64,
    pub content_type: SectionContentType,
    pub video_ref: Option<String>,
    pub document_ref: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewSectionRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub content_type: Option<SectionContentType>,
    #[validate(length(max = 500))]
    pub video: Option<String>,
    #[validate(length(max = 500))]
    pub document_ref: Option<String>,
}

/// Reference fields: absent leaves the value untouched, an empty string clears it.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateSectionRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub content_type: Option<SectionContentType>,
    #[validate(length(max = 500))]
    pub video: Option<String>,
    #[validate(length(max = 500))]
    pub document_ref: Option<String>,
}

const YOUTUBE_HOSTS: &[&str] = &["youtube.com", "www.youtube.com", "m.youtube.com"];

fn is_youtube_id(candidate: &str) -> bool {
    candidate.len() == 11
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Normalises a video reference into either a bare YouTube id or an http(s) URL.
pub fn normalize_video_ref(raw: &str) -> Result<String, AppError> {
    let raw = raw.trim();
    if is_youtube_id(raw) {
        return Ok(raw.to_string());
    }

    let url = Url::parse(raw)
        .map_err(|_| AppError::Validation(format!("invalid video reference: {}", raw)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::Validation(format!(
            "unsupported video URL scheme: {}",
            url.scheme()
        )));
    }

    let host = url.host_str().unwrap_or_default();
    let youtube_id = if host == "youtu.be" {
        url.path_segments()
            .and_then(|mut segments| segments.next())
            .map(str::to_string)
    } else if YOUTUBE_HOSTS.contains(&host) {
        let mut segments = url.path_segments().into_iter().flatten();
        match segments.next() {
            Some("watch") => url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned()),
            Some("embed") | Some("shorts") | Some("live") => segments.next().map(str::to_string),
            _ => None,
        }
    } else {
        None
    };

    match youtube_id {
        Some(id) if is_youtube_id(&id) => Ok(id),
        Some(id) => Err(AppError::Validation(format!("invalid YouTube video id: {}", id))),
        None => Ok(url.to_string()),
    }
}

/// Treats `Some("")` as an explicit clear.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_from_references() {
        assert_eq!(
            SectionContentType::derive(true, true, None).unwrap(),
            SectionContentType::Both
        );
        assert_eq!(
            SectionContentType::derive(true, false, None).unwrap(),
            SectionContentType::Video
        );
        assert_eq!(
            SectionContentType::derive(false, true, None).unwrap(),
            SectionContentType::Pdf
        );
        assert_eq!(
            SectionContentType::derive(false, false, None).unwrap(),
            SectionContentType::Text
        );
    }

    #[test]
    fn test_derive_rejects_inconsistent_requests() {
        assert!(SectionContentType::derive(false, false, Some(SectionContentType::Video)).is_err());
        assert!(SectionContentType::derive(true, false, Some(SectionContentType::Pdf)).is_err());
        assert!(SectionContentType::derive(true, true, Some(SectionContentType::Text)).is_err());
        assert_eq!(
            SectionContentType::derive(false, false, Some(SectionContentType::Quiz)).unwrap(),
            SectionContentType::Quiz
        );
    }

    #[test]
    fn test_normalize_youtube_forms() {
        let id = "dQw4w9WgXcQ";
        assert_eq!(normalize_video_ref(id).unwrap(), id);
        assert_eq!(
            normalize_video_ref("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42").unwrap(),
            id
        );
        assert_eq!(normalize_video_ref("https://youtu.be/dQw4w9WgXcQ").unwrap(), id);
        assert_eq!(
            normalize_video_ref("https://www.youtube.com/embed/dQw4w9WgXcQ").unwrap(),
            id
        );
    }

    #[test]
    fn test_normalize_external_and_invalid() {
        assert_eq!(
            normalize_video_ref("https://cdn.example.com/intro.mp4").unwrap(),
            "https://cdn.example.com/intro.mp4"
        );
        assert!(normalize_video_ref("not a url").is_err());
        assert!(normalize_video_ref("ftp://example.com/video.mp4").is_err());
        assert!(normalize_video_ref("https://youtu.be/short").is_err());
    }
}
