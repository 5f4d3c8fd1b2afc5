use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewCategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

pub const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("Programming", "Courses related to programming and software development"),
    ("Web Development", "Courses for creating web applications and websites"),
    ("Data Science", "Courses on data analysis, machine learning, and AI"),
    ("Mobile Development", "Courses for creating mobile applications"),
    ("Design", "Courses on graphic design, UI/UX, and digital art"),
    ("Business", "Courses on business management, entrepreneurship, and marketing"),
    ("Mathematics", "Courses on various mathematics topics"),
    ("Science", "Courses on physics, chemistry, biology, and more"),
    ("Languages", "Courses for learning natural languages"),
    ("Other", "Courses that do not fit any other category"),
];
