use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, types::Json};
use validator::Validate;

use super::progress::CourseProgress;

fn default_points() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub prompt: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub answer: Value,
    #[serde(default = "default_points")]
    pub points: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Quiz {
    pub id: String,
    pub lesson_id: String,
    pub title: String,
    pub passing_score: f64,
    pub max_attempts: Option<i64>,
    pub questions: Json<Vec<QuizQuestion>>,
    pub created_at: String,
    pub updated_at: String,
}

impl Quiz {
    pub fn passed(&self, score: f64) -> bool {
        score >= self.passing_score
    }

    /// Points-weighted percentage of positionally matching answers.
    pub fn grade(&self, answers: &[Value]) -> f64 {
        let total: f64 = self.questions.iter().map(|q| q.points).sum();
        if total <= 0.0 {
            return 0.0;
        }
        let earned: f64 = self
            .questions
            .iter()
            .zip(answers.iter())
            .filter(|(question, answer)| question.answer == **answer)
            .map(|(question, _)| question.points)
            .sum();
        round2(earned / total * 100.0)
    }
}

/// Quiz as shown to learners: answers stripped.
#[derive(Debug, Clone, Serialize)]
pub struct QuizView {
    pub id: String,
    pub lesson_id: String,
    pub title: String,
    pub passing_score: f64,
    pub max_attempts: Option<i64>,
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    pub prompt: String,
    pub options: Vec<String>,
    pub points: f64,
}

impl From<Quiz> for QuizView {
    fn from(quiz: Quiz) -> Self {
        let questions = quiz
            .questions
            .0
            .into_iter()
            .map(|q| QuestionView {
                prompt: q.prompt,
                options: q.options,
                points: q.points,
            })
            .collect();
        Self {
            id: quiz.id,
            lesson_id: quiz.lesson_id,
            title: quiz.title,
            passing_score: quiz.passing_score,
            max_attempts: quiz.max_attempts,
            questions,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(range(min = 0.0, max = 100.0))]
    pub passing_score: Option<f64>,
    #[validate(range(min = 1))]
    pub max_attempts: Option<i64>,
    #[serde(default)]
    pub questions: Vec<QuizQuestion>,
}

/// Learner answers, positionally matched against the questions. The score is
/// always computed on the server; any client-sent score is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct QuizSubmission {
    #[serde(default)]
    pub answers: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizResult {
    pub quiz_id: String,
    pub score: f64,
    pub passed: bool,
    pub attempts: i64,
    pub progress: CourseProgress,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Assignment {
    pub id: String,
    pub lesson_id: String,
    pub title: String,
    pub instructions: String,
    pub max_score: i64,
    pub due_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewAssignmentRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    pub instructions: String,
    #[validate(range(min = 1, max = 1000))]
    pub max_score: Option<i64>,
    pub due_at: Option<chrono::DateTime<chrono::Utc>>,
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
