pub mod attempts;
pub mod grades;
pub mod overrides;
pub mod quizzes;
pub mod slots;
