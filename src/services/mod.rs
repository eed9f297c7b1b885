pub mod attempts;
pub mod capabilities;
pub mod effective_settings;
pub mod gradebook;
pub mod grading;
pub mod layout;
pub mod notifications;
pub mod question_engine;
pub mod review;
pub mod structure;
