//! Structured payloads produced by the two repair-loop call sites

pub mod course_plan;
pub mod practice;

pub use course_plan::{CourseDeadline, CourseModule, CoursePlan};
pub use practice::{PracticeCandidate, PracticeDifficulty, PracticeGeneration, PracticeTaskDraft};
