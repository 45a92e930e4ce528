//! Repair-loop orchestrators
//!
//! Both call sites drive the router through the same bounded loop: a schema
//! failure feeds its diagnostics back to the model in a repair prompt until
//! the attempt budget is spent, while credential, rejection and availability
//! failures end the loop at once.

pub mod course_parse;
mod error;
pub mod practice;
mod repair;

pub use course_parse::{
    CourseParseCommand, CourseParseOutcome, CourseParsePrompts, CourseParseWorkflow,
    DefaultCourseParsePrompts,
};
pub use error::WorkflowError;
pub use practice::{
    DefaultPracticePrompts, PracticeGenerateCommand, PracticeGenerateOutcome,
    PracticeGenerateWorkflow, PracticeModuleContext, PracticePrompts,
};
pub use repair::{RepairLoop, Repaired, Verdict};
