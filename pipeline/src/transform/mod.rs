//! Record schema mapping.
//!
//! - Layout: shared header checks, row outcomes and CSV writing
//! - Project layout: the 25-column project table
//! - Task layout: the 18-column planner table
//! - Pipeline: store-level imports, exports and maintenance

pub mod layout;
pub mod pipeline;
pub mod project_layout;
pub mod task_layout;

pub use layout::{ImportBatch, RowOutcome, SkippedRow};
pub use pipeline::*;
pub use project_layout::{export_projects, parse_projects, PROJECT_HEADERS};
pub use task_layout::{export_tasks, parse_tasks, TASK_HEADERS};
