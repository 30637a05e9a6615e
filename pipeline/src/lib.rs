//! # RD Dashboard - data pipeline for an R&D project and task dashboard
//!
//! Imports internal project records and external planner task exports from
//! CSV, spreadsheet and JSON files, validates and sanitizes them, computes
//! dashboard statistics, and backs collections up to a JSON envelope.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ CSV / XLSX  │────▶│   Parser    │────▶│  Transform  │────▶│ RecordStore │
//! │ JSON backup │     │  (auto-enc) │     │ (validate + │     │  (replace   │
//! │ (file/URL)  │     │             │     │  sanitize)  │     │   whole)    │
//! └─────────────┘     └─────────────┘     └─────────────┘     └──────┬──────┘
//!                                                                    │
//!                                          ┌─────────────┐           │
//!                                          │ Stats/Backup│◀──────────┘
//!                                          └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rd_dashboard::{import_tasks_csv, task_report, MemoryStore, RecordStore};
//!
//! let mut store = MemoryStore::new();
//! let report = import_tasks_csv(&mut store, &std::fs::read_to_string("planner.csv")?)?;
//! println!("{}", report.summary());
//! println!("{:?}", task_report(&store.load()?).timeline);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Project and Task records, drafts, dates
//! - [`parser`] - CSV tokenizer and encoding detection
//! - [`validation`] - Project field rules and envelope schema
//! - [`sanitize`] - Project normalization
//! - [`transform`] - Column layouts and store-level pipelines
//! - [`stats`] - Project statistics and task reports
//! - [`backup`] - Backup envelope create/restore
//! - [`store`] - Record store port and implementations
//! - [`source`] - File/URL reading and workbook conversion
//! - [`config`] - Environment configuration
//! - [`logs`] - Log broadcaster

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Validation
pub mod sanitize;
pub mod validation;

// Transformation
pub mod transform;

// Aggregation
pub mod stats;

// Persistence
pub mod backup;
pub mod store;

// I/O
pub mod config;
pub mod source;

// Notifications
pub mod logs;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, FormatError, PipelineError, PipelineResult, SourceError, StoreError,
    WorkbookError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    IdSequence, Milestone, MilestoneDraft, Project, ProjectDraft, ProjectStatus, ProjectType,
    Task,
};

// =============================================================================
// Re-exports - Parsing, validation, sanitizing
// =============================================================================

pub use parser::{decode_bytes, parse_table, split_fields, CsvError, CsvTable};
pub use sanitize::sanitize_project;
pub use validation::{is_valid_project, validate_project};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::{
    cleanup_invalid_projects, export_projects_csv, export_tasks_csv, import_file,
    import_projects_csv, import_projects_json, import_tasks_csv, import_tasks_workbook,
    open_store, reset, ImportBatch, ImportReport, RecordKind, RowOutcome, SkippedRow,
};

// =============================================================================
// Re-exports - Stats & backup
// =============================================================================

pub use backup::{create_backup, restore_backup, Backup, JsonBlob, RestoreReport};
pub use stats::{
    bucket_completion, checklist_status, project_stats, recent_activity, task_kpis, task_report,
    ProjectStats, TaskKpis, TaskReport,
};

// =============================================================================
// Re-exports - Store, source, config
// =============================================================================

pub use config::Config;
pub use source::{CalamineReader, NoWorkbookSupport, SourceKind, WorkbookReader, Worksheet};
pub use store::{JsonFileStore, MemoryStore, RecordStore, StoredRecord};
