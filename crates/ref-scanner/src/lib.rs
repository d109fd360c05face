#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`ScannerError`)
//! - [`config`]: Scanner configuration (`ScannerConfig`, builder)
//! - [`types`]: Domain types (`PackageVersion`, `PackageReference`, `RepositoryDescriptor`)
//! - [`parser`]: Manifest parser (`ManifestParser`, `parse_manifest`)
//! - [`graph`]: Package-to-repository index (`ReferenceGraph`)
//! - [`provider`]: Search/content provider traits and `GitHubClient`
//! - [`snapshot`]: Read-side projection (`ScanSnapshot`, `ScanStatus`, `DataTable`)
//! - [`event`]: Scan progress events (`ScanEvent`)
//! - [`scanner`]: Main orchestrator (`ReferenceScanner`, `ReferenceScannerBuilder`, `Pipeline` impl)

pub mod config;
pub mod error;
pub mod event;
pub mod graph;
pub mod parser;
pub mod provider;
pub mod scanner;
pub mod snapshot;
pub mod types;

// --- Public API Re-exports ---

// Scanner (main orchestrator)
pub use scanner::{CycleSummary, ReferenceScanner, ReferenceScannerBuilder, ScanView};

// Configuration
pub use config::{ScannerConfig, ScannerConfigBuilder};

// Error
pub use error::ScannerError;

// Events
pub use event::ScanEvent;

// Types
pub use types::{PackageReference, PackageVersion, RepositoryDescriptor};

// Parser
pub use parser::{ManifestParser, parse_manifest};

// Graph
pub use graph::ReferenceGraph;

// Providers
pub use provider::{
    ContentProvider, GitHubClient, RepositoryInfo, SearchItem, SearchPage, SearchProvider,
    SearchQuery,
};

// Snapshot
pub use snapshot::{DataTable, DataTableRow, ScanSnapshot, ScanStatus, SnapshotEntry};
