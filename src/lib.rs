// Allow some clippy lints that are too strict for our codebase
#![allow(clippy::collapsible_if)]

//! Endpointer
//!
//! Cross-references HTTP routes declared in backend code with the frontend
//! code that calls them, using tagged comments as the source of truth:
//!
//! ```text
//! // ENDPOINTER <backend> method: "POST", endpoint: "/users"
//! // ENDPOINTER <frontend> method: "POST", endpoint: "/users"
//! ```
//!
//! # Architecture
//!
//! 1. **Tags** ([`tags`]): the comment grammar, extracted with regexes.
//! 2. **Scanning** ([`discovery`], [`scanner`]): per-side file selection and
//!    non-blocking reads producing flat declaration/call lists.
//! 3. **Cross-reference** ([`xref`]): exact `(method, endpoint)` lookup,
//!    first declaration wins.
//! 4. **Route tree** ([`tree`]): path-segmented hierarchy with verb-ordered
//!    leaves and attached calls.
//! 5. **Projection** ([`decorations`], [`locator`]): per-document link spans
//!    and the locator string codec.
//!
//! [`EndpointerState`] ties these together behind the calls a host makes.
//!
//! # Usage
//!
//! ```ignore
//! use endpointer::{EndpointerState, load_config};
//!
//! let state = EndpointerState::default();
//! let config = load_config(&root);
//! state.rescan(&[root.clone()], &config).await?;
//!
//! for node in state.route_tree().roots() {
//!     println!("{} {}", node.label(), node.description());
//! }
//! ```

pub mod config;
pub mod decorations;
pub mod discovery;
pub mod error;
pub mod lint;
pub mod locator;
pub mod scanner;
pub mod state;
pub mod tags;
pub mod tree;
pub mod types;
pub mod watch;
pub mod xref;

// Re-exports
pub use config::{EndpointerConfig, SideConfig, load_config, save_config, try_load_config};
pub use decorations::{DecorationCache, LinkSpan, LinkTarget, project_decorations};
pub use discovery::{FileDiscovery, FileSelector};
pub use error::{ConfigError, DecodeError, ScanError};
pub use lint::{CoverageChecker, CoverageReport};
pub use locator::LocatorCodec;
pub use scanner::{ScanOutcome, WorkspaceScanner};
pub use state::{EndpointerState, ScanSnapshot, ScanStats, SharedState, create_state};
pub use tags::{TagKind, TagMatch, TagParser};
pub use tree::{MethodLeaf, OutlineItem, RouteNode, RouteTree, SegmentNode};
pub use types::*;
pub use xref::{CrossReferenceIndex, Resolution, UNRESOLVED_TARGET};

/// Tool name.
pub const TOOL_NAME: &str = "endpointer";
/// Tool version.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");
