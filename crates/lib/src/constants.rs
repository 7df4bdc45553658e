//! Constants used throughout the Tessera library.
//!
//! This module provides central definitions for reserved strings and limits
//! shared by the placement and conflict subsystems.

/// Wildcard entry in a drop zone's accepted kinds, matching every component
/// kind. Used by deletion/trash zones.
pub const WILDCARD_KIND: &str = "*";

/// Marker opening the local side of an unresolved merge hunk.
pub const MERGE_MARKER_LOCAL: &str = "<<<<<<< LOCAL";

/// Marker separating the two sides of an unresolved merge hunk.
pub const MERGE_MARKER_SEPARATOR: &str = "=======";

/// Marker closing the remote side of an unresolved merge hunk.
pub const MERGE_MARKER_REMOTE: &str = ">>>>>>> REMOTE";

/// Default page size for conflict list queries.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Upper bound on the page size a list query may request.
pub const MAX_PAGE_SIZE: usize = 500;
