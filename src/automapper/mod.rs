//! Automapper
//!
//! Proposes mapping paths from spreadsheet column headers to fields of the
//! collections schema. The search walks relationships breadth first from the
//! base table, so shorter paths always win over longer ones, and runs in two
//! passes:
//!
//! 1. Shortcuts and table synonyms, from the base table
//! 2. Field synonyms and name matches, from the starting table
//!
//! A header is exhausted by its first mapping unless that mapping crosses a
//! to-many relationship, in which case further mappings receive the next free
//! reference index (`#1`, `#2`, ...).
//!
//! # Example
//!
//! ```rust,ignore
//! use collection_automapper::automapper::{Automapper, AutomapperParams, MapOptions};
//!
//! let params = AutomapperParams::new(["Catalog Number", "Collector Last Name"], "collectionobject");
//! let results = Automapper::new(&schema, params).map(MapOptions::default())?;
//! for (header, paths) in &results {
//!     println!("{header}: {:?}", paths);
//! }
//! ```

mod cache;
mod commit;
mod config;
mod engine;
mod error;
pub mod headers;
mod matching;
pub mod path;

pub use cache::{CacheStats, DEFAULT_CACHE_CAPACITY, ResultsCache, compute_hash};
pub use config::{AutomapperConfig, AutomapperParams, MAX_DEPTH, MapOptions};
pub use engine::{Automapper, AutomapperResults, PathIsMapped};
pub use error::{AutomapperError, AutomapperResult};
pub use headers::HeaderEntry;
pub use path::{MappingPath, PathSegment};

use crate::schema::SchemaGraph;

/// Map headers from `base_table` with default options and the process-wide cache
pub fn automap<I, S>(
    schema: &SchemaGraph,
    headers: I,
    base_table: &str,
) -> AutomapperResult<AutomapperResults>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Automapper::new(schema, AutomapperParams::new(headers, base_table)).map(MapOptions::default())
}
