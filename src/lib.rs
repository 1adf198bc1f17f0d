//! # Shim Database to XML
//!
//! Renders Windows application-compatibility shim databases (`.sdb`) as XML
//! documents, optionally embedding or extracting their binary payloads.
//!
//! ## Features
//!
//! - **Fast reading**: Memory-mapped, bounds-checked access to the database image
//! - **Typed values**: Every tag is classified from its type code into a semantic kind
//! - **Faithful output**: Document order follows the database, one element per tag
//! - **Payload handling**: Inline base64 or extraction to side files
//!
//! ## Architecture
//!
//! 1. **Provider**: navigation and typed reads over the stored tag tree
//! 2. **Classifier**: type code to base type and semantic kind
//! 3. **Tags**: transient views with an explicit child cursor
//! 4. **Values**: one tagged union per tag, pure text conversions
//! 5. **Report**: depth-first XML rendering with payload extraction
//!
//! ## Examples
//!
//! ```no_run
//! use sdb_xml::{write_report, OutputMode, ReportOptions, SdbFile, ShimDatabase};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let database = ShimDatabase::<SdbFile>::open("sysmain.sdb")?;
//!
//! for tag in database.root().children() {
//!     println!("{} ({:?})", tag.name(), tag.kind());
//! }
//!
//! let options = ReportOptions::with_mode(OutputMode::Base64);
//! write_report(&database, std::io::stdout().lock(), &options)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod database;
pub mod error;
pub mod extract;
pub mod provider;
pub mod sdb;
pub mod tag;
pub mod tag_type;
pub mod utils;
pub mod value;
pub mod xml;

pub use config::{OutputMode, ReportOptions};
pub use database::{resolve_path, ShimDatabase};
pub use error::{Result, SdbError};
pub use extract::{Extractor, FileNamer};
pub use provider::{OpenProvider, Provider, TagId, TAGID_ROOT};
pub use sdb::{SdbFile, SdbHeader};
pub use tag::{ChildCursor, Children, Tag};
pub use tag_type::{classify, BaseType, SemanticKind, TagCode};
pub use value::{format_value, FormattedValue, TagValue};
pub use xml::{encode_local_name, write_report, ReportWriter};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
