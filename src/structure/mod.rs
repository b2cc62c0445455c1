//! File structure bookkeeping: zones, headers and the registry that keeps
//! them consistent while zones change size.
//!
//! A *zone* is a byte range that holds one tag. A *header* is a field
//! somewhere else in the file (a chunk size, an item counter, an offset
//! table entry) whose value depends on a zone. After a zone is resized,
//! [`ZoneRegistry::rewrite_headers`] patches every header that depends on
//! it, following the zone's shift through the correction table.
//!
//! ```text
//! pre-edit   | hdr | ..... | zone A (50) | ..... | idx -> B | zone B |
//! post-edit  | hdr'| ..... | zone A (70)       | ..... | idx'-> B | zone B |
//!              ^ size +20                              ^ moved by +20, value +20
//! ```

mod header;
mod registry;
mod value;
mod zone;

pub use header::{Header, HeaderKind};
pub use registry::{Correction, RewriteAction, ZoneRegistry};
pub use value::{Endianness, HeaderValue, NumericType};
pub use zone::{DEFAULT_ZONE_NAME, Zone};
