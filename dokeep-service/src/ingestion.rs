//! Pure helpers for the ingestion pipeline: content hashing and resolution
//! of final document fields from competing sources.

mod dates;
mod hash;

pub use dates::{parse_user_date, resolve_created_date, resolve_summary};
pub use hash::content_hash;
