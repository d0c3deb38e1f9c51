//! Structural extraction of portal pages.
//!
//! - `dom`: strict direct-child accessors over the parsed tree
//! - `date`: date and period normalisation
//! - `index`: announcement listing rows
//! - `detail`: announcement detail pages

pub mod date;
pub mod detail;
pub mod dom;
pub mod index;

pub use date::{parse_date, parse_period, to_utc_instant};
pub use detail::{extract_detail, parse_detail_page};
pub use index::{extract_index, parse_index_page};
