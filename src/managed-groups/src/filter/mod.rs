//! Boolean filter expressions
//!
//! CEL is the grammar for both the OIDC managed group `filter` attribute,
//! which is only checked for syntax here, and the client-supplied list
//! filter, which is evaluated against each projected item bound as `item`.

pub mod convert;
pub mod engine;
pub mod error;

pub use engine::{Filter, FilterEngine, ITEM_VARIABLE};
pub use error::{FilterError, Result};
