#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Code-to-region mapping for German federal states.
//!
//! Registry records carry two independent hints about their state: a
//! four-digit state identifier and an eight-digit municipality key whose
//! first two digits name the state. Both are mapped into the same
//! normalized name space that boundary polygons are keyed by, so all three
//! signals can be compared with plain string equality.

pub mod codes;
pub mod normalize;

pub use codes::{map_prefix_code, map_state_code, municipality_prefix};
pub use normalize::normalize_name;
