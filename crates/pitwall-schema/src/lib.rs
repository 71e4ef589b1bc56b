//! Static cell layout of the race calculator workbook.
//!
//! [`Layout::standard`] is the single source of truth for which cell backs
//! which domain field. [`Layout::validate`] is run once at startup.

pub mod layout;
pub mod validation;

pub use layout::{
    BoostMiniStint, BoostSlot, CarPartRow, CompoundRow, Entry, Fallback, Field, Group, Layout,
    SetupPart, SetupRow, StintTable, COMPOUND_COLUMNS, SETUP_SESSIONS, STINT_COUNT,
    STINT_METRICS, TRACK_PLACEHOLDER, TRACKS_RANGE, TYRE_SUPPLIERS, boost_mini_column,
    stint_column, stint_key,
};
pub use validation::{SchemaIssue, ValidationError};
