//! Utility modules for xmlbuilder.
//!
//! Contains XML `Name` validation shared by element and attribute creation.

pub mod name;
