//! GitHub issue tracker integration.

pub mod issues;
