//! End-to-end scenario tests for Tessera.
//!
//! Each test boots a node from a genesis configuration, produces blocks
//! through the public node API and checks state through the query surface.

pub mod helpers;
