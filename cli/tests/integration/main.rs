//! Integration tests for turboship CLI
//!
//! These tests spawn the actual binary and test end-to-end behavior.
//! Every test points `TURBOSHIP_CONFIG` at a temporary configuration so no
//! host state is read or written.

mod cli_tests;
