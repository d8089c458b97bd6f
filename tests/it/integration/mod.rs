//! Integration tests for the recolor session.
//!
//! These tests drive a whole session against a fake mask oracle and verify
//! complete editing workflows end-to-end.

mod fill_workflow_tests;
mod freehand_tool_tests;
mod history_tests;
