//! Unit tests for the recolor engine.

mod background_tests;
mod geometry_tests;
mod transform_tests;
