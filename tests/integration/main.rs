//! Integration tests for Site-Ferry
//!
//! These tests run the pipeline stages against wiremock servers and check
//! the state files, the content store and the generated Markdown tree.

mod common;
mod crawl_tests;
mod pipeline_tests;
