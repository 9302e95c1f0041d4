//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and exercise the
//! request executor, the spider and the full task pipeline end-to-end.

mod crawl_tests;
mod executor_tests;
mod spider_tests;
