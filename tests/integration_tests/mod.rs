//! Integration tests module
//!
//! End-to-end tests for the portada harvester against wiremock servers,
//! including:
//! - Complete front page → articles → store pipeline
//! - Relevance classification over HTTP
//! - Error handling and recovery scenarios

pub mod classifier_test;
pub mod error_scenarios;
pub mod fixtures;
pub mod pipeline_test;
