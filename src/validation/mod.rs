/*!
 * Validation module for translation quality assurance.
 *
 * This module provides heuristic checks for translated fragments:
 * - Length validation (empty, passthrough, length ratio)
 * - Format preservation validation (line breaks, list markers)
 * - Placeholder validation (template placeholders, URLs, emails)
 *
 * # Architecture
 *
 * - `length`: Validates emptiness, passthrough and length ratios
 * - `formatting`: Validates structural formatting preservation
 * - `placeholders`: Validates placeholder, URL and email preservation
 * - `service`: Runs every rule and scores the result
 */

pub mod formatting;
pub mod length;
pub mod placeholders;
pub mod service;

// Re-export main types
pub use service::{IssueSeverity, IssueType, QualityChecker, QualityIssue, QualityResult};
