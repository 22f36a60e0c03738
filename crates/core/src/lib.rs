//! # medrep core
//!
//! Read-only reporting over a hospital records store.
//!
//! This crate contains:
//! - The record model flowing through pipelines ([`value`], [`record`])
//! - The store seam and an in-memory store built from a `records::Dataset` ([`store`])
//! - The access gate consulted before any collection is read ([`access`])
//! - The query/aggregation engine ([`engine`])
//! - The report catalog and canned lookups built on it ([`reports`], [`queries`])
//!
//! **No I/O beyond the store**: configuration is resolved by the caller and passed in as an
//! [`config::EngineConfig`]; the CLI owns environment handling and logging setup.

pub mod access;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod queries;
pub mod record;
pub mod reports;
pub mod store;
pub mod value;

#[cfg(test)]
mod fixtures;

pub use error::{ReportError, ReportResult};
