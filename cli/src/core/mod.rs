//! # DevDash Core Infrastructure
//!
//! File: cli/src/core/mod.rs
//!
//! ## Overview
//!
//! This module aggregates the core infrastructure components that every other
//! part of devdash builds on: configuration, error management, templating and
//! the shared application context.
//!
//! ## Architecture
//!
//! - `config`: Configuration loading, merging, and validation
//! - `context`: `AppContext`, the explicitly passed bundle of config, cache,
//!   process runner and shutdown token
//! - `error`: Error types and error handling utilities
//! - `templating`: Built-in scaffold templates rendered with Tera
//!
//! ## Usage
//!
//! ```rust
//! use crate::core::config; // For loading configuration
//! use crate::core::context::AppContext; // Shared handles for services
//! use crate::core::error::{DashError, Result}; // For error handling
//! ```
//!
pub mod config;
pub mod context;
pub mod error;
pub mod templating;
