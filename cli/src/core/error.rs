//! # DevDash Error Types
//!
//! File: cli/src/core/error.rs
//!
//! ## Overview
//!
//! This module defines the error taxonomy used throughout devdash. Every
//! failure a dashboard request can end in is one of the `DashError` variants,
//! and each variant knows which HTTP status it maps to.
//!
//! ## Architecture
//!
//! The error system consists of two main components:
//! - `DashError`: A custom error enum using `thiserror` for specific error kinds
//! - `Result<T>`: A type alias for `anyhow::Result<T>` for flexible error handling
//!
//! Service code returns `Result<T>` and raises `DashError` values where the kind
//! of failure matters to the caller. The HTTP layer downcasts the `anyhow::Error`
//! back to a `DashError` to pick the response status; anything else is a 500.
//!
//! ## Examples
//!
//! ```rust
//! // Return a specific error kind
//! if !abs.exists() {
//!     return Err(DashError::NotFound("Not found".into()).into());
//! }
//!
//! // Add context to unexpected I/O errors
//! let raw = fs::read(&abs).with_context(|| format!("Failed to read {}", abs.display()))?;
//!
//! // Pick a status from an error
//! let status = err
//!     .downcast_ref::<DashError>()
//!     .map(DashError::status)
//!     .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
//! ```
//!
use axum::http::StatusCode;
use thiserror::Error;

/// Custom error type for the dashboard.
///
/// The request-level variants display only their message, because that message
/// is what the frontend shows to the user.
#[derive(Error, Debug)]
pub enum DashError {
    /// Bad project name, bad path, missing parameter (400).
    #[error("{0}")]
    InvalidInput(String),

    /// Resolved path escapes the project root (403).
    #[error("{0}")]
    AccessDenied(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    MethodNotAllowed(String),

    /// Rename target or new project already exists (409).
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    /// Denied file extension on write (415).
    #[error("{0}")]
    UnsupportedMedia(String),

    /// A filesystem operation failed (500); the message names the operation.
    #[error("{0}")]
    FileSystem(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Template rendering error: {source}")]
    Template {
        #[from]
        source: tera::Error,
    },

    #[error("External command failed: {cmd}, Status: {status}. See log: {log}")]
    ExternalCommand {
        cmd: String,
        status: String,
        log: String,
    },

    /// A scaffolding step exited non-zero; the message names the step and its log.
    #[error("{tool} error ({step}). See log: {log}")]
    StepFailed {
        tool: String,
        step: String,
        log: String,
    },

    #[error("Operation cancelled: {0}")]
    Cancelled(String),
}

impl DashError {
    /// HTTP status the API answers with for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            DashError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            DashError::AccessDenied(_) => StatusCode::FORBIDDEN,
            DashError::NotFound(_) => StatusCode::NOT_FOUND,
            DashError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            DashError::Conflict(_) => StatusCode::CONFLICT,
            DashError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            DashError::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            DashError::FileSystem(_)
            | DashError::Config(_)
            | DashError::Template { .. }
            | DashError::ExternalCommand { .. }
            | DashError::StepFailed { .. }
            | DashError::Cancelled(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        DashError::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        DashError::NotFound(msg.into())
    }
}

/// Type alias for Result using anyhow::Error for broad compatibility.
pub type Result<T> = anyhow::Result<T>;
