#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Public sync API façade
pub mod app;

/// Identity provider collaborator and session types
pub mod auth;

/// Durable per-device cache
pub mod cache;

/// Configuration options
pub mod config;

/// Connectivity tracking
pub mod connectivity;

/// Error (common error types)
pub mod error;

/// Note and folder domain model
pub mod note;

/// Remote content store abstraction and adapters
pub mod remote;

/// Reconciliation engine
pub mod sync;
