//! Use-case services over the repository abstraction.
//!
//! # Responsibility
//! - Orchestrate backend calls into caller-facing entry points.
//! - Keep front-end layers decoupled from storage details.

pub mod repository_service;
