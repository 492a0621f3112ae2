// crates/crosscut-config/src/lib.rs
// ============================================================================
// Module: Crosscut Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for crosscut.toml semantics.
// Dependencies: crosscut-core, crosscut-expr, serde, toml
// ============================================================================

//! ## Overview
//! `crosscut-config` defines the configuration model for the interception
//! engine. It provides strict, fail-closed validation and converts each
//! section into the settings value the core and expression crates consume.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
