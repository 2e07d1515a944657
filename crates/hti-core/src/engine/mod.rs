//! # Engine Module
//!
//! This module implements the estimation engine of HTI++, providing the
//! computational framework that turns completed switching runs into absolute
//! free energies.
//!
//! ## Overview
//!
//! The engine module orchestrates the post-processing pipeline for free-energy
//! estimation. It manages run configuration, applies the two independent
//! estimators to each stage, composes per-stage results, and plans adaptive
//! schedule refinement against an error budget.
//!
//! ## Architecture
//!
//! The module is organized into specialized submodules that handle different
//! aspects of the estimation process:
//!
//! - **Configuration** ([`config`]) - Immutable run parameters, per-stage schedule slots, and TOML loading
//! - **Error Handling** ([`error`]) - Engine-wide error taxonomy with stage and task context
//! - **Quadrature Estimation** ([`estimator`]) - Integrand reduction and path integration per stage
//! - **Multistate Reweighting** ([`mbar`]) - The MBAR solver and its asymptotic covariance estimate
//! - **Stage Composition** ([`compose`]) - Combining stages and finalizing the reported free energy
//! - **Thermodynamic Read-out** ([`thermo`]) - Equilibrium summary of the end-point state
//! - **Adaptive Refinement** ([`refine`]) - Schedule densification with output reuse
//! - **Progress Monitoring** ([`progress`]) - Progress reporting and user feedback mechanisms
//!
//! ## Key Capabilities
//!
//! - **Two independent estimators** with a shared result type, so stages can mix methods
//! - **Typed, context-carrying failures** with no internal retries
//! - **Distinct statistical and systematic error channels** with distinct aggregation rules
//! - **Cheap refinement** that reuses every already-simulated lambda point

pub mod compose;
pub mod config;
pub mod error;
pub mod estimator;
pub mod mbar;
pub mod progress;
pub mod refine;
pub mod thermo;
