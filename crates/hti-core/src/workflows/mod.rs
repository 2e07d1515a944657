//! # Workflows Module
//!
//! This module provides high-level workflow implementations that orchestrate
//! complete free-energy procedures in HTI++.
//!
//! ## Overview
//!
//! Workflows are the top-level entry points for users of HTI++. They encapsulate
//! entire procedures, from planning the lambda schedules of a switching run
//! through post-processing its simulation output into a reported free energy.
//! Each workflow handles configuration validation, progress reporting, and
//! result organization, providing a clean API for multi-stage pipelines.
//!
//! ## Architecture
//!
//! The module is organized around the phases of a switching study:
//!
//! - **Planning Workflow** ([`plan`]) - Builds the stages and empty tasks of a run
//!   from its configuration; simulations are then executed externally.
//! - **Estimation Workflow** ([`estimate`]) - Post-processes a completed run into
//!   its absolute free energy, combining stage estimation, composition, and the
//!   thermodynamic read-out.
//! - **Refinement Workflow** ([`refine`]) - Densifies a completed stage's schedule
//!   where the integration error exceeds a budget, reusing prior output.

pub mod estimate;
pub mod plan;
pub mod refine;
