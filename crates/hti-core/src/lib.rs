//! # HTI++ Core Library
//!
//! A modernized, high-performance library for computing absolute free energies of
//! condensed-phase systems from molecular-dynamics runs sampled along a coupling
//! parameter (lambda), following the Hamiltonian thermodynamic-integration method.
//!
//! ## Architectural Philosophy
//!
//! The library is designed with a strict three-layer architecture to ensure a clear
//! separation of concerns, making it modular, testable, and extensible.
//!
//! - **[`core`]: The Foundation.** Contains stateless data models (`LambdaSchedule`,
//!   `Stage`, `Task`), pure numerics (block averaging, coupling-work integrands,
//!   non-uniform quadrature), and table I/O utilities.
//!
//! - **[`engine`]: The Logic Core.** This layer holds the run configuration, the two
//!   free-energy estimators (numerical quadrature and multistate reweighting), the
//!   adaptive refinement planner, and the stage composer that assembles the final
//!   thermodynamic report.
//!
//! - **[`workflows`]: The Public API.** This is the highest-level, user-facing layer.
//!   It ties the `engine` and `core` together to execute complete procedures: planning
//!   a switching run, post-processing its simulation output into a free energy, and
//!   refining a stage's lambda schedule against an error budget.

pub mod core;
pub mod engine;
pub mod workflows;
