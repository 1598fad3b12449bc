// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Fabric VRF
//!
//! Declarative, idempotent reconciliation of VRFs and their switch attachments
//! on an NDFC/DCNM fabric controller.
//!
//! ## Overview
//!
//! A task file names a controller, a state and a list of VRFs. A run:
//!
//! - Reads the VRFs and attachments currently defined on each fabric
//! - Diffs them against the desired entries under the task's state
//! - Issues only the REST calls needed to converge, in dependency order
//! - Reports what changed, the calls made and any per-item errors
//!
//! ## States
//!
//! 1. **merged**: Create or update the listed VRFs, keep everything else
//! 2. **replaced**: Make each listed VRF exactly match its entry
//! 3. **overridden**: Like replaced, and delete every unlisted VRF
//! 4. **deleted**: Detach and delete the listed VRFs (or all of them)
//! 5. **query**: Read state without changing anything
//!
//! ## Modules
//!
//! - [`config`]: Task parsing and per-state validation
//! - [`model`]: VRF and attachment domain types
//! - [`controller`]: REST transport, versioned paths, caching and state reads
//! - [`planner`]: Diff computation, request planning and execution
//! - [`reconciler`]: The run loop tying the pieces together
//! - [`result`]: The structured outcome of a run
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! controller:
//!   url: https://ndfc.example.net
//!   username: admin
//!
//! state: merged
//!
//! config:
//!   - fabric: dc1
//!     vrf_name: blue
//!     vrf_id: 9008011
//!     vlan_id: 2000
//!     attach:
//!       - ip_address: 10.1.1.11
//!         deployment: true
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod planner;
pub mod reconciler;
pub mod result;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigHasher, ConfigParser, ConfigValidator, TaskConfig, ValidatedConfig, VerbConfig};
pub use controller::{ControllerTransport, RestClient, StateCache};
pub use error::{FabricError, Result};
pub use model::{Attachment, Verb, Vrf};
pub use planner::{DiffEngine, ReconcilePlan, RequestExecutor};
pub use reconciler::{Reconciler, RunOptions};
pub use result::ModuleResult;
