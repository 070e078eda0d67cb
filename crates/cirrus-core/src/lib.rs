//! Core value types for cirrus.
//!
//! This crate provides the foundational types shared by the cloud provider
//! and the convergence engines:
//!
//! - **Scalars**: [`SpecValue`], the extra-spec scalar with one canonical,
//!   total string form
//! - **Filters**: [`Filters`] and [`FilterValue`], the nested attribute
//!   filter mapping used by resource queries
//!
//! # Example
//!
//! ```
//! use cirrus_core::SpecValue;
//!
//! // Remote extra specs are strings; comparisons use the canonical form.
//! assert_eq!(SpecValue::Int(5).canonical(), "5");
//! assert_eq!(SpecValue::from_literal("false"), SpecValue::Bool(false));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod filter;
pub mod scalar;

pub use filter::{FilterValue, Filters};
pub use scalar::SpecValue;
