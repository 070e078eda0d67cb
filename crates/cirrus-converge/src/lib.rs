//! Convergence engines for declarative OpenStack resources.
//!
//! Each engine is a stateless single-pass decision function: given the
//! declared parameters and the freshly observed remote state, it computes
//! whether a change is required and the ordered calls that realize it.
//! Idempotency comes from re-deriving the decision from scratch on every
//! run, not from persisted state.
//!
//! - [`flavor`]: compute flavor convergence (create / replace / extra-spec
//!   diff / delete)
//! - [`users`]: identity user query and filtering (read-only)
//!
//! # Example
//!
//! ```no_run
//! use cirrus_cloud::{CloudConfig, OpenStackCloud};
//! use cirrus_converge::{converge, FlavorSpec};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cloud = OpenStackCloud::connect(&CloudConfig::from_env()?).await?;
//!
//! let spec = FlavorSpec {
//!     name: "tiny".to_string(),
//!     ram: Some(1024),
//!     vcpus: Some(1),
//!     disk: Some(10),
//!     ..FlavorSpec::default()
//! };
//! spec.validate()?;
//!
//! let outcome = converge(&cloud, &spec).await?;
//! println!("changed: {}", outcome.changed);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod flavor;
pub mod users;

pub use error::{ConvergeError, Result};
pub use flavor::{
    converge, plan, would_change, FlavorAction, FlavorId, FlavorOutcome, FlavorPlan, FlavorSpec,
    State,
};
pub use users::UserQuery;
