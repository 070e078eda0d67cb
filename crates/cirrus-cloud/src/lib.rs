//! OpenStack connection provider for cirrus.
//!
//! This crate owns the boundary to the remote cloud. It provides the
//! [`Cloud`] trait enumerating every call the convergence engines make,
//! the [`OpenStackCloud`] REST implementation (Keystone v3 password
//! authentication, Nova flavors, Keystone users and domains), and the
//! resource types observed on the wire.
//!
//! # Example
//!
//! ```no_run
//! use cirrus_cloud::{Cloud, CloudConfig, OpenStackCloud};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CloudConfig::from_env()?;
//! let cloud = OpenStackCloud::connect(&config).await?;
//!
//! if let Some(flavor) = cloud.find_flavor("tiny", true).await? {
//!     println!("{} has {} MB RAM", flavor.name, flavor.ram);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Testing
//!
//! For testing without a real cloud, enable the `test-utils` feature and
//! use the in-memory mock:
//!
//! ```ignore
//! use cirrus_cloud::{Cloud, MockCloud};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cloud = MockCloud::new();
//! assert!(cloud.find_flavor("tiny", true).await?.is_none());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod filter;
pub mod provider;
pub mod rest;
pub mod types;

pub use config::CloudConfig;
pub use error::{CloudError, Result};
pub use provider::Cloud;
pub use rest::OpenStackCloud;
pub use types::{Domain, Flavor, FlavorCreate, User};

#[cfg(any(test, feature = "test-utils"))]
pub use provider::mock;
#[cfg(any(test, feature = "test-utils"))]
pub use provider::mock::MockCloud;
