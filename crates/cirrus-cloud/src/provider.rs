//! The cloud provider boundary.
//!
//! The [`Cloud`] trait enumerates every remote call the convergence
//! engines are allowed to make. The REST implementation lives in
//! [`crate::rest`]; an in-memory mock for tests lives in [`mock`].

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;

use cirrus_core::Filters;

use crate::error::Result;
use crate::types::{Domain, Flavor, FlavorCreate, User};

/// An authenticated handle to the cloud APIs.
///
/// Implementations own credentials, transport, and timeouts. Callers own
/// nothing across invocations: convergence re-observes state fresh on
/// every run.
#[async_trait]
pub trait Cloud: Send + Sync {
    /// Look up a flavor by exact name.
    ///
    /// Returns `Ok(None)` when no flavor carries the name. With
    /// `with_extra_specs`, the returned flavor has its extra specs
    /// populated via the secondary lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing or the extra-spec fetch fails.
    async fn find_flavor(&self, name: &str, with_extra_specs: bool) -> Result<Option<Flavor>>;

    /// Create a flavor and return the observed resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote rejects the creation.
    async fn create_flavor(&self, create: &FlavorCreate) -> Result<Flavor>;

    /// Delete a flavor by ID.
    ///
    /// Deleting an already-absent flavor is not an error: convergence is
    /// at-least-once against concurrent external runs.
    ///
    /// # Errors
    ///
    /// Returns an error for any remote failure other than absence.
    async fn delete_flavor(&self, id: &str) -> Result<()>;

    /// Create or update extra-spec keys on a flavor.
    ///
    /// Keys absent from `specs` are left untouched; removal goes through
    /// [`Cloud::unset_flavor_extra_specs`].
    ///
    /// # Errors
    ///
    /// Returns an error if the remote rejects the update.
    async fn set_flavor_extra_specs(
        &self,
        id: &str,
        specs: &BTreeMap<String, String>,
    ) -> Result<()>;

    /// Remove the given extra-spec keys from a flavor.
    ///
    /// # Errors
    ///
    /// Returns an error if a removal fails for a reason other than the
    /// key already being gone.
    async fn unset_flavor_extra_specs(&self, id: &str, keys: &BTreeSet<String>) -> Result<()>;

    /// Fetch the current extra specs of a flavor.
    ///
    /// The set/unset calls do not return the updated view; callers
    /// refetch through this before reporting.
    ///
    /// # Errors
    ///
    /// Returns an error if the flavor does not exist or the fetch fails.
    async fn fetch_flavor_extra_specs(&self, id: &str) -> Result<BTreeMap<String, String>>;

    /// Resolve a domain by name or ID.
    ///
    /// Returns `Ok(None)` when nothing matches.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup itself fails.
    async fn find_domain(&self, name_or_id: &str) -> Result<Option<Domain>>;

    /// Search users, optionally narrowed by name-or-ID, attribute
    /// filters, and owning domain.
    ///
    /// The filter mapping supports nested submaps for matching nested
    /// attributes. An empty result is a success, never an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    async fn search_users(
        &self,
        name_or_id: Option<&str>,
        filters: &Filters,
        domain_id: Option<&str>,
    ) -> Result<Vec<User>>;
}

/// An in-memory cloud for testing without a real deployment.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::{
        async_trait, BTreeMap, BTreeSet, Cloud, Domain, Filters, Flavor, FlavorCreate, Result,
        User,
    };
    use parking_lot::Mutex;

    use crate::error::CloudError;
    use crate::filter;

    /// A mutating call recorded by [`MockCloud`].
    #[derive(Debug, Clone, PartialEq)]
    pub enum CloudCall {
        /// `create_flavor` was invoked with this request.
        CreateFlavor(FlavorCreate),
        /// `delete_flavor` was invoked for this ID.
        DeleteFlavor(String),
        /// `set_flavor_extra_specs` was invoked for this ID and mapping.
        SetExtraSpecs(String, BTreeMap<String, String>),
        /// `unset_flavor_extra_specs` was invoked for this ID and key set.
        UnsetExtraSpecs(String, BTreeSet<String>),
    }

    /// A mock cloud that stores resources in memory and records every
    /// mutating call for assertions.
    #[derive(Default)]
    pub struct MockCloud {
        state: Mutex<State>,
    }

    #[derive(Default)]
    struct State {
        flavors: Vec<Flavor>,
        users: Vec<User>,
        domains: Vec<Domain>,
        calls: Vec<CloudCall>,
        user_searches: usize,
        next_id: u32,
    }

    impl MockCloud {
        /// Create an empty mock cloud.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Seed an observed flavor.
        pub fn add_flavor(&self, flavor: Flavor) {
            self.state.lock().flavors.push(flavor);
        }

        /// Seed an observed user.
        pub fn add_user(&self, user: User) {
            self.state.lock().users.push(user);
        }

        /// Seed an observed domain.
        pub fn add_domain(&self, domain: Domain) {
            self.state.lock().domains.push(domain);
        }

        /// All mutating calls issued so far, in order.
        #[must_use]
        pub fn calls(&self) -> Vec<CloudCall> {
            self.state.lock().calls.clone()
        }

        /// Number of flavors currently stored.
        #[must_use]
        pub fn flavor_count(&self) -> usize {
            self.state.lock().flavors.len()
        }

        /// Number of `search_users` invocations so far.
        #[must_use]
        pub fn user_search_count(&self) -> usize {
            self.state.lock().user_searches
        }

        /// The stored flavor with the given name, if any.
        #[must_use]
        pub fn get_flavor(&self, name: &str) -> Option<Flavor> {
            self.state
                .lock()
                .flavors
                .iter()
                .find(|f| f.name == name)
                .cloned()
        }
    }

    #[async_trait]
    impl Cloud for MockCloud {
        async fn find_flavor(&self, name: &str, with_extra_specs: bool) -> Result<Option<Flavor>> {
            let state = self.state.lock();
            Ok(state.flavors.iter().find(|f| f.name == name).map(|f| {
                let mut flavor = f.clone();
                if !with_extra_specs {
                    flavor.extra_specs.clear();
                }
                flavor
            }))
        }

        async fn create_flavor(&self, create: &FlavorCreate) -> Result<Flavor> {
            let mut state = self.state.lock();
            state.calls.push(CloudCall::CreateFlavor(create.clone()));

            let id = match create.id.clone() {
                Some(id) => id,
                None => {
                    state.next_id += 1;
                    format!("flavor-{}", state.next_id)
                }
            };
            let flavor = Flavor {
                id,
                name: create.name.clone(),
                ram: create.ram,
                vcpus: create.vcpus,
                disk: create.disk,
                ephemeral: create.ephemeral,
                swap: create.swap,
                rxtx_factor: create.rxtx_factor,
                is_public: create.is_public,
                ..Flavor::default()
            };
            state.flavors.push(flavor.clone());
            Ok(flavor)
        }

        async fn delete_flavor(&self, id: &str) -> Result<()> {
            let mut state = self.state.lock();
            state.calls.push(CloudCall::DeleteFlavor(id.to_string()));
            state.flavors.retain(|f| f.id != id);
            Ok(())
        }

        async fn set_flavor_extra_specs(
            &self,
            id: &str,
            specs: &BTreeMap<String, String>,
        ) -> Result<()> {
            let mut state = self.state.lock();
            state
                .calls
                .push(CloudCall::SetExtraSpecs(id.to_string(), specs.clone()));
            let flavor = state
                .flavors
                .iter_mut()
                .find(|f| f.id == id)
                .ok_or_else(|| CloudError::Api {
                    status: 404,
                    message: format!("flavor {id} not found"),
                })?;
            flavor
                .extra_specs
                .extend(specs.iter().map(|(k, v)| (k.clone(), v.clone())));
            Ok(())
        }

        async fn unset_flavor_extra_specs(&self, id: &str, keys: &BTreeSet<String>) -> Result<()> {
            let mut state = self.state.lock();
            state
                .calls
                .push(CloudCall::UnsetExtraSpecs(id.to_string(), keys.clone()));
            let flavor = state
                .flavors
                .iter_mut()
                .find(|f| f.id == id)
                .ok_or_else(|| CloudError::Api {
                    status: 404,
                    message: format!("flavor {id} not found"),
                })?;
            flavor.extra_specs.retain(|k, _| !keys.contains(k));
            Ok(())
        }

        async fn fetch_flavor_extra_specs(&self, id: &str) -> Result<BTreeMap<String, String>> {
            let state = self.state.lock();
            state
                .flavors
                .iter()
                .find(|f| f.id == id)
                .map(|f| f.extra_specs.clone())
                .ok_or_else(|| CloudError::Api {
                    status: 404,
                    message: format!("flavor {id} not found"),
                })
        }

        async fn find_domain(&self, name_or_id: &str) -> Result<Option<Domain>> {
            let state = self.state.lock();
            Ok(state
                .domains
                .iter()
                .find(|d| d.id == name_or_id || d.name == name_or_id)
                .cloned())
        }

        async fn search_users(
            &self,
            name_or_id: Option<&str>,
            filters: &Filters,
            domain_id: Option<&str>,
        ) -> Result<Vec<User>> {
            let mut state = self.state.lock();
            state.user_searches += 1;
            Ok(state
                .users
                .iter()
                .filter(|u| domain_id.map_or(true, |d| u.domain_id.as_deref() == Some(d)))
                .filter(|u| {
                    name_or_id.map_or(true, |key| filter::name_or_id_matches(&u.id, &u.name, key))
                })
                .filter(|u| filter::matches(u, filters))
                .cloned()
                .collect())
        }
    }

}
