//! Flavor convergence.
//!
//! Flavors are immutable once created except for extra specs and the
//! description: any difference in the sizing fields can only be resolved
//! by deleting and recreating the flavor under the same name. When the
//! caller did not pin an explicit ID, the recreation reuses the deleted
//! flavor's ID so instances still referencing it stay valid.
//!
//! The decision is split from the execution: [`plan`] is a pure function
//! from desired spec and observed state to an ordered action list, and
//! [`converge`] drives that plan through the [`Cloud`] provider.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use cirrus_cloud::{Cloud, Flavor, FlavorCreate};
use cirrus_core::SpecValue;

use crate::error::{ConvergeError, Result};

/// Desired state selector for a managed resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    /// The resource should exist with the declared fields.
    #[default]
    Present,
    /// The resource should not exist.
    Absent,
}

/// Flavor ID declaration: pin an explicit ID, or let the cloud assign
/// one. The ID is only consulted when the flavor is (re)created.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FlavorId {
    /// Let the cloud assign an ID; on replace, reuse the deleted one.
    #[default]
    Auto,
    /// Create under this exact ID.
    Explicit(String),
}

impl From<String> for FlavorId {
    fn from(value: String) -> Self {
        if value == "auto" {
            Self::Auto
        } else {
            Self::Explicit(value)
        }
    }
}

impl From<FlavorId> for String {
    fn from(id: FlavorId) -> Self {
        match id {
            FlavorId::Auto => "auto".to_string(),
            FlavorId::Explicit(value) => value,
        }
    }
}

/// Declared target configuration for one compute flavor.
///
/// `name` is the immutable lookup key. Sizing fields left unset are not
/// managed: they never trigger a replace, and creation falls back to the
/// documented defaults. `ram`, `vcpus` and `disk` must be set whenever
/// `state` is `present`; [`FlavorSpec::validate`] enforces that before
/// the engine runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlavorSpec {
    /// Desired state, `present` by default.
    #[serde(default)]
    pub state: State,
    /// Flavor name.
    pub name: String,
    /// Memory in MB. Required when `state` is `present`.
    #[serde(default)]
    pub ram: Option<u32>,
    /// Virtual CPU count. Required when `state` is `present`.
    #[serde(default)]
    pub vcpus: Option<u32>,
    /// Root disk in GB.
    #[serde(default = "some_zero")]
    pub disk: Option<u32>,
    /// Ephemeral disk in GB.
    #[serde(default = "some_zero")]
    pub ephemeral: Option<u32>,
    /// Swap in MB.
    #[serde(default = "some_zero")]
    pub swap: Option<u32>,
    /// RX/TX bandwidth scaling factor.
    #[serde(default = "some_rxtx")]
    pub rxtx_factor: Option<f64>,
    /// Whether the flavor is visible to all projects.
    #[serde(default = "some_true")]
    pub is_public: Option<bool>,
    /// ID to create under; `auto` by default.
    #[serde(default)]
    pub id: FlavorId,
    /// Desired extra specs; values are stringified to their canonical
    /// form before comparison and upload.
    #[serde(default)]
    pub extra_specs: BTreeMap<String, SpecValue>,
}

impl Default for FlavorSpec {
    fn default() -> Self {
        Self {
            state: State::Present,
            name: String::new(),
            ram: None,
            vcpus: None,
            disk: Some(0),
            ephemeral: Some(0),
            swap: Some(0),
            rxtx_factor: Some(1.0),
            is_public: Some(true),
            id: FlavorId::Auto,
            extra_specs: BTreeMap::new(),
        }
    }
}

fn some_zero() -> Option<u32> {
    Some(0)
}

fn some_rxtx() -> Option<f64> {
    Some(1.0)
}

fn some_true() -> Option<bool> {
    Some(true)
}

impl FlavorSpec {
    /// Enforce the mandatory-fields rule before planning.
    ///
    /// # Errors
    ///
    /// Returns `ConvergeError::Config` when `state` is `present` and any
    /// of `ram`, `vcpus`, `disk` is unset.
    pub fn validate(&self) -> Result<()> {
        if self.state == State::Present {
            let missing = [
                ("ram", self.ram.is_none()),
                ("vcpus", self.vcpus.is_none()),
                ("disk", self.disk.is_none()),
            ];
            for (field, is_missing) in missing {
                if is_missing {
                    return Err(ConvergeError::Config(format!(
                        "state is 'present' but required field '{field}' is unset"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// A single mutating call the engine has decided to issue.
#[derive(Debug, Clone, PartialEq)]
pub enum FlavorAction {
    /// Delete the observed flavor.
    Delete {
        /// ID of the flavor to delete.
        id: String,
    },
    /// Create a flavor with the resolved field set.
    Create(FlavorCreate),
    /// Remove stale extra-spec keys.
    UnsetExtraSpecs(BTreeSet<String>),
    /// Create or update extra-spec keys with the canonical desired mapping.
    SetExtraSpecs(BTreeMap<String, String>),
}

/// The change decision for one flavor: the flag reported to the caller
/// plus the ordered actions that realize it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlavorPlan {
    /// Whether any mutating call is required.
    pub changed: bool,
    /// Mutating calls, in execution order.
    pub actions: Vec<FlavorAction>,
}

/// Outcome of a converge run.
#[derive(Debug, Clone, Serialize)]
pub struct FlavorOutcome {
    /// Whether any mutating call was issued.
    pub changed: bool,
    /// The final observed flavor; `None` after `state=absent`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flavor: Option<Flavor>,
}

/// Decide what has to change to converge the observed flavor onto the
/// desired spec.
///
/// Pure: issues no remote calls. When present, `observed` must carry its
/// extra specs; the effectful path fetches them together with the flavor.
///
/// # Errors
///
/// Returns `ConvergeError::Config` when a create is required but a
/// mandatory field is unset; running [`FlavorSpec::validate`] first
/// rules this out.
pub fn plan(spec: &FlavorSpec, observed: Option<&Flavor>) -> Result<FlavorPlan> {
    match spec.state {
        State::Absent => Ok(plan_absent(observed)),
        State::Present => plan_present(spec, observed),
    }
}

fn plan_absent(observed: Option<&Flavor>) -> FlavorPlan {
    match observed {
        Some(flavor) => FlavorPlan {
            changed: true,
            actions: vec![FlavorAction::Delete {
                id: flavor.id.clone(),
            }],
        },
        None => FlavorPlan::default(),
    }
}

fn plan_present(spec: &FlavorSpec, observed: Option<&Flavor>) -> Result<FlavorPlan> {
    let mut actions = Vec::new();
    let mut changed = false;

    // The extra-spec diff runs against the observed specs, unless the
    // flavor is (re)created, which starts from an empty set.
    let mut old_specs = BTreeMap::new();
    let mut create_id = match &spec.id {
        FlavorId::Auto => None,
        FlavorId::Explicit(id) => Some(id.clone()),
    };
    let mut surviving = false;

    if let Some(flavor) = observed {
        if needs_replace(spec, flavor) {
            actions.push(FlavorAction::Delete {
                id: flavor.id.clone(),
            });
            // Keep the deleted flavor's ID unless the caller pinned one,
            // so instances referencing it stay valid after recreation.
            if create_id.is_none() {
                create_id = Some(flavor.id.clone());
            }
            changed = true;
        } else {
            old_specs = flavor.extra_specs.clone();
            surviving = true;
        }
    }

    if !surviving {
        actions.push(FlavorAction::Create(create_request(spec, create_id)?));
        changed = true;
    }

    let (new_specs, unset_keys) = extra_specs_diff(&spec.extra_specs, &old_specs);
    if !unset_keys.is_empty() {
        actions.push(FlavorAction::UnsetExtraSpecs(unset_keys));
    }
    if new_specs != old_specs {
        actions.push(FlavorAction::SetExtraSpecs(new_specs));
        changed = true;
    }

    Ok(FlavorPlan { changed, actions })
}

/// True when any explicitly-provided sizing field differs from the
/// observed flavor. Unset fields are unmanaged and never trigger.
#[allow(clippy::float_cmp)] // values pass through untouched, same as remote
fn needs_replace(spec: &FlavorSpec, observed: &Flavor) -> bool {
    spec.ram.is_some_and(|v| v != observed.ram)
        || spec.vcpus.is_some_and(|v| v != observed.vcpus)
        || spec.disk.is_some_and(|v| v != observed.disk)
        || spec.ephemeral.is_some_and(|v| v != observed.ephemeral)
        || spec.swap.is_some_and(|v| v != observed.swap)
        || spec.rxtx_factor.is_some_and(|v| v != observed.rxtx_factor)
        || spec.is_public.is_some_and(|v| v != observed.is_public)
}

/// Canonical desired extra specs plus the old keys to remove.
fn extra_specs_diff(
    desired: &BTreeMap<String, SpecValue>,
    old: &BTreeMap<String, String>,
) -> (BTreeMap<String, String>, BTreeSet<String>) {
    let new_specs = desired
        .iter()
        .map(|(key, value)| (key.clone(), value.canonical()))
        .collect();
    let unset_keys = old
        .keys()
        .filter(|key| !desired.contains_key(*key))
        .cloned()
        .collect();
    (new_specs, unset_keys)
}

fn create_request(spec: &FlavorSpec, id: Option<String>) -> Result<FlavorCreate> {
    let require = |field: &str, value: Option<u32>| {
        value.ok_or_else(|| {
            ConvergeError::Config(format!(
                "cannot create flavor '{}': required field '{field}' is unset",
                spec.name
            ))
        })
    };
    Ok(FlavorCreate {
        name: spec.name.clone(),
        ram: require("ram", spec.ram)?,
        vcpus: require("vcpus", spec.vcpus)?,
        disk: require("disk", spec.disk)?,
        id,
        ephemeral: spec.ephemeral.unwrap_or(0),
        swap: spec.swap.unwrap_or(0),
        rxtx_factor: spec.rxtx_factor.unwrap_or(1.0),
        is_public: spec.is_public.unwrap_or(true),
    })
}

/// Converge one flavor: observe, plan, execute, report.
///
/// Actions execute in plan order through the provider. A remote failure
/// propagates as-is with no rollback; rerunning the invocation
/// re-derives the decision from freshly observed state.
///
/// # Errors
///
/// Returns `ConvergeError::Config` on invalid parameters and
/// `ConvergeError::Cloud` when a remote call fails.
pub async fn converge(cloud: &dyn Cloud, spec: &FlavorSpec) -> Result<FlavorOutcome> {
    spec.validate()?;

    let observed = cloud.find_flavor(&spec.name, true).await?;
    let decision = plan(spec, observed.as_ref())?;
    debug!(
        name = %spec.name,
        changed = decision.changed,
        actions = decision.actions.len(),
        "computed flavor plan"
    );

    let mut flavor = observed;
    for action in &decision.actions {
        match action {
            FlavorAction::Delete { id } => {
                info!(name = %spec.name, id = %id, "deleting flavor");
                cloud.delete_flavor(id).await?;
                flavor = None;
            }
            FlavorAction::Create(create) => {
                info!(name = %spec.name, "creating flavor");
                flavor = Some(cloud.create_flavor(create).await?);
            }
            FlavorAction::UnsetExtraSpecs(keys) => {
                let id = current_id(flavor.as_ref())?;
                info!(name = %spec.name, keys = keys.len(), "unsetting extra specs");
                cloud.unset_flavor_extra_specs(id, keys).await?;
            }
            FlavorAction::SetExtraSpecs(specs) => {
                let id = current_id(flavor.as_ref())?;
                info!(name = %spec.name, keys = specs.len(), "setting extra specs");
                cloud.set_flavor_extra_specs(id, specs).await?;
            }
        }
    }

    // The set/unset calls do not return the updated view.
    if let Some(flavor) = flavor.as_mut() {
        flavor.extra_specs = cloud.fetch_flavor_extra_specs(&flavor.id).await?;
    }

    Ok(FlavorOutcome {
        changed: decision.changed,
        flavor,
    })
}

/// Dry-run: report whether [`converge`] would change anything, issuing
/// no mutating call.
///
/// # Errors
///
/// Returns `ConvergeError::Config` on invalid parameters and
/// `ConvergeError::Cloud` when the observation fails.
pub async fn would_change(cloud: &dyn Cloud, spec: &FlavorSpec) -> Result<bool> {
    spec.validate()?;
    let observed = cloud.find_flavor(&spec.name, true).await?;
    Ok(plan(spec, observed.as_ref())?.changed)
}

fn current_id(flavor: Option<&Flavor>) -> Result<&str> {
    flavor.map(|f| f.id.as_str()).ok_or_else(|| {
        ConvergeError::Internal("extra-spec action planned with no flavor in hand".to_string())
    })
}
