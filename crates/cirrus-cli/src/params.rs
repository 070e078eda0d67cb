//! Argument surfaces for the resource subcommands.
//!
//! Each subcommand maps its flags onto the engine's parameter struct,
//! applying the documented defaults and validating before anything
//! touches the cloud.

use std::collections::BTreeMap;

use anyhow::{bail, Context};
use clap::{Args, ValueEnum};

use cirrus_converge::{FlavorId, FlavorSpec, State, UserQuery};
use cirrus_core::{FilterValue, Filters, SpecValue};

/// Desired state choices.
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum StateArg {
    /// The resource should exist.
    Present,
    /// The resource should not exist.
    Absent,
}

impl From<StateArg> for State {
    fn from(value: StateArg) -> Self {
        match value {
            StateArg::Present => Self::Present,
            StateArg::Absent => Self::Absent,
        }
    }
}

impl std::fmt::Display for StateArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Present => write!(f, "present"),
            Self::Absent => write!(f, "absent"),
        }
    }
}

/// Arguments for `cirrus flavor`.
#[derive(Args, Debug)]
pub struct FlavorArgs {
    /// Desired state of the flavor.
    #[arg(long, value_enum, default_value_t = StateArg::Present)]
    pub state: StateArg,

    /// Flavor name.
    #[arg(long)]
    pub name: String,

    /// Memory in MB. Required when state is 'present'.
    #[arg(long)]
    pub ram: Option<u32>,

    /// Virtual CPU count. Required when state is 'present'.
    #[arg(long)]
    pub vcpus: Option<u32>,

    /// Root disk in GB.
    #[arg(long, default_value_t = 0)]
    pub disk: u32,

    /// Ephemeral disk in GB.
    #[arg(long, default_value_t = 0)]
    pub ephemeral: u32,

    /// Swap in MB.
    #[arg(long, default_value_t = 0)]
    pub swap: u32,

    /// RX/TX bandwidth scaling factor.
    #[arg(long, default_value_t = 1.0)]
    pub rxtx_factor: f64,

    /// Whether the flavor is visible to all projects.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub is_public: bool,

    /// Flavor ID to create under; 'auto' lets the cloud assign one.
    /// Only consulted when the flavor is first created.
    #[arg(long, visible_alias = "flavorid", default_value = "auto")]
    pub id: String,

    /// Extra-spec entry as KEY=VALUE; repeatable. Values parse as
    /// scalars (5000, false) and fall back to strings.
    #[arg(long = "extra-spec", value_name = "KEY=VALUE")]
    pub extra_specs: Vec<String>,

    /// Compute and report the change decision without mutating anything.
    #[arg(long)]
    pub check: bool,
}

impl FlavorArgs {
    /// Assemble and validate the engine spec.
    pub fn into_spec(self) -> anyhow::Result<FlavorSpec> {
        let mut extra_specs = BTreeMap::new();
        for entry in &self.extra_specs {
            let (key, value) = split_pair(entry).context("parsing --extra-spec")?;
            extra_specs.insert(key.to_string(), SpecValue::from_literal(value));
        }

        let spec = FlavorSpec {
            state: self.state.into(),
            name: self.name,
            ram: self.ram,
            vcpus: self.vcpus,
            disk: Some(self.disk),
            ephemeral: Some(self.ephemeral),
            swap: Some(self.swap),
            rxtx_factor: Some(self.rxtx_factor),
            is_public: Some(self.is_public),
            id: FlavorId::from(self.id),
            extra_specs,
        };
        spec.validate()?;
        Ok(spec)
    }
}

/// Arguments for `cirrus user-info`.
#[derive(Args, Debug)]
pub struct UserInfoArgs {
    /// Name or ID of the user.
    #[arg(long)]
    pub name: Option<String>,

    /// Name or ID of the domain containing the user.
    #[arg(long)]
    pub domain: Option<String>,

    /// Attribute filter as KEY=VALUE; repeatable.
    #[arg(long = "filter", value_name = "KEY=VALUE")]
    pub filters: Vec<String>,

    /// Attribute filters as a JSON object; submaps match nested
    /// attributes. Merged over any --filter entries.
    #[arg(long, value_name = "JSON")]
    pub filters_json: Option<String>,
}

impl UserInfoArgs {
    /// Assemble the engine query.
    pub fn into_query(self) -> anyhow::Result<UserQuery> {
        let mut filters = Filters::new();
        for entry in &self.filters {
            let (key, value) = split_pair(entry).context("parsing --filter")?;
            filters.insert(
                key.to_string(),
                FilterValue::Scalar(SpecValue::from_literal(value)),
            );
        }
        if let Some(raw) = &self.filters_json {
            let nested: Filters = serde_json::from_str(raw).context("parsing --filters-json")?;
            filters.extend(nested);
        }

        Ok(UserQuery {
            name: self.name,
            domain: self.domain,
            filters,
        })
    }
}

fn split_pair(entry: &str) -> anyhow::Result<(&str, &str)> {
    match entry.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key, value)),
        _ => bail!("expected KEY=VALUE, got '{entry}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flavor_args(extra: &[&str]) -> FlavorArgs {
        FlavorArgs {
            state: StateArg::Present,
            name: "tiny".to_string(),
            ram: Some(1024),
            vcpus: Some(1),
            disk: 10,
            ephemeral: 0,
            swap: 0,
            rxtx_factor: 1.0,
            is_public: true,
            id: "auto".to_string(),
            extra_specs: extra.iter().map(ToString::to_string).collect(),
            check: false,
        }
    }

    #[test]
    fn spec_assembly_applies_defaults() {
        let spec = flavor_args(&[]).into_spec().unwrap();
        assert_eq!(spec.name, "tiny");
        assert_eq!(spec.disk, Some(10));
        assert_eq!(spec.swap, Some(0));
        assert_eq!(spec.id, FlavorId::Auto);
    }

    #[test]
    fn extra_spec_literals_infer_scalars() {
        let spec = flavor_args(&[
            "quota:disk_read_iops_sec=5000",
            "aggregate_instance_extra_specs:pinned=false",
            "hw:cpu_policy=dedicated",
        ])
        .into_spec()
        .unwrap();

        assert_eq!(
            spec.extra_specs.get("quota:disk_read_iops_sec"),
            Some(&SpecValue::Int(5000))
        );
        assert_eq!(
            spec.extra_specs
                .get("aggregate_instance_extra_specs:pinned"),
            Some(&SpecValue::Bool(false))
        );
        assert_eq!(
            spec.extra_specs.get("hw:cpu_policy"),
            Some(&SpecValue::Str("dedicated".to_string()))
        );
    }

    #[test]
    fn malformed_extra_spec_is_rejected() {
        let err = flavor_args(&["no-equals-sign"]).into_spec().unwrap_err();
        assert!(err.to_string().contains("--extra-spec"));
    }

    #[test]
    fn missing_ram_is_rejected_up_front() {
        let mut args = flavor_args(&[]);
        args.ram = None;
        assert!(args.into_spec().is_err());
    }

    #[test]
    fn explicit_id_survives_assembly() {
        let mut args = flavor_args(&[]);
        args.id = "42".to_string();
        let spec = args.into_spec().unwrap();
        assert_eq!(spec.id, FlavorId::Explicit("42".to_string()));
    }

    #[test]
    fn filters_merge_flags_and_json() {
        let args = UserInfoArgs {
            name: Some("demouser".to_string()),
            domain: None,
            filters: vec!["is_enabled=false".to_string()],
            filters_json: Some(r#"{"links": {"self": "http://example"}}"#.to_string()),
        };
        let query = args.into_query().unwrap();
        assert_eq!(query.filters.len(), 2);
        assert_eq!(
            query.filters.get("is_enabled"),
            Some(&FilterValue::Scalar(SpecValue::Bool(false)))
        );
        assert!(matches!(
            query.filters.get("links"),
            Some(&FilterValue::Map(_))
        ));
    }

    #[test]
    fn bad_filters_json_is_rejected() {
        let args = UserInfoArgs {
            name: None,
            domain: None,
            filters: Vec::new(),
            filters_json: Some("{not json".to_string()),
        };
        assert!(args.into_query().is_err());
    }
}
