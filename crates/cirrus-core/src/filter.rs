//! Nested attribute filter mappings.
//!
//! Resource queries accept a free-form filter mapping: scalar leaves match
//! attribute values, submaps match nested attributes. The matching itself
//! is owned by the cloud provider's search primitive; this module only
//! defines the shape of the mapping.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::scalar::SpecValue;

/// A filter mapping from attribute name to expected value.
pub type Filters = BTreeMap<String, FilterValue>;

/// One filter entry: a scalar leaf or a nested submap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Match the attributes of a nested object.
    Map(BTreeMap<String, FilterValue>),
    /// Match a single attribute value.
    Scalar(SpecValue),
}

impl From<SpecValue> for FilterValue {
    fn from(value: SpecValue) -> Self {
        Self::Scalar(value)
    }
}
