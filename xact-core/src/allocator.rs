//! I/O Buffer Allocator (§4.H).
//!
//! Given a data-type id, returns a fresh, independent, zero-initialised
//! [`Buffer`]. We consume the atomic-type dictionary's *contract* only
//! (§1 Deliberately-out-of-scope) — the handful of atomic kinds in
//! [`AtomicType`] stand in for whatever the real numpy-backed dictionary
//! resolves a leaf alias to; compound types nest recursively the same way
//! regardless of how many atomic kinds exist underneath.

use std::collections::HashMap;
use xact_types::{AtomicType, Buffer, CfgError, Config, DataTypeId, DataTypeSpec};

/// Resolves data-type ids to zeroed [`Buffer`]s. Built once per process
/// from the config's `data` section; every subsequent `allocate` call is
/// independent of every other (§4.H: "two calls produce independent
/// buffers").
pub struct BufferAllocator {
    specs: HashMap<DataTypeId, DataTypeSpec>,
}

impl BufferAllocator {
    pub fn from_config(cfg: &Config) -> Result<Self, CfgError> {
        let specs: HashMap<DataTypeId, DataTypeSpec> = cfg
            .data
            .iter()
            .map(|(id, spec)| (id.clone(), spec.clone()))
            .collect();
        let allocator = Self { specs };
        allocator.check_resolvable()?;
        Ok(allocator)
    }

    /// Greedy fixed-point pass (§9, "buffer allocator gap resolution"):
    /// repeatedly try to resolve every type whose dependencies (alias
    /// targets, compound field types) are already known atomic or
    /// resolved-compound kinds. A type that can never join the resolved
    /// set — because it forms a cycle, or names something undefined — is
    /// reported as [`CfgError::UnresolvableDataType`].
    fn check_resolvable(&self) -> Result<(), CfgError> {
        let mut resolved: std::collections::HashSet<&DataTypeId> = std::collections::HashSet::new();
        let mut progressed = true;

        while progressed {
            progressed = false;
            for (id, spec) in &self.specs {
                if resolved.contains(id) {
                    continue;
                }
                if self.dependencies_satisfied(spec, &resolved) {
                    resolved.insert(id);
                    progressed = true;
                }
            }
        }

        for id in self.specs.keys() {
            if !resolved.contains(id) {
                return Err(CfgError::UnresolvableDataType(id.clone()));
            }
        }
        Ok(())
    }

    fn dependencies_satisfied(&self, spec: &DataTypeSpec, resolved: &std::collections::HashSet<&DataTypeId>) -> bool {
        match spec {
            DataTypeSpec::Alias(name) => self.alias_is_known(name, resolved),
            DataTypeSpec::Compound(fields) => fields.values().all(|field_alias| self.alias_is_known(field_alias, resolved)),
        }
    }

    fn alias_is_known(&self, name: &str, resolved: &std::collections::HashSet<&DataTypeId>) -> bool {
        name == "opaque_map"
            || AtomicType::from_alias(name).is_some()
            || self.named(name).map_or(false, |id| resolved.contains(id))
    }

    fn named(&self, alias: &str) -> Option<&DataTypeId> {
        self.specs.keys().find(|id| id.as_str() == alias)
    }

    fn allocate_alias(&self, name: &str) -> Result<Buffer, CfgError> {
        if name == "opaque_map" {
            Ok(Buffer::empty_map())
        } else if let Some(atomic) = AtomicType::from_alias(name) {
            Ok(atomic.zeroed())
        } else if let Some(target_id) = self.named(name) {
            let target_spec = self.specs[target_id].clone();
            self.allocate_spec(&target_spec)
        } else {
            Err(CfgError::other(format!("unresolvable alias '{name}'")))
        }
    }

    /// Allocate a fresh zeroed buffer for `data_type`. Independent of any
    /// previously allocated buffer for the same type.
    pub fn allocate(&self, data_type: &DataTypeId) -> Result<Buffer, CfgError> {
        let spec = self
            .specs
            .get(data_type)
            .ok_or_else(|| CfgError::UnknownDataType(data_type.clone()))?;
        self.allocate_spec(spec)
    }

    fn allocate_spec(&self, spec: &DataTypeSpec) -> Result<Buffer, CfgError> {
        match spec {
            DataTypeSpec::Alias(name) => self.allocate_alias(name),
            DataTypeSpec::Compound(fields) => {
                let mut map = Buffer::empty_map();
                let Buffer::Map(m) = &mut map else { unreachable!() };
                for (field, alias) in fields {
                    m.insert(field.clone(), self.allocate_alias(alias)?);
                }
                Ok(map)
            }
        }
    }
}
