// Copyright (c) Redset Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::copy_scheme::CopyScheme;
use crate::erasure::SchemeHandle;
use crate::kvtree::KVTree;

/// One redundancy descriptor: the result of building a single named entry
/// from the job's redundancy configuration.
///
/// `store_index` and `erasure_scheme` are `Option` rather than the source's
/// `-1` sentinel: `None` means "unbuilt or freed", which a disabled
/// descriptor may legitimately be in if it failed before reaching that
/// step.
#[derive(Debug, Clone)]
pub struct RedDesc {
    pub enabled: bool,
    pub index: usize,
    pub interval: i64,
    pub output: bool,
    pub store_index: Option<usize>,
    pub store_name: String,
    pub directory: String,
    pub copy_type: CopyScheme,
    pub failure_group: String,
    /// The failure-domain identifier computed in builder step 8: the group
    /// leader's world rank (decimal), broadcast to every member of
    /// `failure_group` so they all agree on it. Not part of the serialized
    /// form (§4.2 only lists ENABLED/INTERVAL/OUTPUT/STORE/DIRECTORY/TYPE).
    pub failure_domain_id: String,
    pub erasure_scheme: Option<SchemeHandle>,
}

impl RedDesc {
    /// The zeroed state construction starts from: disabled, no index or
    /// interval assigned yet, no store/group/scheme resolved.
    pub fn zeroed(index: usize) -> Self {
        RedDesc {
            enabled: false,
            index,
            interval: -1,
            output: false,
            store_index: None,
            store_name: String::new(),
            directory: String::new(),
            copy_type: CopyScheme::Single,
            failure_group: String::new(),
            failure_domain_id: String::new(),
            erasure_scheme: None,
        }
    }

    /// A descriptor is usable iff it is enabled, its store resolved, its
    /// erasure scheme built, and the store itself is still enabled.
    pub fn usable(&self, store_registry: &crate::context::StoreRegistry) -> bool {
        self.enabled
            && self.erasure_scheme.is_some()
            && self
                .store_index
                .and_then(|idx| store_registry.get_by_index(idx))
                .map(|store| store.enabled)
                .unwrap_or(false)
    }

    /// Serializes the descriptor to a KV subtree. Runtime-dependent indices
    /// (`index`, `store_index`, failure-group index) are deliberately
    /// omitted — they are not stable across re-runs against a different
    /// StoreRegistry/GroupRegistry.
    pub fn serialize(&self) -> KVTree {
        let mut tree = KVTree::new();
        tree.set_int("ENABLED", self.enabled as i64);
        tree.set_int("INTERVAL", self.interval);
        tree.set_int("OUTPUT", self.output as i64);
        tree.set_str("STORE", &self.store_name);
        tree.set_str("DIRECTORY", &self.directory);
        tree.set_str("TYPE", self.copy_type.as_token());
        tree
    }

    /// Whether this descriptor is eligible for checkpoint `id`.
    pub fn eligible_for(&self, id: i64) -> bool {
        self.enabled && self.interval > 0 && id % self.interval == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_descriptor_is_disabled_with_no_indices() {
        let desc = RedDesc::zeroed(3);
        assert!(!desc.enabled);
        assert_eq!(desc.index, 3);
        assert_eq!(desc.interval, -1);
        assert!(desc.store_index.is_none());
        assert!(desc.erasure_scheme.is_none());
    }

    #[test]
    fn serialize_emits_expected_keys_and_omits_indices() {
        let mut desc = RedDesc::zeroed(0);
        desc.enabled = true;
        desc.interval = 4;
        desc.output = true;
        desc.store_name = "/mnt/ssd".to_string();
        desc.directory = "/mnt/ssd/alice/scr.42".to_string();
        desc.copy_type = CopyScheme::Xor { set_size: 4 };

        let tree = desc.serialize();
        assert_eq!(tree.get_int("ENABLED", 0).unwrap(), 1);
        assert_eq!(tree.get_int("INTERVAL", 0).unwrap(), 4);
        assert_eq!(tree.get_int("OUTPUT", 0).unwrap(), 1);
        assert_eq!(tree.get_str("STORE", "").unwrap(), "/mnt/ssd");
        assert_eq!(tree.get_str("DIRECTORY", "").unwrap(), "/mnt/ssd/alice/scr.42");
        assert_eq!(tree.get_str("TYPE", "").unwrap(), "XOR");
        assert!(tree.get("INDEX").is_none());
        assert!(tree.get("STORE_INDEX").is_none());
    }

    #[test]
    fn eligibility_follows_modulus() {
        let mut desc = RedDesc::zeroed(0);
        desc.enabled = true;
        desc.interval = 4;
        assert!(desc.eligible_for(8));
        assert!(!desc.eligible_for(7));
    }
}
