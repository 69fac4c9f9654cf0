//! # Property-Based Tests
//!
//! Union, idempotence, convergence and removal-safety invariants,
//! checked with proptest over random report collections.

use featgauge_core::registry::RegistryOp;
use featgauge_core::{
    FeatureName, FeatureSet, FeatureUnion, GaugeLifecycle, MemoryRegistry, NodeName, Report,
};
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::BTreeSet;

/// Small alphabet so unions overlap often.
fn feature_name() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "ipv4", "ipv6", "bond", "vlan", "vrf", "lldp", "ovs-bridge", "dhcpv4", "dhcpv6", "static-route",
    ])
    .prop_map(str::to_string)
}

fn report_strategy() -> impl Strategy<Value = Report> {
    ("[a-z]{1,8}", vec(feature_name(), 0..6)).prop_map(|(node, features)| {
        Report::new(
            NodeName::new(node),
            features.into_iter().map(FeatureName::new).collect(),
        )
    })
}

fn union_strategy() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set(feature_name(), 0..8)
}

fn to_feature_set(names: &BTreeSet<String>) -> FeatureSet {
    names.iter().map(|n| FeatureName::new(n.clone())).collect()
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// The computed union is the mathematical set union, without duplicates.
    #[test]
    fn union_equals_set_union(reports in vec(report_strategy(), 0..12)) {
        let expected: BTreeSet<String> = reports
            .iter()
            .flat_map(|r| r.features.iter().map(|f| f.as_str().to_string()))
            .collect();

        let union = FeatureUnion::compute(&reports);

        prop_assert_eq!(union.len(), expected.len());
        prop_assert_eq!(union.to_strings(), expected.into_iter().collect::<Vec<_>>());
    }

    /// Input ordering does not affect the union.
    #[test]
    fn union_is_order_independent(reports in vec(report_strategy(), 0..12)) {
        let mut reversed = reports.clone();
        reversed.reverse();
        for report in &mut reversed {
            report.features.reverse();
        }

        prop_assert_eq!(FeatureUnion::compute(&reports), FeatureUnion::compute(&reversed));
    }

    /// Applying the same union twice removes nothing and leaves the registry as is.
    #[test]
    fn apply_is_idempotent(names in union_strategy()) {
        let registry = MemoryRegistry::new();
        let mut lifecycle = GaugeLifecycle::new();

        let first = lifecycle.apply(to_feature_set(&names), &registry).expect("apply");
        let after_first = registry.active();
        let second = lifecycle.apply(to_feature_set(&names), &registry).expect("apply");

        prop_assert!(first.to_remove.is_empty());
        prop_assert!(second.to_remove.is_empty());
        prop_assert_eq!(registry.active(), after_first);
    }

    /// After any sequence of unions, the registry holds exactly the last one.
    #[test]
    fn registry_converges_to_last_union(unions in vec(union_strategy(), 1..10)) {
        let registry = MemoryRegistry::new();
        let mut lifecycle = GaugeLifecycle::new();

        for names in &unions {
            lifecycle.apply(to_feature_set(names), &registry).expect("apply");
        }

        let last = unions.last().cloned().unwrap_or_default();
        prop_assert_eq!(registry.active(), last.into_iter().collect::<Vec<_>>());
    }

    /// A feature that leaves the union is removed exactly once, during that
    /// transition, and never while it is still in the union.
    #[test]
    fn removal_happens_once_on_leaving(unions in vec(union_strategy(), 2..10)) {
        let registry = MemoryRegistry::new();
        let mut lifecycle = GaugeLifecycle::new();
        let mut previous: BTreeSet<String> = BTreeSet::new();

        for names in &unions {
            let before = registry.operations().len();
            lifecycle.apply(to_feature_set(names), &registry).expect("apply");

            let removed: BTreeSet<String> = registry.operations()[before..]
                .iter()
                .filter_map(|op| match op {
                    RegistryOp::Remove(f) => Some(f.clone()),
                    RegistryOp::Set(_) => None,
                })
                .collect();
            let removals = registry.operations()[before..]
                .iter()
                .filter(|op| matches!(op, RegistryOp::Remove(_)))
                .count();

            let leavers: BTreeSet<String> = previous.difference(names).cloned().collect();
            prop_assert_eq!(&removed, &leavers);
            prop_assert_eq!(removals, leavers.len());
            prop_assert!(removed.is_disjoint(names));

            previous = names.clone();
        }
    }
}
