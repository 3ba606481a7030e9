//! Property tests for sequence resolution: dependency respect and
//! determinism over randomly generated step graphs.

use std::sync::Arc;

use proptest::prelude::*;
use trellis_kernel::plugin::PluginInfo;
use trellis_kernel::resolver::{ResolvedSequence, SequenceResolver};
use trellis_kernel::step::OperationStep;

/// Builds an acyclic step set from bitmask descriptions: step `i` depends on
/// a subset of earlier steps and reverse-depends on a subset of later ones.
fn build_steps(n: usize, dep_bits: &[u16], rdep_bits: &[u16]) -> Vec<OperationStep> {
    (0..n)
        .map(|i| {
            let deps: Vec<String> = (0..i)
                .filter(|&j| dep_bits[i] & (1u16 << j) != 0)
                .map(|j| format!("s{j}"))
                .collect();
            let rdeps: Vec<String> = (i + 1..n)
                .filter(|&j| rdep_bits[i] & (1u16 << j) != 0)
                .map(|j| format!("s{j}"))
                .collect();
            OperationStep::builder(format!("s{i}"), Arc::new(()))
                .after(deps)
                .before(rdeps)
                .provided_by_info(PluginInfo::new(format!("p{i}"), "1.0.0"))
        })
        .collect()
}

fn resolve(steps: &[OperationStep]) -> ResolvedSequence {
    let mut resolver = SequenceResolver::new("op");
    for step in steps {
        resolver.ingest_step(step.clone());
    }
    resolver.finalize().expect("index-ordered graphs are acyclic")
}

fn position(sequence: &ResolvedSequence, name: &str) -> usize {
    sequence
        .iter()
        .position(|step| step.name() == name)
        .unwrap_or_else(|| panic!("step {name} missing from sequence"))
}

proptest! {
    #[test]
    fn resolved_order_respects_all_constraints(
        n in 1usize..10,
        dep_bits in prop::collection::vec(any::<u16>(), 10),
        rdep_bits in prop::collection::vec(any::<u16>(), 10),
    ) {
        let steps = build_steps(n, &dep_bits, &rdep_bits);
        let sequence = resolve(&steps);

        prop_assert_eq!(sequence.len(), n);
        for step in &steps {
            let own = position(&sequence, step.name());
            for dep in step.dependencies() {
                prop_assert!(position(&sequence, dep) < own, "{dep} must precede {}", step.name());
            }
            for follower in step.reverse_dependencies() {
                prop_assert!(position(&sequence, follower) > own, "{follower} must follow {}", step.name());
            }
        }
    }

    #[test]
    fn resolution_is_reproducible(
        n in 1usize..10,
        dep_bits in prop::collection::vec(any::<u16>(), 10),
        rdep_bits in prop::collection::vec(any::<u16>(), 10),
    ) {
        let steps = build_steps(n, &dep_bits, &rdep_bits);
        let first = resolve(&steps);
        let second = resolve(&steps);
        prop_assert_eq!(first.steps(), second.steps());
    }

    #[test]
    fn dangling_names_never_change_outcomes(
        n in 1usize..8,
        dep_bits in prop::collection::vec(any::<u16>(), 10),
        rdep_bits in prop::collection::vec(any::<u16>(), 10),
    ) {
        let plain = build_steps(n, &dep_bits, &rdep_bits);

        // The same graph with an extra dependency on a name nobody carries.
        let haunted: Vec<OperationStep> = plain
            .iter()
            .map(|step| {
                OperationStep::builder(step.name(), step.payload().clone())
                    .after(step.dependencies().iter().cloned())
                    .after(["ghost"])
                    .before(step.reverse_dependencies().iter().cloned())
                    .provided_by_info(step.plugin().clone())
            })
            .collect();

        let baseline = resolve(&plain);
        let with_ghosts = resolve(&haunted);

        let baseline_names: Vec<&str> = baseline.iter().map(OperationStep::name).collect();
        let ghost_names: Vec<&str> = with_ghosts.iter().map(OperationStep::name).collect();
        prop_assert_eq!(baseline_names, ghost_names);
    }
}
