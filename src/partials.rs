//! Partial compression engine
//!
//! Compression walks a macro's steps left to right and replaces the first
//! catalog partial (in catalog order) whose commands match the steps at the
//! current position with a single reference. Matching is first-fit, not
//! longest-fit: catalog order is user-controlled and acts as priority.
//! A run only matches when every step also carries the partial's delay, since
//! a reference cannot hold per-step timing.
//!
//! Expansion is the inverse and runs before anything is written to the pedal.

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::model::{Macro, MidiStep, Partial, StepKind};

/// Replace runs matching catalog partials with references
pub fn compress(steps: &[MidiStep], catalog: &[Partial]) -> Vec<MidiStep> {
    let mut out = Vec::with_capacity(steps.len());
    let mut pos = 0;

    while pos < steps.len() {
        let remaining = &steps[pos..];
        let hit = catalog.iter().find(|partial| matches_at(remaining, partial));

        match hit {
            Some(partial) => {
                debug!(
                    "Compressed {} steps at {} into partial '{}'",
                    partial.steps.len(),
                    pos,
                    partial.name
                );
                out.push(MidiStep::partial_ref(&partial.id, &partial.name));
                pos += partial.steps.len();
            }
            None => {
                out.push(steps[pos].clone());
                pos += 1;
            }
        }
    }

    out
}

fn matches_at(remaining: &[MidiStep], partial: &Partial) -> bool {
    let len = partial.steps.len();
    if len == 0 || len > remaining.len() || !partial.is_raw() {
        return false;
    }
    remaining[..len]
        .iter()
        .zip(&partial.steps)
        .all(|(step, command)| step.same_command(command) && step.delay_ms == command.delay_ms)
}

/// Replace references with their partial's commands; unknown references are dropped
pub fn expand(steps: &[MidiStep], catalog: &[Partial]) -> Vec<MidiStep> {
    expand_reporting(steps, catalog).0
}

/// Like [`expand`], also returning the ids of references that could not be resolved
pub fn expand_reporting(steps: &[MidiStep], catalog: &[Partial]) -> (Vec<MidiStep>, Vec<String>) {
    let by_id: HashMap<&str, &Partial> = catalog.iter().map(|p| (p.id.as_str(), p)).collect();
    let mut out = Vec::with_capacity(steps.len());
    let mut dangling = Vec::new();

    for step in steps {
        match &step.kind {
            StepKind::Partial { partial_id, name } => match by_id.get(partial_id.as_str()) {
                Some(partial) if partial.is_raw() => {
                    out.extend(partial.steps.iter().map(MidiStep::fresh_copy));
                }
                _ => {
                    warn!(
                        "Dropping reference to unknown partial '{}' ({})",
                        name, partial_id
                    );
                    dangling.push(partial_id.clone());
                }
            },
            _ => out.push(step.clone()),
        }
    }

    (out, dangling)
}

/// Delete a partial from the catalog and strip references to it from macros.
///
/// Other partials are never touched. Returns `false` if the id was unknown.
pub fn remove_partial(catalog: &mut Vec<Partial>, macros: &mut [Macro], partial_id: &str) -> bool {
    let before = catalog.len();
    catalog.retain(|p| p.id != partial_id);
    if catalog.len() == before {
        return false;
    }

    for m in macros.iter_mut() {
        let count = m.steps.len();
        m.steps.retain(|step| {
            !matches!(&step.kind, StepKind::Partial { partial_id: id, .. } if id == partial_id)
        });
        if m.steps.len() != count {
            debug!(
                "Removed {} reference(s) to partial {} from macro '{}'",
                count - m.steps.len(),
                partial_id,
                m.name
            );
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn partial(id: &str, steps: Vec<MidiStep>) -> Partial {
        Partial::new(id, id.to_uppercase(), steps).unwrap()
    }

    fn ref_id(step: &MidiStep) -> Option<&str> {
        match &step.kind {
            StepKind::Partial { partial_id, .. } => Some(partial_id),
            _ => None,
        }
    }

    #[test]
    fn test_greedy_single_step_partial() {
        let steps = vec![MidiStep::cc(1, 10, 64), MidiStep::cc(1, 10, 64), MidiStep::pc(1, 5)];
        let catalog = vec![partial("p1", vec![MidiStep::cc(1, 10, 64)])];

        let compressed = compress(&steps, &catalog);

        assert_eq!(compressed.len(), 3);
        assert_eq!(ref_id(&compressed[0]), Some("p1"));
        assert_eq!(ref_id(&compressed[1]), Some("p1"));
        assert!(compressed[2].same_command(&MidiStep::pc(1, 5)));
    }

    #[test]
    fn test_first_catalog_entry_wins_over_longer() {
        let a = MidiStep::cc(1, 1, 1);
        let b = MidiStep::cc(1, 2, 2);
        let steps = vec![a.clone(), b.clone()];

        let short_first = vec![
            partial("short", vec![a.clone()]),
            partial("long", vec![a.clone(), b.clone()]),
        ];
        let compressed = compress(&steps, &short_first);
        assert_eq!(compressed.len(), 2);
        assert_eq!(ref_id(&compressed[0]), Some("short"));
        assert!(compressed[1].same_command(&b));

        let long_first = vec![partial("long", vec![a.clone(), b.clone()]), partial("short", vec![a])];
        let compressed = compress(&steps, &long_first);
        assert_eq!(compressed.len(), 1);
        assert_eq!(ref_id(&compressed[0]), Some("long"));
    }

    #[test]
    fn test_delayed_steps_keep_their_timing() {
        let steps = vec![MidiStep::cc(1, 10, 64).with_delay(250), MidiStep::pc(1, 5)];
        let catalog = vec![partial("p1", vec![MidiStep::cc(1, 10, 64)])];

        let compressed = compress(&steps, &catalog);
        assert_eq!(ref_id(&compressed[0]), None);

        let round_trip = expand(&compressed, &catalog);
        assert_eq!(round_trip[0].delay_ms, Some(250));
    }

    #[test]
    fn test_matching_delay_compresses() {
        let steps = vec![MidiStep::cc(1, 10, 64).with_delay(250)];
        let catalog = vec![partial("p1", vec![MidiStep::cc(1, 10, 64).with_delay(250)])];

        let compressed = compress(&steps, &catalog);
        assert_eq!(ref_id(&compressed[0]), Some("p1"));
        assert_eq!(expand(&compressed, &catalog)[0].delay_ms, Some(250));
    }

    #[test]
    fn test_partial_longer_than_remaining_is_skipped() {
        let steps = vec![MidiStep::cc(1, 1, 1)];
        let catalog = vec![partial("p", vec![MidiStep::cc(1, 1, 1), MidiStep::cc(1, 1, 2)])];
        let compressed = compress(&steps, &catalog);
        assert_eq!(ref_id(&compressed[0]), None);
    }

    #[test]
    fn test_empty_partial_never_matches() {
        let steps = vec![MidiStep::pc(2, 7)];
        let catalog = vec![partial("empty", vec![])];
        assert_eq!(compress(&steps, &catalog).len(), 1);
        assert_eq!(ref_id(&compress(&steps, &catalog)[0]), None);
    }

    #[test]
    fn test_expand_replaces_with_fresh_identities() {
        let catalog = vec![partial("p1", vec![MidiStep::cc(1, 10, 64), MidiStep::pc(1, 3)])];
        let steps = vec![MidiStep::partial_ref("p1", "P1"), MidiStep::cc(2, 2, 2)];

        let expanded = expand(&steps, &catalog);

        assert_eq!(expanded.len(), 3);
        assert!(expanded[0].same_command(&catalog[0].steps[0]));
        assert_ne!(expanded[0].id, catalog[0].steps[0].id);
        assert!(expanded[2].same_command(&MidiStep::cc(2, 2, 2)));
    }

    #[test]
    fn test_expand_drops_dangling_references() {
        let steps = vec![MidiStep::partial_ref("gone", "Gone"), MidiStep::pc(1, 1)];
        let (expanded, dangling) = expand_reporting(&steps, &[]);
        assert_eq!(expanded.len(), 1);
        assert_eq!(dangling, vec!["gone".to_string()]);
    }

    #[test]
    fn test_remove_partial_strips_references_only() {
        let mut catalog = vec![
            partial("p1", vec![MidiStep::cc(1, 1, 1)]),
            partial("p2", vec![MidiStep::cc(1, 2, 2)]),
        ];
        let mut macros = vec![Macro::new(
            0,
            "Chorus",
            vec![
                MidiStep::partial_ref("p1", "P1"),
                MidiStep::partial_ref("p2", "P2"),
                MidiStep::pc(1, 9),
            ],
        )
        .unwrap()];

        assert!(remove_partial(&mut catalog, &mut macros, "p1"));
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].steps.len(), 1);
        assert_eq!(macros[0].steps.len(), 2);
        assert_eq!(ref_id(&macros[0].steps[0]), Some("p2"));

        assert!(!remove_partial(&mut catalog, &mut macros, "p1"));
    }

    fn arb_step() -> impl Strategy<Value = MidiStep> {
        let kind = prop_oneof![
            (1u8..=2, 0u8..=2, 0u8..=2).prop_map(|(c, n, v)| MidiStep::cc(c, n, v)),
            (1u8..=2, 0u8..=2).prop_map(|(c, p)| MidiStep::pc(c, p)),
            proptest::collection::vec(0u8..=2, 1..3).prop_map(MidiStep::custom),
        ];
        (kind, proptest::option::of(prop_oneof![Just(10u32), Just(250u32)])).prop_map(
            |(step, delay)| match delay {
                Some(ms) => step.with_delay(ms),
                None => step,
            },
        )
    }

    proptest! {
        #[test]
        fn prop_expand_inverts_compress(
            steps in proptest::collection::vec(arb_step(), 0..24),
            groups in proptest::collection::vec(proptest::collection::vec(arb_step(), 1..4), 0..4),
        ) {
            let catalog: Vec<Partial> = groups
                .into_iter()
                .enumerate()
                .map(|(i, g)| partial(&format!("p{}", i), g))
                .collect();

            let round_trip = expand(&compress(&steps, &catalog), &catalog);

            prop_assert_eq!(round_trip.len(), steps.len());
            for (a, b) in round_trip.iter().zip(&steps) {
                prop_assert_eq!(&a.kind, &b.kind);
                prop_assert_eq!(a.delay_ms, b.delay_ms);
            }
        }
    }
}
