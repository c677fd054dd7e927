//! Property tests for the pure status evaluation.
//!
//! Facts are generated across the whole domain (adapter flag, arbitrary
//! output enumerations with invalid and zero-sized entries, session
//! liveness) and the derived status/mode list is checked against the
//! documented rules.

use std::cmp::Ordering;
use std::collections::HashSet;

use proptest::prelude::*;

use mirrorlink_engine::{evaluate, select_external, ConnectionFacts, ConnectionStatus};
use mirrorlink_platform_core::{rank_modes, Mode, OutputId, OutputInfo};

fn mode_strategy() -> impl Strategy<Value = Mode> {
    // Zero dimensions included on purpose: ranking must drop them.
    (0u32..4000, 0u32..3000, 0u32..241).prop_map(|(w, h, r)| Mode::new(w, h, r))
}

fn output_strategy() -> impl Strategy<Value = OutputInfo> {
    (
        0u32..6,
        any::<bool>(),
        prop::collection::vec(mode_strategy(), 0..6),
    )
        .prop_map(|(id, valid, modes)| OutputInfo {
            id: OutputId(id),
            name: format!("out-{id}"),
            valid,
            current_mode: modes.first().copied().unwrap_or(Mode::new(1920, 1080, 60)),
            supported_modes: modes,
        })
}

fn facts_strategy() -> impl Strategy<Value = ConnectionFacts> {
    (
        any::<bool>(),
        prop::collection::vec(output_strategy(), 0..5),
        any::<bool>(),
    )
        .prop_map(|(adapter_attached, outputs, session_live)| ConnectionFacts {
            adapter_attached,
            outputs,
            session_live,
        })
}

proptest! {
    /// Status follows the fact table: a visible external output decides
    /// between transmitting and ready; otherwise the adapter flag decides
    /// between adapter-connected and disconnected.
    #[test]
    fn status_follows_the_fact_table(facts in facts_strategy()) {
        let eval = evaluate(&facts);
        let has_external = facts.outputs.iter().any(|o| o.is_external());
        let expected = match (has_external, facts.session_live, facts.adapter_attached) {
            (true, true, _) => ConnectionStatus::Transmitting,
            (true, false, _) => ConnectionStatus::ReadyToTransmit,
            (false, _, true) => ConnectionStatus::AdapterConnected,
            (false, _, false) => ConnectionStatus::Disconnected,
        };
        prop_assert_eq!(eval.status, expected);
    }

    /// The chosen external output is always the lowest-id valid
    /// non-primary entry, regardless of enumeration order.
    #[test]
    fn chosen_external_is_the_lowest_id(facts in facts_strategy()) {
        let eval = evaluate(&facts);
        let expected = facts
            .outputs
            .iter()
            .filter(|o| o.is_external())
            .map(|o| o.id)
            .min();
        prop_assert_eq!(eval.external, expected);
    }

    /// The published mode list is exactly the ranking of the chosen
    /// output's supported modes, and empty when no external is visible.
    #[test]
    fn modes_track_the_chosen_output(facts in facts_strategy()) {
        let eval = evaluate(&facts);
        match select_external(&facts.outputs) {
            Some(external) => {
                prop_assert_eq!(eval.modes, rank_modes(&external.supported_modes));
            }
            None => prop_assert!(eval.modes.is_empty()),
        }
    }

    /// Published modes are usable, duplicate-free, and sorted most
    /// capable first.
    #[test]
    fn published_modes_are_usable_unique_and_ordered(facts in facts_strategy()) {
        let eval = evaluate(&facts);
        let mut seen = HashSet::new();
        for mode in &eval.modes {
            prop_assert!(mode.is_usable(), "unusable mode published: {mode}");
            prop_assert!(seen.insert(*mode), "duplicate mode published: {mode}");
        }
        for pair in eval.modes.windows(2) {
            prop_assert!(
                pair[0].capability_cmp(&pair[1]) != Ordering::Greater,
                "mode order violated: {} before {}",
                pair[0],
                pair[1]
            );
        }
    }

    /// Ranking keeps exactly the usable distinct modes of its input.
    #[test]
    fn ranking_preserves_the_usable_mode_set(modes in prop::collection::vec(mode_strategy(), 0..12)) {
        let ranked = rank_modes(&modes);
        let expected: HashSet<Mode> = modes.iter().copied().filter(Mode::is_usable).collect();
        let actual: HashSet<Mode> = ranked.iter().copied().collect();
        prop_assert_eq!(actual, expected);
        prop_assert_eq!(ranked.len(), ranked.iter().collect::<HashSet<_>>().len());
    }

    /// Evaluation is a pure function of the facts.
    #[test]
    fn evaluation_is_repeatable(facts in facts_strategy()) {
        prop_assert_eq!(evaluate(&facts), evaluate(&facts));
    }
}
