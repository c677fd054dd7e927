//! The connection state machine.
//!
//! Status is a pure function of the latest known facts; nothing in the
//! engine advances status by side effect. The driver around [`evaluate`]
//! (the watcher) gathers facts, resolves session teardown when the backing
//! output disappears, and publishes the result with change suppression.

use serde::{Deserialize, Serialize};
use std::fmt;

use mirrorlink_platform_core::{rank_modes, Mode, OutputId, OutputInfo};

/// State of the display-output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// No adapter detected.
    Disconnected,
    /// Adapter detected, but no external output connected to it.
    AdapterConnected,
    /// Adapter and external output detected, ready to start mirroring.
    ReadyToTransmit,
    /// Mirroring to the external output is active.
    Transmitting,
    /// Detection or transmission failed; recovers on the next successful
    /// re-evaluation.
    Error,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::AdapterConnected => "adapter-connected",
            ConnectionStatus::ReadyToTransmit => "ready-to-transmit",
            ConnectionStatus::Transmitting => "transmitting",
            ConnectionStatus::Error => "error",
        };
        f.write_str(name)
    }
}

/// The facts the status is derived from.
#[derive(Debug, Clone)]
pub struct ConnectionFacts {
    /// Whether a matching adapter is currently attached.
    pub adapter_attached: bool,
    /// The platform's current output enumeration, primary included.
    pub outputs: Vec<OutputInfo>,
    /// Whether a capture session is confirmed live.
    pub session_live: bool,
}

/// Result of one evaluation of the facts.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub status: ConnectionStatus,
    /// Ranked, deduplicated modes of the chosen output; empty unless an
    /// external output is visible.
    pub modes: Vec<Mode>,
    /// The chosen external output, when one is visible.
    pub external: Option<OutputId>,
}

/// Pick the external output to drive: the lowest-id valid non-primary
/// entry. Deterministic when several externals are visible.
pub fn select_external(outputs: &[OutputInfo]) -> Option<&OutputInfo> {
    outputs
        .iter()
        .filter(|output| output.is_external())
        .min_by_key(|output| output.id)
}

/// Compute status and mode list from the facts.
pub fn evaluate(facts: &ConnectionFacts) -> Evaluation {
    match select_external(&facts.outputs) {
        Some(external) => {
            let status = if facts.session_live {
                ConnectionStatus::Transmitting
            } else {
                ConnectionStatus::ReadyToTransmit
            };
            Evaluation {
                status,
                modes: rank_modes(&external.supported_modes),
                external: Some(external.id),
            }
        }
        None if facts.adapter_attached => Evaluation {
            status: ConnectionStatus::AdapterConnected,
            modes: Vec::new(),
            external: None,
        },
        None => Evaluation {
            status: ConnectionStatus::Disconnected,
            modes: Vec::new(),
            external: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn external(id: u32, valid: bool, modes: &[Mode]) -> OutputInfo {
        OutputInfo {
            id: OutputId(id),
            name: format!("hdmi-{id}"),
            valid,
            current_mode: modes.first().copied().unwrap_or(Mode::new(1920, 1080, 60)),
            supported_modes: modes.to_vec(),
        }
    }

    fn primary() -> OutputInfo {
        OutputInfo {
            id: OutputId::PRIMARY,
            name: "built-in".to_string(),
            valid: true,
            current_mode: Mode::new(1080, 2400, 120),
            supported_modes: vec![Mode::new(1080, 2400, 120)],
        }
    }

    #[test]
    fn no_adapter_no_output_is_disconnected() {
        let eval = evaluate(&ConnectionFacts {
            adapter_attached: false,
            outputs: vec![primary()],
            session_live: false,
        });
        assert_eq!(eval.status, ConnectionStatus::Disconnected);
        assert!(eval.modes.is_empty());
        assert_eq!(eval.external, None);
    }

    #[test]
    fn adapter_without_output_is_adapter_connected() {
        let eval = evaluate(&ConnectionFacts {
            adapter_attached: true,
            outputs: vec![primary()],
            session_live: false,
        });
        assert_eq!(eval.status, ConnectionStatus::AdapterConnected);
        assert!(eval.modes.is_empty());
    }

    #[test]
    fn valid_external_output_is_ready_to_transmit() {
        let modes = [Mode::new(1920, 1080, 60), Mode::new(3840, 2160, 30)];
        let eval = evaluate(&ConnectionFacts {
            adapter_attached: true,
            outputs: vec![primary(), external(2, true, &modes)],
            session_live: false,
        });
        assert_eq!(eval.status, ConnectionStatus::ReadyToTransmit);
        assert_eq!(eval.external, Some(OutputId(2)));
        assert_eq!(
            eval.modes,
            vec![Mode::new(3840, 2160, 30), Mode::new(1920, 1080, 60)]
        );
    }

    #[test]
    fn live_session_makes_status_transmitting() {
        let eval = evaluate(&ConnectionFacts {
            adapter_attached: true,
            outputs: vec![primary(), external(2, true, &[Mode::new(1920, 1080, 60)])],
            session_live: true,
        });
        assert_eq!(eval.status, ConnectionStatus::Transmitting);
    }

    #[test]
    fn invalid_external_counts_as_absent() {
        let eval = evaluate(&ConnectionFacts {
            adapter_attached: true,
            outputs: vec![primary(), external(2, false, &[Mode::new(1920, 1080, 60)])],
            session_live: false,
        });
        assert_eq!(eval.status, ConnectionStatus::AdapterConnected);
        assert!(eval.modes.is_empty());
    }

    #[test]
    fn external_output_without_adapter_still_wins() {
        // An output visible with the adapter fact lagging behind must
        // still report ready; the output is the stronger signal.
        let eval = evaluate(&ConnectionFacts {
            adapter_attached: false,
            outputs: vec![primary(), external(3, true, &[Mode::new(1280, 720, 60)])],
            session_live: false,
        });
        assert_eq!(eval.status, ConnectionStatus::ReadyToTransmit);
    }

    #[test]
    fn tie_break_picks_lowest_id_external() {
        let a = external(5, true, &[Mode::new(1280, 720, 60)]);
        let b = external(2, true, &[Mode::new(1920, 1080, 60)]);
        let eval = evaluate(&ConnectionFacts {
            adapter_attached: true,
            outputs: vec![primary(), a, b],
            session_live: false,
        });
        assert_eq!(eval.external, Some(OutputId(2)));
        assert_eq!(eval.modes, vec![Mode::new(1920, 1080, 60)]);
    }

    #[test]
    fn evaluation_is_pure_and_repeatable() {
        let facts = ConnectionFacts {
            adapter_attached: true,
            outputs: vec![primary(), external(2, true, &[Mode::new(1920, 1080, 60)])],
            session_live: false,
        };
        assert_eq!(evaluate(&facts), evaluate(&facts));
    }
}
