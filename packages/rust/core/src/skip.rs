//! Skip policy: decides whether an entry takes part in a run at all.

use serde::Serialize;

use boardshelf_shared::{CatalogEntry, PipelineState, RunMode};

/// Outcome of the skip check for one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkipDecision {
    pub skip: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl SkipDecision {
    fn process() -> Self {
        Self {
            skip: false,
            reason: None,
        }
    }

    fn skip(reason: &str) -> Self {
        Self {
            skip: true,
            reason: Some(reason.to_string()),
        }
    }
}

/// Decide whether `entry` should be skipped for `mode`.
pub fn should_skip(entry: &CatalogEntry, mode: RunMode, skip_blocked: bool) -> SkipDecision {
    decide(
        entry.state,
        entry.has_rulebook(),
        entry.has_enrichment_signal(),
        mode,
        skip_blocked,
    )
}

/// Skip rules over the raw inputs. First match wins.
pub fn decide(
    state: PipelineState,
    has_rulebook: bool,
    has_enrichment_signal: bool,
    mode: RunMode,
    skip_blocked: bool,
) -> SkipDecision {
    match state {
        PipelineState::Published => return SkipDecision::skip("already published"),
        PipelineState::ReviewPending => return SkipDecision::skip("awaiting review"),
        PipelineState::Generated => return SkipDecision::skip("already generated, needs review"),
        _ => {}
    }

    match mode {
        RunMode::ParseOnly => {
            if state.is_at_least(PipelineState::Parsed) {
                return SkipDecision::skip("already parsed");
            }
            if !has_rulebook {
                return SkipDecision::skip("no rulebook to parse");
            }
        }
        RunMode::GenerateOnly => {
            if state.is_at_least(PipelineState::Generated) {
                return SkipDecision::skip("already generated");
            }
        }
        RunMode::Full | RunMode::FromCurrent => {
            if !has_rulebook && skip_blocked {
                if state.rank() > PipelineState::Enriched.rank() {
                    return SkipDecision::skip("no rulebook URL");
                }
                if state == PipelineState::Imported && !has_enrichment_signal {
                    return SkipDecision::skip("no enrichment data or rulebook");
                }
            }
        }
    }

    SkipDecision::process()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLAGS: [bool; 2] = [false, true];

    #[test]
    fn terminal_states_always_skip() {
        for state in [
            PipelineState::Published,
            PipelineState::ReviewPending,
            PipelineState::Generated,
        ] {
            for mode in RunMode::ALL {
                for rulebook in FLAGS {
                    for signal in FLAGS {
                        for blocked in FLAGS {
                            let decision = decide(state, rulebook, signal, mode, blocked);
                            assert!(decision.skip, "{state} / {mode} must skip");
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn terminal_reasons() {
        let reason = |state| decide(state, true, true, RunMode::Full, true).reason;
        assert_eq!(reason(PipelineState::Published).as_deref(), Some("already published"));
        assert_eq!(reason(PipelineState::ReviewPending).as_deref(), Some("awaiting review"));
        assert_eq!(
            reason(PipelineState::Generated).as_deref(),
            Some("already generated, needs review")
        );
    }

    #[test]
    fn parse_only_rules() {
        for state in PipelineState::ALL {
            for blocked in FLAGS {
                let with_rulebook = decide(state, true, false, RunMode::ParseOnly, blocked);
                let without = decide(state, false, false, RunMode::ParseOnly, blocked);

                if state.is_at_least(PipelineState::Parsed) {
                    assert!(with_rulebook.skip && without.skip, "{state}");
                } else {
                    assert!(!with_rulebook.skip, "{state} with rulebook must run");
                    assert!(without.skip, "{state} without rulebook must skip");
                    assert_eq!(without.reason.as_deref(), Some("no rulebook to parse"));
                }
            }
        }
    }

    #[test]
    fn generate_only_never_skips_below_generated() {
        for state in PipelineState::ALL {
            if state.is_at_least(PipelineState::Generated) {
                continue;
            }
            for rulebook in FLAGS {
                for blocked in FLAGS {
                    let decision = decide(state, rulebook, false, RunMode::GenerateOnly, blocked);
                    assert!(!decision.skip, "{state}");
                }
            }
        }
    }

    #[test]
    fn full_mode_blocked_without_rulebook() {
        let blocked_states = [
            PipelineState::RulebookMissing,
            PipelineState::RulebookReady,
            PipelineState::Parsing,
            PipelineState::Parsed,
            PipelineState::TaxonomyAssigned,
            PipelineState::Generating,
        ];
        for mode in [RunMode::Full, RunMode::FromCurrent] {
            for state in blocked_states {
                for signal in FLAGS {
                    let skipped = decide(state, false, signal, mode, true);
                    assert!(skipped.skip, "{state}");
                    assert_eq!(skipped.reason.as_deref(), Some("no rulebook URL"));

                    // Without skip_blocked the caller accepts a partial run.
                    assert!(!decide(state, false, signal, mode, false).skip);
                    // With a rulebook nothing blocks.
                    assert!(!decide(state, true, signal, mode, true).skip);
                }
            }
        }
    }

    #[test]
    fn full_mode_imported_and_enriched() {
        for mode in [RunMode::Full, RunMode::FromCurrent] {
            let bare = decide(PipelineState::Imported, false, false, mode, true);
            assert!(bare.skip);
            assert_eq!(bare.reason.as_deref(), Some("no enrichment data or rulebook"));
            assert!(!decide(PipelineState::Imported, false, false, mode, false).skip);

            // Enrichment signal alone is enough to process.
            assert!(!decide(PipelineState::Imported, false, true, mode, true).skip);
            assert!(!decide(PipelineState::Imported, true, false, mode, true).skip);

            // Enriched without a rulebook is not blocked.
            for signal in FLAGS {
                assert!(!decide(PipelineState::Enriched, false, signal, mode, true).skip);
            }
        }
    }
}
