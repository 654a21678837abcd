use std::fmt;
use tracing::{error, info};

use crate::types::{ResolvedMovie, RunStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Init,
    Extracting,
    CacheScan,
    Resolving,
    Complete,
    Failed,
    TimedOut,
}

impl RunPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunPhase::Complete | RunPhase::Failed | RunPhase::TimedOut)
    }

    pub fn can_transition_to(self, next: RunPhase) -> bool {
        use RunPhase::*;
        match (self, next) {
            (from, _) if from.is_terminal() => false,
            (_, Failed | TimedOut) => true,
            (Init, Extracting)
            | (Extracting, CacheScan)
            | (CacheScan, Resolving)
            | (Resolving, Complete) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunPhase::Init => "init",
            RunPhase::Extracting => "extracting",
            RunPhase::CacheScan => "cache_scan",
            RunPhase::Resolving => "resolving",
            RunPhase::Complete => "complete",
            RunPhase::Failed => "failed",
            RunPhase::TimedOut => "timed_out",
        };
        f.write_str(s)
    }
}

/// Phase and counters of one run, owned by its coordinator.
#[derive(Debug)]
pub struct RunState {
    phase: RunPhase,
    pub total_candidates: usize,
    pub cache_hits: usize,
    pub resolved_fresh: usize,
    pub with_availability: usize,
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

impl RunState {
    pub fn new() -> Self {
        Self {
            phase: RunPhase::Init,
            total_candidates: 0,
            cache_hits: 0,
            resolved_fresh: 0,
            with_availability: 0,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Moves to `next`. A transition the state machine does not allow is
    /// logged and leaves the phase untouched.
    pub fn enter(&mut self, next: RunPhase) {
        if !self.phase.can_transition_to(next) {
            error!(from = %self.phase, to = %next, "Rejected run phase transition");
            return;
        }
        info!(from = %self.phase, to = %next, "Run phase changed");
        self.phase = next;
    }

    pub fn record_cache_hit(&mut self, movie: &ResolvedMovie) {
        self.cache_hits += 1;
        if movie.has_availability() {
            self.with_availability += 1;
        }
    }

    pub fn record_resolved(&mut self, movie: &ResolvedMovie) {
        self.resolved_fresh += 1;
        if movie.has_availability() {
            self.with_availability += 1;
        }
    }

    pub fn stats(&self) -> RunStats {
        RunStats {
            total: self.total_candidates,
            processed: self.cache_hits + self.resolved_fresh,
            cached: self.cache_hits,
            found: self.with_availability,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Provider, ProviderKind};

    #[test]
    fn happy_path_transitions() {
        let mut state = RunState::new();
        for phase in [
            RunPhase::Extracting,
            RunPhase::CacheScan,
            RunPhase::Resolving,
            RunPhase::Complete,
        ] {
            state.enter(phase);
            assert_eq!(state.phase(), phase);
        }
        assert_eq!(state.phase(), RunPhase::Complete);
    }

    #[test]
    fn terminal_phases_are_final() {
        let mut state = RunState::new();
        state.enter(RunPhase::Extracting);
        state.enter(RunPhase::TimedOut);
        state.enter(RunPhase::Failed);
        assert_eq!(state.phase(), RunPhase::TimedOut);
        state.enter(RunPhase::CacheScan);
        assert_eq!(state.phase(), RunPhase::TimedOut);
    }

    #[test]
    fn phases_cannot_be_skipped() {
        let mut state = RunState::new();
        state.enter(RunPhase::Resolving);
        assert_eq!(state.phase(), RunPhase::Init);
        state.enter(RunPhase::Failed);
        assert_eq!(state.phase(), RunPhase::Failed);
    }

    #[test]
    fn stats_count_hits_and_fresh_results() {
        let mut state = RunState::new();
        state.total_candidates = 3;

        let mut available = ResolvedMovie::not_found("Heat");
        available.providers.push(Provider {
            id: 8,
            name: "Netflix".into(),
            region: "US".into(),
            kind: ProviderKind::Stream,
            logo_path: None,
        });

        state.record_cache_hit(&available);
        state.record_resolved(&ResolvedMovie::not_found("Nope"));
        state.record_resolved(&available);

        assert_eq!(
            state.stats(),
            RunStats {
                total: 3,
                processed: 3,
                cached: 1,
                found: 2
            }
        );
    }
}
