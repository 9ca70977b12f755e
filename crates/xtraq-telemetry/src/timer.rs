//! Phase timing helper used by the orchestrator to build a `RunTelemetry`
//! document without scattering `Instant::now()` calls through its body.

use std::time::Instant;

use crate::model::PhaseTiming;

pub struct PhaseTimer {
    phases: Vec<PhaseTiming>,
    current: Option<(String, Instant)>,
}

impl PhaseTimer {
    pub fn new() -> Self {
        PhaseTimer {
            phases: Vec::new(),
            current: None,
        }
    }

    /// Closes out whatever phase was open and starts a new one.
    pub fn start(&mut self, name: impl Into<String>) {
        self.close_current();
        self.current = Some((name.into(), Instant::now()));
    }

    fn close_current(&mut self) {
        if let Some((name, started)) = self.current.take() {
            self.phases.push(PhaseTiming {
                name,
                duration_ms: started.elapsed().as_millis() as u64,
            });
        }
    }

    pub fn finish(mut self) -> Vec<PhaseTiming> {
        self.close_current();
        self.phases
    }
}

impl Default for PhaseTimer {
    fn default() -> Self {
        PhaseTimer::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_named_phases_in_order() {
        let mut timer = PhaseTimer::new();
        timer.start("plan");
        timer.start("generate");
        let phases = timer.finish();
        assert_eq!(phases.len(), 2);
        assert_eq!(phases[0].name, "plan");
        assert_eq!(phases[1].name, "generate");
    }

    #[test]
    fn no_phases_started_yields_empty() {
        let timer = PhaseTimer::new();
        assert!(timer.finish().is_empty());
    }
}
