use tracing::{debug, error};

/// Stage of one workflow run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkflowState {
    Idle,
    Uploading,
    Building,
    Simulating,
    AwaitingSignature,
    Submitted,
    Confirmed,
}

impl WorkflowState {
    /// Forward edges of the run, plus the failure exit back to `Idle` from anywhere.
    pub fn can_advance_to(self, next: WorkflowState) -> bool {
        use WorkflowState::*;
        next == Idle
            || matches!(
                (self, next),
                (Idle, Uploading)
                    | (Idle, Building)
                    | (Uploading, Building)
                    | (Building, Simulating)
                    | (Simulating, AwaitingSignature)
                    | (AwaitingSignature, Submitted)
                    | (Submitted, Confirmed)
            )
    }
}

/// Current state plus every state the current run passed through.
#[derive(Clone, Debug)]
pub struct StateMachine {
    state: WorkflowState,
    trace: Vec<WorkflowState>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self {
            state: WorkflowState::Idle,
            trace: vec![WorkflowState::Idle],
        }
    }
}

impl StateMachine {
    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn trace(&self) -> &[WorkflowState] {
        &self.trace
    }

    /// Start a new run from `Idle`, dropping the previous trace.
    pub fn restart(&mut self) {
        *self = Self::default();
    }

    /// Move to `next`. Returns `false` and stays put on an edge the run does not have.
    pub fn advance(&mut self, next: WorkflowState) -> bool {
        if !self.state.can_advance_to(next) {
            error!(from = ?self.state, to = ?next, "illegal workflow transition");
            debug_assert!(false, "illegal workflow transition {:?} -> {next:?}", self.state);
            return false;
        }
        debug!(from = ?self.state, to = ?next, "workflow transition");
        self.state = next;
        self.trace.push(next);
        true
    }

    /// Failure exit.
    pub fn fail(&mut self) {
        if self.state != WorkflowState::Idle {
            self.advance(WorkflowState::Idle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::WorkflowState::*;
    use super::*;

    #[test]
    fn full_run_is_recorded() {
        let mut m = StateMachine::default();
        for next in [Uploading, Building, Simulating, AwaitingSignature, Submitted, Confirmed] {
            assert!(m.advance(next));
        }
        assert_eq!(m.state(), Confirmed);
        assert_eq!(m.trace().len(), 7);

        m.restart();
        assert_eq!(m.trace(), &[Idle]);
    }

    #[test]
    fn failure_returns_to_idle_from_any_state() {
        for state in [Uploading, Building, Simulating, AwaitingSignature, Submitted] {
            assert!(state.can_advance_to(Idle));
        }
        let mut m = StateMachine::default();
        m.advance(Building);
        m.fail();
        assert_eq!(m.trace(), &[Idle, Building, Idle]);
    }

    #[test]
    fn skipping_stages_is_not_an_edge() {
        assert!(!Uploading.can_advance_to(Simulating));
        assert!(!Building.can_advance_to(Submitted));
        assert!(!Idle.can_advance_to(Confirmed));
        assert!(!Submitted.can_advance_to(Building));
    }
}
