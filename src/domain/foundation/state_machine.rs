//! Adjacency-table state machines.

/// A status enum whose legal moves are listed per state.
///
/// `is_terminal` is derived from the table: a state with no outgoing
/// edge accepts nothing.
pub trait StateMachine: Sized + Copy + PartialEq {
    /// States reachable from `self` in one step.
    fn valid_transitions(&self) -> Vec<Self>;

    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
