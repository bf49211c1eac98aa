/// A record of one environment step.
///
/// `next_state` is `None` for terminal transitions.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition<S> {
    state: S,
    action: usize,
    next_state: Option<S>,
    reward: f32,
}

impl<S> Transition<S> {
    /// Creates a transition.
    pub fn new(state: S, action: usize, next_state: Option<S>, reward: f32) -> Self {
        Self {
            state,
            action,
            next_state,
            reward,
        }
    }

    /// The observation before the action was taken.
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Index of the action taken.
    pub fn action(&self) -> usize {
        self.action
    }

    /// The resulting observation, `None` if the episode terminated.
    pub fn next_state(&self) -> Option<&S> {
        self.next_state.as_ref()
    }

    /// The reward received for the step.
    pub fn reward(&self) -> f32 {
        self.reward
    }

    /// Returns `true` if the step ended the episode.
    pub fn is_terminal(&self) -> bool {
        self.next_state.is_none()
    }

    /// Decomposes the transition into `(state, action, next_state, reward)`.
    pub fn into_parts(self) -> (S, usize, Option<S>, f32) {
        (self.state, self.action, self.next_state, self.reward)
    }
}
