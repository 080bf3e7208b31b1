use rand::Rng;
use tracing::debug;
use crate::types::ImprovementChoice;

/// Exclusive upper bound of a random jump.
pub const RANDOM_JUMP_BOUND: i64 = 10_000_000_000;

/// The selections that define which query subset is being paged through.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct NavigationContext {
    pub dataset: String,
    pub category: String,
    /// Improvement-flag column filtered on, if any.
    pub filter_by: Option<String>,
    pub improvement: Option<ImprovementChoice>,
}

impl NavigationContext {
    pub fn new(dataset: &str, category: &str, filter_by: Option<&str>, improvement: Option<ImprovementChoice>) -> NavigationContext {
        NavigationContext {
            dataset: dataset.to_string(),
            category: category.to_string(),
            filter_by: filter_by.map(str::to_string),
            improvement,
        }
    }
}

/// User actions and selection changes that move the viewer to another query.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum NavigationEvent {
    Advance(i64),
    /// Jump forward by the given non-negative offset.
    RandomJump(i64),
    ContextChanged(NavigationContext),
}

/// Position of the viewer within the current query subset, kept for the whole session.
///
/// The position is kept as a 128-bit offset and wrapped around the subset length only when read,
/// so paging backwards from the first query lands on the last one. Any sequence of `i64` steps
/// short of 2^64 calls keeps the addition exact.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct NavigationState {
    position: i128,
    context: Option<NavigationContext>,
}

impl NavigationState {
    pub fn new() -> NavigationState { NavigationState::default() }

    pub fn position(&self) -> i128 { self.position }

    /// The last context seen; `None` before the first render.
    pub fn context(&self) -> Option<&NavigationContext> { self.context.as_ref() }

    pub fn advance(&mut self, delta: i64) {
        self.position = self.position.saturating_add(i128::from(delta));
    }

    /// Jumps forward by a random offset in `[0, RANDOM_JUMP_BOUND)`.
    pub fn random_jump<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let offset = rng.gen_range(0..RANDOM_JUMP_BOUND);
        self.advance(offset);
    }

    /// Stores `context` and moves back to the first query if any selection differs from the stored
    /// one. The first context ever seen is stored without a reset.
    ///
    /// Returns `true` if the position was reset.
    pub fn reset_if_context_changed(&mut self, context: NavigationContext) -> bool {
        match &self.context {
            None => {
                self.context = Some(context);
                false
            }
            Some(current) if *current == context => false,
            Some(current) => {
                debug!(from = ?current, to = ?context, position = self.position, "selection changed, resetting position");
                self.context = Some(context);
                self.position = 0;
                true
            }
        }
    }

    /// Index of the current query in a subset of `len` queries; `None` if the subset is empty.
    pub fn current_index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        usize::try_from(self.position.rem_euclid(len as i128)).ok()
    }

    /// Returns the state that results from `event`.
    pub fn apply(mut self, event: NavigationEvent) -> NavigationState {
        match event {
            NavigationEvent::Advance(delta) => self.advance(delta),
            NavigationEvent::RandomJump(offset) => self.advance(offset.max(0)),
            NavigationEvent::ContextChanged(context) => {
                self.reset_if_context_changed(context);
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use crate::view::navigation::{NavigationContext, NavigationEvent, NavigationState};
    use crate::ImprovementChoice;

    fn context(dataset: &str, category: &str, filter_by: Option<&str>, improvement: Option<ImprovementChoice>) -> NavigationContext {
        NavigationContext::new(dataset, category, filter_by, improvement)
    }

    #[test]
    fn test_current_index_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for len in 1..20_usize {
            let mut state = NavigationState::new();
            for step in 0..200 {
                match step % 3 {
                    0 => state.advance(-1),
                    1 => state.random_jump(&mut rng),
                    _ => state.advance(1),
                }
                assert!(state.current_index(len).unwrap() < len);
            }
        }
        assert_eq!(None, NavigationState::new().current_index(0));
    }

    #[test]
    fn test_wraparound() {
        let mut state = NavigationState::new();
        state.advance(-1);
        assert_eq!(Some(4), state.current_index(5));

        state.advance(1);
        assert_eq!(Some(0), state.current_index(5));

        let mut state = NavigationState::new();
        state.advance(4);
        state.advance(1);
        assert_eq!(Some(0), state.current_index(5));
    }

    #[test]
    fn test_first_context_is_not_a_change() {
        let mut state = NavigationState::new();
        assert!(!state.reset_if_context_changed(context("SOP", "bikes", None, None)));
        assert_eq!(Some(&context("SOP", "bikes", None, None)), state.context());
    }

    #[test]
    fn test_reset_if_context_changed() {
        let base = context("SOP", "bikes", Some("cmc@1_improved"), Some(ImprovementChoice::Improvements));
        let changes = vec![
            context("InShop", "bikes", Some("cmc@1_improved"), Some(ImprovementChoice::Improvements)),
            context("SOP", "chairs", Some("cmc@1_improved"), Some(ImprovementChoice::Improvements)),
            context("SOP", "bikes", Some("map@5_improved"), Some(ImprovementChoice::Improvements)),
            context("SOP", "bikes", None, None),
            context("SOP", "bikes", Some("cmc@1_improved"), Some(ImprovementChoice::Worsenings)),
        ];

        for changed in changes {
            let mut state = NavigationState::new();
            state.reset_if_context_changed(base.clone());
            state.advance(3);

            // Repeating the same selections never moves the position.
            for _ in 0..3 {
                assert!(!state.reset_if_context_changed(base.clone()));
                assert_eq!(3, state.position());
            }

            assert!(state.reset_if_context_changed(changed.clone()));
            assert_eq!(0, state.position());
            assert_eq!(Some(&changed), state.context());
        }
    }

    #[test]
    fn test_apply() {
        let state = NavigationState::new()
            .apply(NavigationEvent::ContextChanged(context("SOP", "bikes", None, None)))
            .apply(NavigationEvent::Advance(2))
            .apply(NavigationEvent::RandomJump(10));
        assert_eq!(12, state.position());

        let state = state.apply(NavigationEvent::ContextChanged(context("SOP", "chairs", None, None)));
        assert_eq!(0, state.position());
        assert_eq!(Some(3), state.apply(NavigationEvent::Advance(-1)).current_index(4));
    }

    #[test]
    fn test_wraparound_large_steps() {
        let mut state = NavigationState::new();
        state.advance(i64::MAX);
        // 2^63 - 1 = 1 (mod 3)
        assert_eq!(Some(1), state.current_index(3));
        state.advance(1);
        assert_eq!(Some(2), state.current_index(3));
        state.advance(1);
        assert_eq!(Some(0), state.current_index(3));
        state.advance(-1);
        assert_eq!(Some(2), state.current_index(3));

        let mut state = NavigationState::new();
        state.advance(i64::MIN);
        state.advance(i64::MIN);
        // -2^64 = 2 (mod 3)
        assert_eq!(Some(2), state.current_index(3));
        state.advance(1);
        assert_eq!(Some(0), state.current_index(3));
    }
}
