use crate::lending::domain::BiasRange;
use arc_swap::ArcSwap;
use std::sync::Arc;

/// Snapshot of the operator-controlled lending state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlState {
    pub paused: bool,
    /// Replaces every currency's configured bias range when set
    pub bias_override: Option<BiasRange>,
}

/// Shared handle to the current [`ControlState`]
#[derive(Debug, Clone, Default)]
pub struct ControlHandle {
    swap: Arc<ArcSwap<ControlState>>,
}

impl ControlHandle {
    pub fn new(initial: ControlState) -> Self {
        ControlHandle {
            swap: Arc::new(ArcSwap::from_pointee(initial)),
        }
    }

    /// One consistent snapshot
    pub fn load(&self) -> ControlState {
        **self.swap.load()
    }

    pub fn store(&self, state: ControlState) {
        // Readers see old or new, never partial
        self.swap.store(Arc::new(state));
    }

    /// Apply `f` to the current state and publish the result
    pub fn update(&self, f: impl Fn(&mut ControlState)) -> ControlState {
        let previous = self.swap.rcu(|current| {
            let mut next = **current;
            f(&mut next);
            next
        });
        let mut next = *previous;
        f(&mut next);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::thread;

    #[test]
    fn test_update_publishes_new_state() {
        let handle = ControlHandle::default();
        let next = handle.update(|s| s.paused = true);
        assert!(next.paused);
        assert!(handle.load().paused);
        assert_eq!(handle.load().bias_override, None);
    }

    #[test]
    fn test_concurrent_reader_never_sees_torn_bias_pair() {
        let handle = ControlHandle::default();
        let writer = {
            let handle = handle.clone();
            thread::spawn(move || {
                for i in 0..2000i64 {
                    let v = Decimal::from(i);
                    handle.store(ControlState {
                        paused: i % 2 == 0,
                        bias_override: Some(BiasRange { min: v, max: -v }),
                    });
                }
            })
        };

        for _ in 0..2000 {
            let state = handle.load();
            if let Some(range) = state.bias_override {
                assert_eq!(range.min, -range.max);
            }
        }
        writer.join().unwrap();
    }
}
