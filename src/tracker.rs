//! Per-chain resolution tracking
//!
//! Each resolution chain (one top-level resolve plus everything it triggers)
//! keeps an ordered stack of keys currently in flight. Factories are
//! synchronous closures, so a chain never leaves its thread and a
//! thread-local stack gives full isolation between concurrent chains.

use crate::core::types::TypeKey;
use std::cell::RefCell;

thread_local! {
    static IN_FLIGHT: RefCell<Vec<TypeKey>> = const { RefCell::new(Vec::new()) };
}

/// Result of attempting to enter a key on the current chain.
pub(crate) enum EnterOutcome {
    /// The key was pushed; the frame pops it when dropped, unwinding included.
    Entered {
        frame: ChainFrame,
        /// Key that was top of stack before the push, if any.
        parent: Option<TypeKey>,
    },
    /// The key is already in flight on this chain.
    Cycle {
        /// Top of stack at the moment of re-entry.
        parent: TypeKey,
        /// Stack segment from the earlier occurrence of the key to the top,
        /// i.e. the keys forming the loop.
        participants: Vec<TypeKey>,
    },
}

/// Push `key` onto the current chain, or report the cycle it would close.
pub(crate) fn enter(key: TypeKey) -> EnterOutcome {
    IN_FLIGHT.with(|stack| {
        let mut stack = stack.borrow_mut();
        if let Some(position) = stack.iter().position(|in_flight| *in_flight == key) {
            let parent = *stack.last().expect("non-empty stack on re-entry");
            return EnterOutcome::Cycle {
                parent,
                participants: stack[position..].to_vec(),
            };
        }
        let parent = stack.last().copied();
        stack.push(key);
        EnterOutcome::Entered {
            frame: ChainFrame { key },
            parent,
        }
    })
}

fn exit(key: TypeKey) {
    IN_FLIGHT.with(|stack| {
        let popped = stack.borrow_mut().pop();
        debug_assert_eq!(
            popped,
            Some(key),
            "resolution frames must unwind in LIFO order"
        );
    });
}

/// Number of keys in flight on the current chain.
#[cfg(test)]
pub(crate) fn depth() -> usize {
    IN_FLIGHT.with(|stack| stack.borrow().len())
}

/// Scope guard for one in-flight key. Dropping it pops the frame, so a
/// panicking factory still leaves the stack balanced.
pub(crate) struct ChainFrame {
    key: TypeKey,
}

impl Drop for ChainFrame {
    fn drop(&mut self) {
        exit(self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct A;
    struct B;
    struct C;

    #[test]
    fn enter_exit_balances_the_stack() {
        let EnterOutcome::Entered { frame, parent } = enter(TypeKey::of::<A>()) else {
            panic!("fresh key must enter");
        };
        assert!(parent.is_none());
        assert_eq!(depth(), 1);
        drop(frame);
        assert_eq!(depth(), 0);
    }

    #[test]
    fn nested_enter_reports_parent() {
        let EnterOutcome::Entered { frame: outer, .. } = enter(TypeKey::of::<A>()) else {
            panic!("fresh key must enter");
        };
        let EnterOutcome::Entered {
            frame: inner,
            parent,
        } = enter(TypeKey::of::<B>())
        else {
            panic!("distinct key must enter");
        };
        assert_eq!(parent, Some(TypeKey::of::<A>()));
        drop(inner);
        drop(outer);
        assert_eq!(depth(), 0);
    }

    #[test]
    fn reentry_signals_cycle_with_participants() {
        let EnterOutcome::Entered { frame: a, .. } = enter(TypeKey::of::<A>()) else {
            panic!()
        };
        let EnterOutcome::Entered { frame: b, .. } = enter(TypeKey::of::<B>()) else {
            panic!()
        };
        let EnterOutcome::Entered { frame: c, .. } = enter(TypeKey::of::<C>()) else {
            panic!()
        };

        match enter(TypeKey::of::<B>()) {
            EnterOutcome::Cycle {
                parent,
                participants,
            } => {
                assert_eq!(parent, TypeKey::of::<C>());
                assert_eq!(participants, vec![TypeKey::of::<B>(), TypeKey::of::<C>()]);
            }
            EnterOutcome::Entered { .. } => panic!("re-entry must signal a cycle"),
        }
        // cycle signal must not have pushed anything
        assert_eq!(depth(), 3);
        drop(c);
        drop(b);
        drop(a);
    }

    #[test]
    fn self_reentry_is_a_single_participant_cycle() {
        let EnterOutcome::Entered { frame, .. } = enter(TypeKey::of::<A>()) else {
            panic!()
        };
        match enter(TypeKey::of::<A>()) {
            EnterOutcome::Cycle {
                parent,
                participants,
            } => {
                assert_eq!(parent, TypeKey::of::<A>());
                assert_eq!(participants, vec![TypeKey::of::<A>()]);
            }
            EnterOutcome::Entered { .. } => panic!("self re-entry must signal a cycle"),
        }
        drop(frame);
    }

    #[test]
    fn frame_pops_on_unwind() {
        let result = std::panic::catch_unwind(|| {
            let EnterOutcome::Entered { frame, .. } = enter(TypeKey::of::<A>()) else {
                panic!("fresh key must enter");
            };
            let _frame = frame;
            panic!("factory blew up");
        });
        assert!(result.is_err());
        assert_eq!(depth(), 0);
    }

    #[test]
    fn chains_on_other_threads_are_isolated() {
        let EnterOutcome::Entered { frame, .. } = enter(TypeKey::of::<A>()) else {
            panic!()
        };
        std::thread::spawn(|| {
            // the other thread's chain is empty, so A enters freely
            match enter(TypeKey::of::<A>()) {
                EnterOutcome::Entered { parent, .. } => assert!(parent.is_none()),
                EnterOutcome::Cycle { .. } => panic!("chains must not share state"),
            }
        })
        .join()
        .expect("worker thread");
        drop(frame);
    }
}
