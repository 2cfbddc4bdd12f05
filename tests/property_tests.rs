//! Property-Based Tests for installkit
//!
//! Uses proptest for the sequence invariants:
//! - Fail-fast: with a failure at index k, exactly tasks 0..=k run
//! - Cancellation: cancelling during task k means exactly tasks 0..=k run
//! - Registry paths: rendering then parsing is identity

use std::sync::{Arc, Mutex};

use proptest::prelude::*;

use installkit::registry::{Hive, RegistryPath};
use installkit::sequence::{CancelToken, Sequence, SequenceState};
use installkit::task::{Outcome, Task};

struct Step {
    name: String,
    index: usize,
    log: Arc<Mutex<Vec<usize>>>,
    fail: bool,
    cancel: Option<CancelToken>,
}

impl Task for Step {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self) -> Outcome {
        self.log.lock().unwrap().push(self.index);
        if let Some(token) = &self.cancel {
            token.cancel();
        }
        if self.fail {
            Outcome::failure(format!("step {} failed", self.index))
        } else {
            Outcome::Success
        }
    }
}

fn steps(
    len: usize,
    log: &Arc<Mutex<Vec<usize>>>,
    fail_at: Option<usize>,
    cancel_at: Option<(usize, CancelToken)>,
) -> Vec<Box<dyn Task>> {
    (0..len)
        .map(|index| {
            Box::new(Step {
                name: format!("step-{index}"),
                index,
                log: Arc::clone(log),
                fail: fail_at == Some(index),
                cancel: cancel_at
                    .as_ref()
                    .filter(|(at, _)| *at == index)
                    .map(|(_, token)| token.clone()),
            }) as Box<dyn Task>
        })
        .collect()
}

// =============================================================================
// Sequence Property Tests
// =============================================================================

proptest! {
    /// Fail-fast: nothing after the failing task runs
    #[test]
    fn failure_stops_at_k((len, k) in (1usize..20).prop_flat_map(|len| (Just(len), 0..len))) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut sequence = Sequence::new(steps(len, &log, Some(k), None));

        let err = sequence.execute().unwrap_err();
        prop_assert_eq!(
            err.to_string(),
            format!("Installation of step-{k} failed. Error: step {k} failed")
        );
        prop_assert_eq!(log.lock().unwrap().clone(), (0..=k).collect::<Vec<_>>());
        prop_assert_eq!(sequence.state(), SequenceState::Failed);
    }

    /// Cancellation requested during task k lets task k finish and nothing after
    #[test]
    fn cancel_stops_after_k((len, k) in (1usize..20).prop_flat_map(|len| (Just(len), 0..len))) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let token = CancelToken::new();
        let mut sequence = Sequence::new(steps(len, &log, None, Some((k, token.clone()))))
            .with_cancel_token(token);

        prop_assert_eq!(sequence.execute().unwrap(), Outcome::Success);
        prop_assert_eq!(log.lock().unwrap().clone(), (0..=k).collect::<Vec<_>>());
        let expected = if k + 1 == len {
            SequenceState::Completed
        } else {
            SequenceState::Cancelled
        };
        prop_assert_eq!(sequence.state(), expected);
    }

    /// Without failure or cancellation every task runs once, in order
    #[test]
    fn all_tasks_run_once(len in 0usize..30) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut sequence = Sequence::new(steps(len, &log, None, None));

        prop_assert_eq!(sequence.execute().unwrap(), Outcome::Success);
        prop_assert_eq!(log.lock().unwrap().clone(), (0..len).collect::<Vec<_>>());
    }
}

// =============================================================================
// RegistryPath Property Tests
// =============================================================================

fn hive_strategy() -> impl Strategy<Value = Hive> {
    prop_oneof![
        Just(Hive::ClassesRoot),
        Just(Hive::CurrentUser),
        Just(Hive::LocalMachine),
        Just(Hive::Users),
        Just(Hive::CurrentConfig),
    ]
}

proptest! {
    /// RegistryPath: to_string → parse round-trip is identity
    #[test]
    fn registry_path_roundtrip(
        hive in hive_strategy(),
        keys in prop::collection::vec("[A-Za-z0-9._-]{1,12}", 0..4),
        value in "[A-Za-z0-9_]{1,16}",
    ) {
        let mut segments = vec![hive.to_string()];
        segments.extend(keys);
        segments.push(value);
        let text = segments.join("\\");

        let path: RegistryPath = text.parse().unwrap();
        prop_assert_eq!(path.hive(), hive);
        prop_assert_eq!(path.to_string(), text);
    }
}
