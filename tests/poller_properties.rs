//! Property tests for the poll loop.
//!
//! Uses the scripted transport and the virtual clock, so each case runs
//! without real delays.

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use index_tasks::clock::ManualClock;
use index_tasks::transport::{ScriptedTransport, TaskScript, TaskTransport};
use index_tasks::{Error, TaskPoller, TaskStatus, WaitOptions};

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
        .block_on(future)
}

fn arb_non_terminal() -> impl Strategy<Value = TaskStatus> {
    prop::sample::select(vec![TaskStatus::Enqueued, TaskStatus::Processing])
}

fn arb_terminal() -> impl Strategy<Value = TaskStatus> {
    prop::sample::select(vec![
        TaskStatus::Succeeded,
        TaskStatus::Failed,
        TaskStatus::Canceled,
    ])
}

proptest! {
    #[test]
    fn stops_at_first_terminal_status(
        prefix in prop::collection::vec(arb_non_terminal(), 0..20),
        terminal in arb_terminal(),
    ) {
        let transport = Arc::new(ScriptedTransport::new());
        let mut statuses = prefix.clone();
        statuses.push(terminal);
        transport.insert_task(1, "idx", TaskScript::new(statuses));

        let poller = TaskPoller::with_clock(transport.clone(), Arc::new(ManualClock::new()));
        let task = block_on(poller.wait_for_task(1, WaitOptions::default(), None)).unwrap();

        prop_assert_eq!(task.status, terminal);
        prop_assert_eq!(transport.fetch_count(1), prefix.len() + 1);
    }

    #[test]
    fn never_terminal_times_out_near_timeout_over_interval(
        interval_ms in 1u64..200,
        timeout_ms in 1u64..5_000,
    ) {
        let transport = Arc::new(ScriptedTransport::new());
        transport.insert_task(7, "idx", TaskScript::never_finishes());
        let clock = ManualClock::new();
        let poller = TaskPoller::with_clock(transport.clone(), Arc::new(clock.clone()));
        let options = WaitOptions::new(
            Duration::from_millis(interval_ms),
            Duration::from_millis(timeout_ms),
        );

        let err = block_on(poller.wait_for_task(7, options, None)).unwrap_err();

        let is_timeout = matches!(err, Error::TimeoutExceeded { .. });
        prop_assert!(is_timeout);
        let fetches = transport.fetch_count(7) as u64;
        prop_assert_eq!(fetches, timeout_ms / interval_ms + 1);
        let ceil = timeout_ms.div_ceil(interval_ms);
        prop_assert!(fetches.abs_diff(ceil) <= 1);
        prop_assert!(clock.elapsed() <= options.timeout);
    }

    #[test]
    fn terminal_snapshot_is_identical_on_every_read(
        polls in 1usize..6,
        reads in 1usize..6,
    ) {
        let transport = ScriptedTransport::new();
        transport.insert_task(3, "idx", TaskScript::succeeds_after(polls));

        let snapshots = block_on(async {
            let mut snapshots = Vec::new();
            for _ in 0..polls + reads {
                snapshots.push(transport.fetch_task(3).await.unwrap());
            }
            snapshots
        });

        let terminal = &snapshots[polls - 1];
        prop_assert_eq!(terminal.status, TaskStatus::Succeeded);
        for snapshot in &snapshots[polls..] {
            prop_assert_eq!(snapshot, terminal);
        }
    }
}
