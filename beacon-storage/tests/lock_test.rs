//! Sender lock exclusivity.

use std::cell::Cell;

use beacon_storage::{InstanceLock, SenderLock};

#[test]
fn second_holder_is_refused_while_first_runs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("sender.lock");
    let mut first = SenderLock::open(&path).unwrap();
    let mut second = SenderLock::open(&path).unwrap();

    let inner = first
        .try_run(|| second.try_run(|| "ran").unwrap())
        .unwrap();
    assert_eq!(inner, Some(None));

    // Released after the first cycle.
    assert_eq!(second.try_run(|| 7).unwrap(), Some(7));
}

#[test]
fn only_a_lone_process_runs_first_start_reset() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("instance.lock");
    let resets = Cell::new(0);
    let reset = || {
        resets.set(resets.get() + 1);
        Ok(())
    };

    let first = InstanceLock::acquire(&path, reset).unwrap();
    assert!(first.is_first());
    let second = InstanceLock::acquire(&path, reset).unwrap();
    assert!(!second.is_first());
    assert_eq!(resets.get(), 1);

    drop(first);
    drop(second);
    let restarted = InstanceLock::acquire(&path, reset).unwrap();
    assert!(restarted.is_first());
    assert_eq!(resets.get(), 2);
}
