use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pacman_engine::schedule::{Scheduler, TimerHandle};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use speculoos::prelude::*;

mod common;
use common::{wait_until, DEADLINE, TICK};

#[test]
fn test_task_repeats_until_done() {
    let scheduler = Scheduler::new("test-repeat").unwrap();
    let runs = Arc::new(AtomicUsize::new(0));

    let counter = runs.clone();
    scheduler.schedule_repeating(Duration::ZERO, move |_| {
        let run = counter.fetch_add(1, Ordering::SeqCst) + 1;
        (run < 3).then_some(Duration::from_millis(1))
    });

    assert_that(&wait_until(DEADLINE, || runs.load(Ordering::SeqCst) == 3)).is_true();
    thread::sleep(TICK);
    assert_that(&runs.load(Ordering::SeqCst)).is_equal_to(3);
    assert_that(&scheduler.pending()).is_equal_to(0);
}

#[test]
fn test_cancelled_task_never_runs_again() {
    let scheduler = Scheduler::new("test-cancel").unwrap();
    let runs = Arc::new(AtomicUsize::new(0));

    let counter = runs.clone();
    let timer = scheduler.schedule_repeating(Duration::ZERO, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Some(Duration::from_millis(2))
    });
    assert_that(&wait_until(DEADLINE, || runs.load(Ordering::SeqCst) >= 2)).is_true();

    timer.cancel();
    assert_that(&timer.is_cancelled()).is_true();
    // Let a run that was already underway finish
    thread::sleep(TICK);
    let settled = runs.load(Ordering::SeqCst);
    thread::sleep(TICK * 3);

    assert_that(&runs.load(Ordering::SeqCst)).is_equal_to(settled);
}

#[test]
fn test_cancel_before_first_run() {
    let scheduler = Scheduler::new("test-cancel-early").unwrap();
    let runs = Arc::new(AtomicUsize::new(0));

    let counter = runs.clone();
    let timer = scheduler.schedule_repeating(TICK, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        None
    });
    timer.cancel();
    thread::sleep(TICK * 3);

    assert_that(&runs.load(Ordering::SeqCst)).is_equal_to(0);
}

#[test]
fn test_task_can_cancel_itself() {
    let scheduler = Scheduler::new("test-self-cancel").unwrap();
    let runs = Arc::new(AtomicUsize::new(0));

    let counter = runs.clone();
    scheduler.schedule_repeating(Duration::ZERO, move |timer: &TimerHandle| {
        counter.fetch_add(1, Ordering::SeqCst);
        timer.cancel();
        Some(Duration::ZERO)
    });
    thread::sleep(TICK * 3);

    assert_that(&runs.load(Ordering::SeqCst)).is_equal_to(1);
}

#[test]
fn test_tasks_run_in_due_order() {
    let scheduler = Scheduler::new("test-order").unwrap();
    let order = Arc::new(Mutex::new(Vec::new()));

    for (name, delay) in [("late", 60), ("early", 10), ("middle", 35)] {
        let order = order.clone();
        scheduler.schedule_repeating(Duration::from_millis(delay), move |_| {
            order.lock().push(name);
            None
        });
    }

    assert_that(&wait_until(DEADLINE, || order.lock().len() == 3)).is_true();
    assert_eq!(*order.lock(), vec!["early", "middle", "late"]);
}

#[test]
fn test_drop_stops_worker() {
    let runs = Arc::new(AtomicUsize::new(0));
    {
        let scheduler = Scheduler::new("test-drop").unwrap();
        assert_that(&scheduler.name()).is_equal_to("test-drop");
        let counter = runs.clone();
        scheduler.schedule_repeating(Duration::from_millis(30), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Some(Duration::from_millis(1))
        });
    }
    thread::sleep(Duration::from_millis(80));

    assert_that(&runs.load(Ordering::SeqCst)).is_equal_to(0);
}

#[test]
fn test_task_can_drop_a_busy_scheduler() {
    let gate = Arc::new(Mutex::new(()));
    let holding = Arc::new(AtomicBool::new(false));
    let waiting = Arc::new(AtomicBool::new(false));
    let dropped = Arc::new(AtomicBool::new(false));

    // Its only task blocks on the gate held by the other scheduler's task
    let busy = Scheduler::new("test-busy").unwrap();
    busy.schedule_repeating(Duration::ZERO, {
        let (gate, holding, waiting) = (gate.clone(), holding.clone(), waiting.clone());
        move |_| {
            wait_until(DEADLINE, || holding.load(Ordering::SeqCst));
            waiting.store(true, Ordering::SeqCst);
            drop(gate.lock());
            None
        }
    });
    let slot = Arc::new(Mutex::new(Some(busy)));

    let owner = Scheduler::new("test-owner").unwrap();
    owner.schedule_repeating(Duration::ZERO, {
        let (gate, dropped, slot) = (gate.clone(), dropped.clone(), slot.clone());
        move |_| {
            let _held = gate.lock();
            holding.store(true, Ordering::SeqCst);
            wait_until(DEADLINE, || waiting.load(Ordering::SeqCst));
            thread::sleep(TICK);

            drop(slot.lock().take());
            dropped.store(true, Ordering::SeqCst);
            None
        }
    });

    let finished = wait_until(DEADLINE, || dropped.load(Ordering::SeqCst));
    if !finished {
        // Joining a stuck worker would hang the test run
        std::mem::forget(owner);
    }
    assert_that(&finished).is_true();
    assert_that(&slot.lock().is_none()).is_true();
}
