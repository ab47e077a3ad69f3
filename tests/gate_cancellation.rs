use pandapal_gate::RequestGate;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

/// Poll `condition` until it holds, panicking after two seconds.
async fn wait_until(condition: impl Fn() -> bool, what: &str) {
    let poll = async {
        while !condition() {
            sleep(Duration::from_millis(5)).await;
        }
    };
    if timeout(Duration::from_secs(2), poll).await.is_err() {
        panic!("timed out waiting for {what}");
    }
}

#[tokio::test]
async fn test_cancelled_waiter_does_not_leak_slot() {
    let gate = Arc::new(RequestGate::new(1).expect("valid capacity"));
    let hold = Arc::new(Notify::new());
    let entered = Arc::new(AtomicUsize::new(0));

    // Occupy the only slot.
    let first = {
        let gate = gate.clone();
        let hold = hold.clone();
        let entered = entered.clone();
        tokio::spawn(async move {
            gate.run(async {
                entered.fetch_add(1, Ordering::SeqCst);
                hold.notified().await;
            })
            .await;
        })
    };
    wait_until(
        || entered.load(Ordering::SeqCst) == 1,
        "first operation admitted",
    )
    .await;

    let token = CancellationToken::new();
    let waiter = {
        let gate = gate.clone();
        let token = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => false,
                () = gate.run(async {}) => true,
            }
        })
    };

    // Let the waiter queue up behind the held slot, then cancel it.
    sleep(Duration::from_millis(50)).await;
    token.cancel();
    let ran = waiter.await.expect("waiter task");
    assert!(!ran, "waiter ran despite cancellation");
    assert_eq!(
        gate.active_count(),
        1,
        "cancelled waiter must not hold a slot"
    );

    hold.notify_one();
    first.await.expect("first task");
    assert_eq!(gate.active_count(), 0);
    assert_eq!(gate.available_slots(), 1);

    let value = timeout(Duration::from_millis(100), gate.run(async { 5 }))
        .await
        .expect("slot should be free after the cancelled waiter");
    assert_eq!(value, 5);
}

#[tokio::test]
async fn test_cancelled_operation_still_releases_slot() {
    let gate = Arc::new(RequestGate::new(1).expect("valid capacity"));
    let entered = Arc::new(AtomicUsize::new(0));

    let running = {
        let gate = gate.clone();
        let entered = entered.clone();
        tokio::spawn(async move {
            gate.run(async {
                entered.fetch_add(1, Ordering::SeqCst);
                std::future::pending::<()>().await;
            })
            .await;
        })
    };
    wait_until(
        || entered.load(Ordering::SeqCst) == 1,
        "operation admitted",
    )
    .await;
    assert_eq!(gate.active_count(), 1);

    running.abort();
    let join_err = running.await.expect_err("task should be aborted");
    assert!(join_err.is_cancelled());

    wait_until(|| gate.active_count() == 0, "slot released after abort").await;
    assert_eq!(gate.available_slots(), 1);

    let value = timeout(Duration::from_millis(100), gate.run(async { 7 }))
        .await
        .expect("slot should be free after the aborted operation");
    assert_eq!(value, 7);
}
