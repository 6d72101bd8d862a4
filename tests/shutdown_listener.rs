// tests/shutdown_listener.rs

mod common;
use crate::common::{init_tracing, with_timeout};

use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

use flowdag::engine::{RuntimeEvent, ShutdownListener};

#[tokio::test]
async fn listener_holds_the_sender_while_alive() {
    init_tracing();
    let (tx, mut rx) = mpsc::channel::<RuntimeEvent>(1);

    let listener = ShutdownListener::spawn(tx);

    assert!(timeout(Duration::from_millis(50), rx.recv()).await.is_err());
    assert!(!listener.is_finished());
}

#[tokio::test]
async fn dropping_the_listener_releases_its_sender() {
    init_tracing();
    let (tx, mut rx) = mpsc::channel::<RuntimeEvent>(1);

    let listener = ShutdownListener::spawn(tx);
    drop(listener);

    // With the only sender gone the channel reports closed.
    assert!(with_timeout(rx.recv()).await.is_none());
}
