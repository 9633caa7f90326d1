//! Supervisor restart behaviour on a paused clock

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hamonitor_daemon::{Supervisor, SupervisorConfig, SupervisorError};
use tokio::time::Instant;

fn supervisor(max_restarts: Option<u32>) -> Supervisor {
    Supervisor::new(SupervisorConfig {
        backoff: Duration::from_secs(5),
        max_restarts,
    })
}

#[tokio::test(start_paused = true)]
async fn restarts_after_errors_with_backoff() {
    let starts = Arc::new(Mutex::new(Vec::new()));
    let origin = Instant::now();

    let recorded = Arc::clone(&starts);
    let result = supervisor(None)
        .supervise(move |attempt| {
            recorded.lock().unwrap().push((attempt, origin.elapsed()));
            async move {
                if attempt < 3 {
                    Err(format!("driver crash #{}", attempt))
                } else {
                    Ok(())
                }
            }
        })
        .await;

    assert!(result.is_ok());
    assert_eq!(
        *starts.lock().unwrap(),
        vec![
            (1, Duration::ZERO),
            (2, Duration::from_secs(5)),
            (3, Duration::from_secs(10)),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn panics_are_restarted() {
    let runs = Arc::new(AtomicU32::new(0));

    let counter = Arc::clone(&runs);
    let result = supervisor(Some(5))
        .supervise(move |attempt| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 1 {
                    panic!("libfreenect segfault stand-in");
                }
                Ok::<(), String>(())
            }
        })
        .await;

    assert!(result.is_ok());
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn restart_cap_reports_last_failure() {
    let result = supervisor(Some(2))
        .supervise(|attempt| async move { Err::<(), _>(format!("failure {}", attempt)) })
        .await;

    match result {
        Err(SupervisorError::Exhausted { restarts, last }) => {
            assert_eq!(restarts, 2);
            assert_eq!(last, "failure 3");
        }
        Ok(()) => panic!("expected supervision to give up"),
    }
}

#[tokio::test(start_paused = true)]
async fn panic_message_is_reported() {
    let result = supervisor(Some(0))
        .supervise(|_| async {
            if true {
                panic!("kinect unplugged");
            }
            Ok::<(), String>(())
        })
        .await;

    match result {
        Err(SupervisorError::Exhausted { last, .. }) => {
            assert_eq!(last, "panicked: kinect unplugged");
        }
        Ok(()) => panic!("expected supervision to give up"),
    }
}
