pub mod builders;
pub mod fake_executor;
pub mod notifier;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use assetflow::engine::{RuntimeEvent, TaskOutcome, TriggerReason};
use assetflow::logging::LOG_ENV;
use tracing_subscriber::{fmt, EnvFilter};

pub use fake_executor::FakeExecutor;
pub use notifier::RecordingNotifier;

/// Upper bound for any single awaited step in a test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

static INIT: Once = Once::new();

/// Install a test-writer subscriber once per test binary.
///
/// Reads the same `ASSETFLOW_LOG` filter as the binary, so
/// `ASSETFLOW_LOG=assetflow=debug cargo test -- --nocapture` shows pipeline
/// and watch-loop traces. Defaults to `warn`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Await `f`, panicking after [`TEST_TIMEOUT`] so a stuck watch loop or
/// dev server fails the test instead of hanging it.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(TEST_TIMEOUT, f)
        .await
        .unwrap_or_else(|_| panic!("test step exceeded {TEST_TIMEOUT:?}"))
}

pub fn manual_trigger(task: &str) -> RuntimeEvent {
    RuntimeEvent::TaskTriggered {
        task: task.to_string(),
        reason: TriggerReason::Manual,
    }
}

pub fn completed(task: &str, outcome: TaskOutcome) -> RuntimeEvent {
    RuntimeEvent::TaskCompleted {
        task: task.to_string(),
        outcome,
    }
}
