// crates/test-utils/src/lib.rs

//! Shared helpers for `dagqueue` tests.
//!
//! - [`builders`]: short constructors for jobs, stage groups and workloads.
//! - [`fake_worker`]: a scriptable in-process worker plus a scheduler wired to it.

pub mod builders;
pub mod fake_worker;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

static TRACING: Once = Once::new();

/// Upper bound for a single queue run in tests.
pub const RUN_TIMEOUT: Duration = Duration::from_secs(5);

/// Install a test-writer subscriber once per test binary.
///
/// Queue and monitor logs only show up for failing tests, or with
/// `-- --nocapture`. The filter comes from `RUST_LOG` (`info` if unset), e.g.
/// `RUST_LOG=dagqueue::scheduler=debug`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Await `f`, failing the test if it takes longer than [`RUN_TIMEOUT`].
///
/// Guards against a queue run that never drains hanging the whole suite.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(RUN_TIMEOUT, f)
        .await
        .unwrap_or_else(|_| panic!("queue run did not finish within {RUN_TIMEOUT:?}"))
}
