//! Run virtual users concurrently against a math service and print metrics.

use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use sketches_ddsketch::DDSketch;
use tokio_util::sync::CancellationToken;
use yansi::Paint;

use crate::http::HttpRemote;
use crate::scenario::{Scenario, VirtualUser};

/// Runs the virtual users of the given scenario concurrently against the remote.
///
/// Every user loops independently: send one request, then pause for a random think time. Failed
/// requests are logged and counted, but never stop the user. The run ends after `duration`, or on
/// Ctrl-C if no duration is given. Requests still in flight at that point are abandoned and do not
/// count towards the report.
///
/// The report is printed to stdout and returned.
pub async fn run(
    remote: HttpRemote,
    scenario: Scenario,
    duration: Option<Duration>,
) -> Result<Report> {
    let remote = Arc::new(remote);
    let scenario = Arc::new(scenario);
    let shutdown = CancellationToken::new();

    tracing::info!(
        scenario = %scenario.name,
        users = scenario.users,
        url = remote.url(),
        "starting load test"
    );

    let bar = ProgressBar::new_spinner()
        .with_style(ProgressStyle::with_template("{spinner} {msg} {elapsed}")?)
        .with_message(format!("Running {} users:", scenario.users));
    bar.enable_steady_tick(Duration::from_millis(100));

    tokio::spawn(stop_after(duration, shutdown.clone()));

    let start = Instant::now();
    let mut tasks = Vec::with_capacity(scenario.users);
    for id in 0..scenario.users {
        if id > 0 && !scenario.spawn_interval.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(scenario.spawn_interval) => {}
                _ = shutdown.cancelled() => break,
            }
        }

        let user = scenario.user(id);
        let remote = Arc::clone(&remote);
        let scenario = Arc::clone(&scenario);
        tasks.push(tokio::spawn(run_user(user, remote, scenario, shutdown.clone())));
    }

    let finished_tasks = futures::future::join_all(tasks).await;
    let elapsed = start.elapsed();
    shutdown.cancel();
    bar.finish_and_clear();

    let mut metrics = UserMetrics::default();
    for task in finished_tasks {
        let user_metrics = task?;
        metrics.latency.merge(&user_metrics.latency)?;
        metrics.failures += user_metrics.failures;
    }

    let report = Report {
        name: scenario.name.clone(),
        users: scenario.users,
        duration: elapsed,
        failures: metrics.failures,
        latency: metrics.latency,
    };

    println!();
    println!("{report}");

    Ok(report)
}

/// Cancels the run after the given duration or on Ctrl-C, whichever comes first.
async fn stop_after(duration: Option<Duration>, shutdown: CancellationToken) {
    let deadline = async {
        match duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending().await,
        }
    };

    let interrupted = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("received Ctrl-C, stopping load test"),
            Err(err) => {
                tracing::error!(error = &err as &dyn Error, "failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = deadline => tracing::debug!("load test duration elapsed"),
        _ = interrupted => {}
        _ = shutdown.cancelled() => {}
    }

    shutdown.cancel();
}

async fn run_user(
    mut user: VirtualUser,
    remote: Arc<HttpRemote>,
    scenario: Arc<Scenario>,
    shutdown: CancellationToken,
) -> UserMetrics {
    tracing::debug!(user = user.id, "virtual user started");
    let mut metrics = UserMetrics::default();

    loop {
        let start = Instant::now();
        let request = async {
            if scenario.validate_response {
                remote.add_checked(&scenario.payload).await.map(drop)
            } else {
                remote.add(&scenario.payload).await.map(drop)
            }
        };

        let Some(result) = shutdown.run_until_cancelled(request).await else {
            break;
        };

        match result {
            Ok(()) => metrics.latency.add(start.elapsed().as_secs_f64()),
            Err(err) => {
                tracing::warn!(
                    user = user.id,
                    error = &err as &dyn Error,
                    "request failed"
                );
                metrics.failures += 1;
            }
        }

        let pause = user.next_think_time();
        if shutdown
            .run_until_cancelled(tokio::time::sleep(pause))
            .await
            .is_none()
        {
            break;
        }
    }

    tracing::debug!(user = user.id, "virtual user stopped");
    metrics
}

/// Outcome of the iterations of a single virtual user.
#[derive(Default)]
struct UserMetrics {
    /// Latencies of successful requests, in seconds.
    latency: DDSketch,
    failures: u64,
}

/// The aggregated outcome of a load test run.
pub struct Report {
    name: String,
    users: usize,
    duration: Duration,
    failures: u64,
    latency: DDSketch,
}

impl Report {
    /// The number of completed iterations, successful or not.
    pub fn iterations(&self) -> u64 {
        self.successes() + self.failures
    }

    /// The number of iterations that received a successful response.
    pub fn successes(&self) -> u64 {
        self.latency.count() as u64
    }

    /// The number of iterations that failed.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Wall-clock time of the run.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Completed iterations per second over the whole run.
    ///
    /// Returns `0.0` for a run that ended before any time elapsed.
    pub fn requests_per_second(&self) -> f64 {
        let seconds = self.duration.as_secs_f64();
        if seconds > 0.0 {
            self.iterations() as f64 / seconds
        } else {
            0.0
        }
    }

    /// The latency of successful requests at quantile `q`, between `0.0` and `1.0`.
    ///
    /// Returns `None` if no request succeeded.
    pub fn latency_quantile(&self, q: f64) -> Option<Duration> {
        let seconds = self.latency.quantile(q).ok()??;
        Some(Duration::from_secs_f64(seconds.max(0.0)))
    }

    fn average_latency(&self) -> Option<Duration> {
        let count = self.latency.count();
        let sum = self.latency.sum()?;
        (count > 0).then(|| Duration::from_secs_f64(sum / count as f64))
    }
}

impl fmt::Debug for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Report")
            .field("name", &self.name)
            .field("users", &self.users)
            .field("duration", &self.duration)
            .field("successes", &self.successes())
            .field("failures", &self.failures)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} {} (users: {}, duration: {:.2?})",
            "## Scenario".bold(),
            self.name.bold().blue(),
            self.users.bold(),
            self.duration
        )?;

        write!(
            f,
            "{} ({} ops",
            "ADD:".bold().green(),
            self.iterations().bold()
        )?;
        if self.failures > 0 {
            write!(
                f,
                ", {}",
                format!("{} FAILURES", self.failures).bold().red()
            )?;
        }
        writeln!(f, ")")?;
        write!(
            f,
            "  {:.2} operations/s",
            self.requests_per_second().bold()
        )?;

        let (Some(avg), Some(p50), Some(p90), Some(p99)) = (
            self.average_latency(),
            self.latency_quantile(0.5),
            self.latency_quantile(0.9),
            self.latency_quantile(0.99),
        ) else {
            return writeln!(f);
        };

        writeln!(f)?;
        write!(
            f,
            "  avg: {:.2?}; p50: {p50:.2?}; p90: {p90:.2?}; p99: {p99:.2?}",
            avg.bold()
        )
    }
}
