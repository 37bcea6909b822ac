//! Periodic lease polling. Fetches the raw lease listing on a fixed interval,
//! parses it, and swaps the cache snapshot. Any failure clears the cache: a
//! broken upstream means "nobody is present", never stale data.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tokio::time;

use super::cache::LeaseCache;
use super::parse_leases;

/// Side effect run after every poll cycle, success or failure. Used to
/// recompute the presence view and push it out. Errors are reported per
/// cycle and never stop the polling loop.
pub type CycleHook = Arc<dyn Fn() -> BoxFuture<'static, Result<(), String>> + Send + Sync>;

/// Result of one Idle -> Fetching -> {Success, Failure} -> Idle cycle.
#[derive(Debug)]
pub enum PollOutcome {
    Success { lease_count: usize },
    Failure { reason: String },
}

pub struct LeasePoller {
    cache: Arc<LeaseCache>,
    endpoint: String,
    interval: Duration,
    client: reqwest::Client,
    hook: Option<CycleHook>,
}

impl LeasePoller {
    pub fn new(
        cache: Arc<LeaseCache>,
        endpoint: String,
        interval: Duration,
        fetch_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| format!("Failed to build lease source client: {}", e))?;

        Ok(Self {
            cache,
            endpoint,
            interval,
            client,
            hook: None,
        })
    }

    pub fn with_hook(mut self, hook: CycleHook) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Start polling: once immediately, then every interval regardless of the
    /// prior outcome. Runs for the lifetime of the process.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            println!(
                "Starting lease poller against {} every {}s",
                self.endpoint,
                self.interval.as_secs()
            );
            let mut ticker = time::interval(self.interval);
            loop {
                ticker.tick().await;
                match self.poll_once().await {
                    PollOutcome::Success { lease_count } => {
                        println!("Fetched {} DHCP leases", lease_count);
                    }
                    PollOutcome::Failure { reason } => {
                        eprintln!("Lease poll failed, clearing cache: {}", reason);
                    }
                }
                // Cache replacement above strictly precedes the hook, so the
                // presence view never runs against a superseded snapshot.
                self.run_hook().await;
            }
        })
    }

    /// One full fetch-and-apply cycle.
    pub async fn poll_once(&self) -> PollOutcome {
        let fetched = self.fetch().await;
        self.apply_fetch(fetched)
    }

    async fn fetch(&self) -> Result<String, String> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| format!("request error: {}", e))?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(format!("lease source returned {}", status));
        }

        response
            .text()
            .await
            .map_err(|e| format!("body read error: {}", e))
    }

    /// Apply a fetch result to the cache: install the parsed snapshot on
    /// success, clear the cache on any failure (fetch or parse).
    pub fn apply_fetch(&self, fetched: Result<String, String>) -> PollOutcome {
        let parsed = fetched.and_then(|payload| parse_leases(&payload).map_err(|e| e.to_string()));
        match parsed {
            Ok(leases) => {
                let lease_count = leases.len();
                self.cache.replace(leases);
                PollOutcome::Success { lease_count }
            }
            Err(reason) => {
                self.cache.replace(Vec::new());
                PollOutcome::Failure { reason }
            }
        }
    }

    /// Await the registered hook, isolating its failures to this cycle. A
    /// panicking hook surfaces as a JoinError and the loop carries on.
    async fn run_hook(&self) {
        let Some(hook) = &self.hook else {
            return;
        };
        match tokio::spawn(hook()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => eprintln!("Post-poll hook failed: {}", e),
            Err(e) => eprintln!("Post-poll hook panicked: {}", e),
        }
    }
}
