//! Per-symbol quote cache with background refresh.
//!
//! Lookups never block: they return the best known value and, when the entry
//! is unfetched or older than the TTL, schedule a fetch on the runtime. At most
//! one fetch per symbol is in flight; concurrent fetches across symbols are
//! bounded by the pool size. When a fetch completes the entry is updated first
//! and then every observer is notified, with no lock held.

use super::errors::{FetchError, QuoteError};
use super::money::Money;
use super::observers::ObserverRegistry;
use super::optional::OptionalValue;
use super::quote::{QuoteFetcher, QuoteSnapshot, fx_symbol};
use super::retry::{Backoff, with_retry};
use futures::future::{BoxFuture, FutureExt, Shared, join_all};
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{Semaphore, broadcast, oneshot};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_MAX_ATTEMPTS: usize = 5;
pub const DEFAULT_POOL_SIZE: usize = 8;
pub const DEFAULT_PRICE_FIELD: &str = "regularMarketPrice";

const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// Tunables of the refresh engine.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshPolicy {
    /// How long a fetched value counts as fresh.
    pub ttl: Duration,
    /// Attempts per fetch, counting the first one.
    pub max_attempts: usize,
    pub backoff: Backoff,
    /// Maximum number of fetches running at once.
    pub pool_size: usize,
    /// Numeric field read out of every quote record.
    pub price_field: String,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        RefreshPolicy {
            ttl: DEFAULT_TTL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Backoff::default(),
            pool_size: DEFAULT_POOL_SIZE,
            price_field: DEFAULT_PRICE_FIELD.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuoteState {
    Unfetched,
    Fetching,
    Fresh,
    Stale,
}

/// Broadcast to subscribers after each completed fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteUpdate {
    pub symbol: String,
    /// Cached value after the fetch; the previous value when it failed.
    pub value: OptionalValue,
    pub error: Option<QuoteError>,
}

type RefreshOutcome = Result<QuoteSnapshot, QuoteError>;
type SharedRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Awaitable outcome of a scheduled fetch. Cloning it yields another waiter
/// on the same fetch. Dropping it does not cancel the fetch.
#[derive(Clone)]
pub struct RefreshHandle(SharedRefresh);

impl Future for RefreshHandle {
    type Output = RefreshOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.0.poll_unpin(cx)
    }
}

struct QuoteEntry {
    symbol: String,
    value: OptionalValue,
    fetched_at: Option<Instant>,
    in_flight: Option<SharedRefresh>,
}

impl QuoteEntry {
    fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            value: OptionalValue::absent(),
            fetched_at: None,
            in_flight: None,
        }
    }

    fn state(&self, ttl: Duration) -> QuoteState {
        if self.in_flight.is_some() {
            return QuoteState::Fetching;
        }
        match (self.value.is_present(), self.fetched_at) {
            (true, Some(fetched_at)) if fetched_at.elapsed() <= ttl => QuoteState::Fresh,
            (true, _) => QuoteState::Stale,
            (false, _) => QuoteState::Unfetched,
        }
    }

    /// Sets the in-flight marker and returns the waiter handle together with
    /// the sender the fetch task reports through.
    fn mark_in_flight(&mut self) -> (RefreshHandle, oneshot::Sender<RefreshOutcome>) {
        let (tx, rx) = oneshot::channel();
        let symbol = self.symbol.clone();
        let shared = async move {
            rx.await
                .unwrap_or_else(|_| Err(QuoteError::Aborted(symbol)))
        }
        .boxed()
        .shared();
        self.in_flight = Some(shared.clone());
        (RefreshHandle(shared), tx)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Inner {
    fetcher: Arc<dyn QuoteFetcher>,
    policy: RefreshPolicy,
    entries: Mutex<HashMap<String, Arc<Mutex<QuoteEntry>>>>,
    observers: ObserverRegistry,
    updates: broadcast::Sender<QuoteUpdate>,
    permits: Semaphore,
    runtime: Handle,
}

impl Inner {
    async fn fetch_snapshot(&self, symbol: &str) -> RefreshOutcome {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| QuoteError::Aborted(symbol.to_string()))?;
        debug!("Fetching quote for {}", symbol);

        let record = with_retry(
            || self.fetcher.fetch(symbol),
            self.policy.max_attempts,
            self.policy.backoff,
            FetchError::is_transient,
        )
        .await?;
        let price = record.price(symbol, &self.policy.price_field)?;

        Ok(QuoteSnapshot {
            symbol: symbol.to_string(),
            price,
            short_name: record.short_name(),
        })
    }

    fn complete(&self, entry: &Mutex<QuoteEntry>, outcome: &RefreshOutcome) {
        let update = {
            let mut state = lock(entry);
            state.in_flight = None;
            match outcome {
                Ok(snapshot) => {
                    state.value = OptionalValue::present(snapshot.price);
                    state.fetched_at = Some(Instant::now());
                    info!("Quote for {} updated: {}", state.symbol, snapshot.price);
                }
                Err(e) => warn!("Refresh for {} failed: {}", state.symbol, e),
            }
            QuoteUpdate {
                symbol: state.symbol.clone(),
                value: state.value,
                error: outcome.as_ref().err().cloned(),
            }
        };

        // No subscribers is not an error.
        let _ = self.updates.send(update);
        self.observers.notify_all();
    }
}

/// Shared handle to the quote cache. Clones refer to the same entries.
#[derive(Clone)]
pub struct QuoteCache {
    inner: Arc<Inner>,
}

impl QuoteCache {
    /// Creates a cache whose fetches run on `runtime`.
    pub fn new(fetcher: Arc<dyn QuoteFetcher>, policy: RefreshPolicy, runtime: Handle) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        let permits = Semaphore::new(policy.pool_size.max(1));
        Self {
            inner: Arc::new(Inner {
                fetcher,
                policy,
                entries: Mutex::new(HashMap::new()),
                observers: ObserverRegistry::new(),
                updates,
                permits,
                runtime,
            }),
        }
    }

    pub fn policy(&self) -> &RefreshPolicy {
        &self.inner.policy
    }

    fn entry(&self, symbol: &str) -> Arc<Mutex<QuoteEntry>> {
        let mut entries = lock(&self.inner.entries);
        Arc::clone(entries.entry(symbol.to_string()).or_insert_with(|| {
            debug!("Tracking new symbol {}", symbol);
            Arc::new(Mutex::new(QuoteEntry::new(symbol)))
        }))
    }

    fn existing_entry(&self, symbol: &str) -> Result<Arc<Mutex<QuoteEntry>>, QuoteError> {
        lock(&self.inner.entries)
            .get(symbol)
            .cloned()
            .ok_or_else(|| QuoteError::UnknownSymbol(symbol.to_string()))
    }

    fn spawn_refresh(&self, entry: Arc<Mutex<QuoteEntry>>, tx: oneshot::Sender<RefreshOutcome>) {
        let inner = Arc::clone(&self.inner);
        let symbol = lock(&entry).symbol.clone();
        self.inner.runtime.spawn(async move {
            // A panicking fetcher still has to clear the in-flight marker.
            let outcome = AssertUnwindSafe(inner.fetch_snapshot(&symbol))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    error!("Fetch for {} panicked", symbol);
                    Err(QuoteError::Aborted(symbol.clone()))
                });
            inner.complete(&entry, &outcome);
            // The waiters may all be gone.
            let _ = tx.send(outcome);
        });
    }

    /// Returns the best known value for `symbol` without waiting. Schedules a
    /// background fetch when the entry is unfetched or stale.
    pub fn get_current_value(&self, symbol: &str) -> OptionalValue {
        let entry = self.entry(symbol);
        let (value, pending) = {
            let mut state = lock(&entry);
            let pending = match state.state(self.inner.policy.ttl) {
                QuoteState::Fresh => {
                    debug!("Cache HIT for {}", symbol);
                    None
                }
                QuoteState::Fetching => {
                    debug!("Fetch already in flight for {}", symbol);
                    None
                }
                QuoteState::Unfetched | QuoteState::Stale => {
                    debug!("Cache MISS for {}, scheduling refresh", symbol);
                    Some(state.mark_in_flight().1)
                }
            };
            (state.value, pending)
        };
        if let Some(tx) = pending {
            self.spawn_refresh(entry, tx);
        }
        value
    }

    /// Schedules a fetch even if the cached value is fresh. When a fetch is
    /// already in flight the returned handle waits on that one instead.
    pub fn force_refresh(&self, symbol: &str) -> RefreshHandle {
        let entry = self.entry(symbol);
        let (handle, pending) = {
            let mut state = lock(&entry);
            match &state.in_flight {
                Some(in_flight) => {
                    debug!("Joining in-flight fetch for {}", symbol);
                    (RefreshHandle(in_flight.clone()), None)
                }
                None => {
                    let (handle, tx) = state.mark_in_flight();
                    (handle, Some(tx))
                }
            }
        };
        if let Some(tx) = pending {
            self.spawn_refresh(entry, tx);
        }
        handle
    }

    /// Converts `amount` into `to_currency` using the cached exchange rate.
    /// Same-currency amounts are returned as is, without any lookup.
    pub fn convert(&self, amount: &Money, to_currency: &str) -> Money {
        if amount.currency() == to_currency {
            return amount.clone();
        }
        let rate = self.get_current_value(&fx_symbol(amount.currency(), to_currency));
        debug!(
            "Converting {} {} -> {} at {}",
            amount.value(),
            amount.currency(),
            to_currency,
            rate
        );
        Money::new(amount.value() * rate, to_currency)
    }

    /// Force-refreshes every symbol concurrently and waits for all of them.
    /// Fails with the first error, in input order.
    pub async fn check_symbols<I, S>(&self, symbols: I) -> Result<Vec<QuoteSnapshot>, QuoteError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let handles: Vec<RefreshHandle> = symbols
            .into_iter()
            .map(|symbol| self.force_refresh(symbol.as_ref()))
            .collect();
        let snapshots = join_all(handles)
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;
        for snapshot in &snapshots {
            info!(
                "Checked: {}",
                snapshot.short_name.as_deref().unwrap_or(&snapshot.symbol)
            );
        }
        Ok(snapshots)
    }

    /// Waits for every fetch that is in flight right now.
    pub async fn settle(&self) {
        let handles: Vec<RefreshHandle> = {
            let entries = lock(&self.inner.entries);
            entries
                .values()
                .filter_map(|entry| lock(entry).in_flight.clone().map(RefreshHandle))
                .collect()
        };
        join_all(handles).await;
    }

    pub fn register_observer(&self, name: impl Into<String>, callback: impl Fn() + Send + Sync + 'static) {
        self.inner.observers.register(name, callback);
    }

    pub fn remove_observer(&self, name: &str) -> bool {
        self.inner.observers.remove(name)
    }

    /// Channel form of the observer notification.
    pub fn subscribe(&self) -> broadcast::Receiver<QuoteUpdate> {
        self.inner.updates.subscribe()
    }

    /// Current state of a tracked symbol.
    pub fn state(&self, symbol: &str) -> Result<QuoteState, QuoteError> {
        let entry = self.existing_entry(symbol)?;
        let state = lock(&entry).state(self.inner.policy.ttl);
        Ok(state)
    }

    /// Cached value of a tracked symbol, without scheduling anything.
    pub fn peek(&self, symbol: &str) -> Result<OptionalValue, QuoteError> {
        let entry = self.existing_entry(symbol)?;
        let value = lock(&entry).value;
        Ok(value)
    }

    pub fn tracked_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = lock(&self.inner.entries).keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Number of fetches currently in flight.
    pub fn pending(&self) -> usize {
        lock(&self.inner.entries)
            .values()
            .filter(|entry| lock(entry).in_flight.is_some())
            .count()
    }
}
