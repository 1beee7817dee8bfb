use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tracing::info;

use arsim_build::{Build, Bundler, Fetcher};
use arsim_store::{FilesystemStore, Ledger, TransactionStore, WalletLedger};

use crate::config::ServeConfig;
use crate::error::ServerResult;
use crate::livereload::LiveReloadEvent;
use crate::network::NetworkClient;

const EVENT_CAPACITY: usize = 16;

/// Everything one `serve` run shares between request handlers, the build
/// scheduler, and live-reload connections.
pub struct Session {
    config: ServeConfig,
    entry: PathBuf,
    ledger: Ledger,
    network: Arc<dyn NetworkClient>,
    bundler: Bundler,
    builds: watch::Sender<Option<Arc<Build>>>,
    building: AtomicBool,
    events: broadcast::Sender<LiveReloadEvent>,
}

impl Session {
    pub fn new(
        config: ServeConfig,
        entry: impl Into<PathBuf>,
        ledger: Ledger,
        network: Arc<dyn NetworkClient>,
        bundler: Bundler,
    ) -> Self {
        let (builds, _) = watch::channel(None);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            config,
            entry: entry.into(),
            ledger,
            network,
            bundler,
            builds,
            building: AtomicBool::new(false),
            events,
        }
    }

    /// Open the filesystem store under `data_dir`, seed wallets from config,
    /// and replay stored transactions. Fails if the store is not usable.
    pub async fn open(
        config: ServeConfig,
        entry: impl Into<PathBuf>,
        data_dir: &Path,
        network: Arc<dyn NetworkClient>,
        fetcher: Arc<dyn Fetcher>,
    ) -> ServerResult<Self> {
        let store: Arc<dyn TransactionStore> = Arc::new(FilesystemStore::new(data_dir));
        let wallets = WalletLedger::with_balances(config.seed_balances());
        let ledger = Ledger::open(store, wallets).await?;
        info!(
            data_dir = %data_dir.display(),
            wallets = ledger.wallets().len(),
            "store ready"
        );
        Ok(Self::new(config, entry, ledger, network, Bundler::new(fetcher)))
    }

    pub fn config(&self) -> &ServeConfig {
        &self.config
    }

    pub fn entry(&self) -> &Path {
        &self.entry
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn store(&self) -> &Arc<dyn TransactionStore> {
        self.ledger.store()
    }

    pub fn network(&self) -> &Arc<dyn NetworkClient> {
        &self.network
    }

    pub fn bundler(&self) -> &Bundler {
        &self.bundler
    }

    /// The latest complete build, if one has finished.
    pub fn current_build(&self) -> Option<Arc<Build>> {
        self.builds.borrow().clone()
    }

    /// Resolves once a build exists; immediately if one already does.
    pub async fn wait_for_build(&self) -> Option<Arc<Build>> {
        let mut rx = self.builds.subscribe();
        let build = rx.wait_for(Option::is_some).await.ok()?;
        (*build).clone()
    }

    /// Replace the current build wholesale.
    pub fn install_build(&self, build: Build) -> Arc<Build> {
        let build = Arc::new(build);
        self.builds.send_replace(Some(build.clone()));
        build
    }

    /// Claim the single build slot. `None` while another build holds it.
    pub fn try_begin_build(&self) -> Option<BuildSlot<'_>> {
        self.building
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BuildSlot { flag: &self.building })
    }

    pub fn is_building(&self) -> bool {
        self.building.load(Ordering::Acquire)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LiveReloadEvent> {
        self.events.subscribe()
    }

    /// Send to every live-reload connection. No connections is not an error.
    pub fn publish(&self, event: LiveReloadEvent) {
        let _ = self.events.send(event);
    }
}

/// Held for the duration of one build; releases the slot on drop.
pub struct BuildSlot<'a> {
    flag: &'a AtomicBool,
}

impl Drop for BuildSlot<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
