use std::collections::HashMap;
use std::sync::RwLock;

use arsim_types::{Address, Wallet, Winston};

/// Fields to change on a wallet. `None` leaves the current value.
#[derive(Clone, Debug, Default)]
pub struct WalletUpdate {
    pub balance: Option<Winston>,
    pub last_tx: Option<String>,
}

/// In-memory wallet balances for one session.
///
/// Wallets are created on first write with zero balance and an empty last
/// transaction; later writes merge only the supplied fields.
pub struct WalletLedger {
    wallets: RwLock<HashMap<Address, Wallet>>,
}

impl WalletLedger {
    pub fn new() -> Self {
        Self {
            wallets: RwLock::new(HashMap::new()),
        }
    }

    /// Seed wallets with starting balances.
    pub fn with_balances(balances: impl IntoIterator<Item = (Address, Winston)>) -> Self {
        let wallets = balances
            .into_iter()
            .map(|(address, balance)| {
                let wallet = Wallet {
                    balance,
                    ..Wallet::new(address.clone())
                };
                (address, wallet)
            })
            .collect();
        Self {
            wallets: RwLock::new(wallets),
        }
    }

    pub fn has_wallet(&self, address: &Address) -> bool {
        self.wallets
            .read()
            .expect("lock poisoned")
            .contains_key(address)
    }

    pub fn get_wallet(&self, address: &Address) -> Option<Wallet> {
        self.wallets.read().expect("lock poisoned").get(address).cloned()
    }

    /// Balance of `address`, zero for unknown wallets.
    pub fn balance(&self, address: &Address) -> Winston {
        self.get_wallet(address)
            .map(|w| w.balance)
            .unwrap_or_default()
    }

    pub fn update_wallet(&self, address: &Address, update: WalletUpdate) -> Wallet {
        let mut wallets = self.wallets.write().expect("lock poisoned");
        let wallet = wallets
            .entry(address.clone())
            .or_insert_with(|| Wallet::new(address.clone()));
        if let Some(balance) = update.balance {
            wallet.balance = balance;
        }
        if let Some(last_tx) = update.last_tx {
            wallet.last_tx = last_tx;
        }
        wallet.clone()
    }

    pub fn len(&self) -> usize {
        self.wallets.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for WalletLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WalletLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletLedger")
            .field("wallet_count", &self.len())
            .finish()
    }
}
