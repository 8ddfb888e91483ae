//! forc-wallet keystores as the wallet collaborator.
//!
//! A keystore directory that does not exist means no wallet is installed.
//! The accounts a user authorizes are the wallets they unlock on startup;
//! account switching happens in-process through [`AccountSwitcher`].

use crate::{
    account::Account,
    error::{
        SessionError,
        WalletError,
    },
    fuel::wallet_account,
    identity::{
        AccountNotifier,
        AccountSubscription,
        WalletBridge,
    },
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use eth_keystore::decrypt_key;
use fuels::{
    crypto::SecretKey,
    prelude::{
        Provider,
        Wallet,
        derivation::DEFAULT_DERIVATION_PATH,
        private_key::PrivateKeySigner,
    },
};
use rpassword::prompt_password;
use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};
use tracing::{
    info,
    warn,
};

const WALLET_EXTENSION: &str = "wallet";
const MIN_MNEMONIC_WORDS: usize = 12;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalletDescriptor {
    pub name: String,
    pub path: PathBuf,
}

pub fn default_wallet_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").wrap_err("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".fuel").join("wallets"))
}

pub fn resolve_wallet_dir(dir: Option<&str>) -> Result<PathBuf> {
    match dir {
        Some(raw) => Ok(PathBuf::from(shellexpand::tilde(raw).into_owned())),
        None => default_wallet_dir(),
    }
}

/// The `*.wallet` files of one keystore directory.
#[derive(Clone, Debug)]
pub struct Keystore {
    dir: PathBuf,
    wallets: Vec<WalletDescriptor>,
}

impl Keystore {
    /// `None` when `dir` does not exist.
    pub fn discover(dir: &Path) -> Result<Option<Self>> {
        if !dir.is_dir() {
            return Ok(None);
        }
        let mut wallets = Vec::new();
        let entries = fs::read_dir(dir)
            .wrap_err_with(|| format!("Failed to read wallet directory {}", dir.display()))?;
        for entry in entries {
            let path = entry.wrap_err("Failed to read wallet entry")?.path();
            if !path.is_file()
                || path.extension().and_then(|ext| ext.to_str()) != Some(WALLET_EXTENSION)
            {
                continue;
            }
            let name = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .ok_or_else(|| eyre!("Invalid wallet filename {:?}", path))?
                .to_owned();
            wallets.push(WalletDescriptor { name, path });
        }
        wallets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Some(Self {
            dir: dir.to_path_buf(),
            wallets,
        }))
    }

    /// Like [`Keystore::discover`], but a missing keystore is an error that
    /// carries [`SessionError::WalletUnavailable`].
    pub fn require(dir: &Path) -> Result<Self> {
        match Self::discover(dir)? {
            Some(keystore) => Ok(keystore),
            None => {
                warn!(dir = %dir.display(), "no keystore found");
                Err(SessionError::WalletUnavailable.into())
            }
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn wallets(&self) -> &[WalletDescriptor] {
        &self.wallets
    }

    pub fn find(&self, name: &str) -> Result<&WalletDescriptor> {
        self.wallets
            .iter()
            .find(|w| w.name == name)
            .ok_or_else(|| eyre!("Wallet '{name}' not found in {}", self.dir.display()))
    }

    /// Prompt for each named wallet's password and unlock it.
    ///
    /// Wallets that fail to unlock are reported and skipped, so a typo in
    /// one password does not lock the user out of the others.
    pub fn unlock_all(&self, names: &[String], provider: &Provider) -> UnlockedWallets {
        let mut unlocked = UnlockedWallets::default();
        for name in names {
            let result = self.find(name).and_then(|descriptor| {
                let prompt = format!("Enter password for wallet '{}': ", descriptor.name);
                let password =
                    prompt_password(prompt).wrap_err("Failed to read wallet password")?;
                unlock_wallet(descriptor, &password, provider)
            });
            match result {
                Ok(wallet) => {
                    info!(wallet = %name, account = %wallet_account(&wallet), "wallet unlocked");
                    unlocked.wallets.push(wallet);
                }
                Err(err) => {
                    warn!(wallet = %name, error = %err, "wallet not unlocked");
                    unlocked.failures.push(format!("{name}: {err}"));
                }
            }
        }
        unlocked
    }
}

pub fn unlock_wallet(
    descriptor: &WalletDescriptor,
    password: &str,
    provider: &Provider,
) -> Result<Wallet> {
    let secret = decrypt_key(&descriptor.path, password.as_bytes())
        .map_err(|_| eyre!("Invalid password for wallet '{}'", descriptor.name))?;
    let signer = signer_from_secret(&secret).ok_or_else(|| {
        eyre!(
            "Wallet '{}' contained unsupported key material",
            descriptor.name
        )
    })?;
    Ok(Wallet::new(signer, provider.clone()))
}

/// Keystores hold either a raw 32 byte key or a BIP-39 phrase.
pub fn signer_from_secret(secret: &[u8]) -> Option<PrivateKeySigner> {
    if let Ok(secret_key) = SecretKey::try_from(secret) {
        return Some(PrivateKeySigner::new(secret_key));
    }
    let phrase = std::str::from_utf8(secret).ok()?;
    if phrase.split_whitespace().count() < MIN_MNEMONIC_WORDS {
        return None;
    }
    SecretKey::new_from_mnemonic_phrase_with_path(phrase, DEFAULT_DERIVATION_PATH)
        .ok()
        .map(PrivateKeySigner::new)
}

#[derive(Clone, Debug, Default)]
pub struct UnlockedWallets {
    pub wallets: Vec<Wallet>,
    pub failures: Vec<String>,
}

/// The unlocked wallets, exposed through [`WalletBridge`].
#[derive(Debug)]
pub struct KeystoreWallets {
    unlocked: UnlockedWallets,
    subscription: Option<AccountSubscription>,
}

impl KeystoreWallets {
    pub fn new(unlocked: UnlockedWallets) -> (Self, AccountSwitcher) {
        let (notifier, subscription) = AccountSubscription::channel();
        let accounts = unlocked.wallets.iter().map(wallet_account).collect();
        let switcher = AccountSwitcher::new(accounts, notifier);
        let wallets = Self {
            unlocked,
            subscription: Some(subscription),
        };
        (wallets, switcher)
    }

    pub fn signers(&self) -> &[Wallet] {
        &self.unlocked.wallets
    }
}

impl WalletBridge for KeystoreWallets {
    async fn request_accounts(&mut self) -> Result<Vec<Account>, WalletError> {
        if self.unlocked.wallets.is_empty() && !self.unlocked.failures.is_empty() {
            return Err(WalletError::Access(self.unlocked.failures.join("; ")));
        }
        Ok(self.unlocked.wallets.iter().map(wallet_account).collect())
    }

    fn subscribe(&mut self) -> AccountSubscription {
        self.subscription
            .take()
            .unwrap_or_else(|| AccountSubscription::channel().1)
    }
}

/// Publishes account changes: rotate to the next authorized account, or
/// disconnect entirely.
#[derive(Debug)]
pub struct AccountSwitcher {
    accounts: Vec<Account>,
    active: Option<usize>,
    notifier: AccountNotifier,
}

impl AccountSwitcher {
    pub fn new(accounts: Vec<Account>, notifier: AccountNotifier) -> Self {
        let active = (!accounts.is_empty()).then_some(0);
        Self {
            accounts,
            active,
            notifier,
        }
    }

    pub fn active(&self) -> Option<&Account> {
        self.active.and_then(|i| self.accounts.get(i))
    }

    /// Authorized accounts with the active one first; empty when disconnected.
    pub fn published(&self) -> Vec<Account> {
        let Some(active) = self.active else {
            return Vec::new();
        };
        let mut accounts = self.accounts.clone();
        accounts.rotate_left(active);
        accounts
    }

    /// Move to the next account, reconnecting if disconnected.
    pub fn next(&mut self) -> bool {
        if self.accounts.is_empty() {
            return false;
        }
        let next = self.active.map_or(0, |i| (i + 1) % self.accounts.len());
        self.active = Some(next);
        self.notifier.notify(self.published())
    }

    pub fn disconnect(&mut self) -> bool {
        self.active = None;
        self.notifier.notify(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn discover__missing_directory_means_no_wallet() {
        // given
        let tmp = TempDir::new("keystore").unwrap();
        let missing = tmp.path().join("nope");

        // when
        let keystore = Keystore::discover(&missing).unwrap();

        // then
        assert!(keystore.is_none());
    }

    #[test]
    fn require__missing_directory_is_the_wallet_unavailable_error() {
        // given
        let tmp = TempDir::new("keystore").unwrap();
        let missing = tmp.path().join("nope");

        // when
        let err = Keystore::require(&missing).unwrap_err();

        // then
        assert_eq!(
            err.downcast_ref::<SessionError>(),
            Some(&SessionError::WalletUnavailable)
        );
        assert!(!missing.exists());
    }

    #[test]
    fn discover__lists_wallet_files_by_name() {
        // given
        let tmp = TempDir::new("keystore").unwrap();
        fs::write(tmp.path().join("bob.wallet"), "{}").unwrap();
        fs::write(tmp.path().join("alice.wallet"), "{}").unwrap();
        fs::write(tmp.path().join("notes.txt"), "").unwrap();
        fs::create_dir(tmp.path().join("dir.wallet")).unwrap();

        // when
        let keystore = Keystore::discover(tmp.path()).unwrap().unwrap();

        // then
        let names: Vec<_> = keystore.wallets().iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob"]);
        assert!(keystore.find("bob").is_ok());
        assert!(keystore.find("carol").is_err());
    }

    #[test]
    fn resolve_wallet_dir__expands_tilde() {
        let resolved = resolve_wallet_dir(Some("~/keys")).unwrap();
        assert!(!resolved.to_string_lossy().starts_with('~'));
        assert!(resolved.ends_with("keys"));
    }

    #[test]
    fn signer_from_secret__accepts_raw_keys_and_rejects_junk() {
        assert!(signer_from_secret(&[7u8; 32]).is_some());
        assert!(signer_from_secret(b"too short to be anything").is_none());
        assert!(signer_from_secret(&[0xFF; 5]).is_none());
    }

    fn accounts() -> Vec<Account> {
        vec![
            Account::from("0x01"),
            Account::from("0x02"),
            Account::from("0x03"),
        ]
    }

    #[tokio::test]
    async fn switcher__next_rotates_and_wraps() {
        // given
        let (notifier, mut subscription) = AccountSubscription::channel();
        let mut switcher = AccountSwitcher::new(accounts(), notifier);

        // when
        switcher.next();
        switcher.next();
        switcher.next();

        // then
        let first = subscription.next().await.unwrap();
        let second = subscription.next().await.unwrap();
        let third = subscription.next().await.unwrap();
        assert_eq!(first[0], Account::from("0x02"));
        assert_eq!(second[0], Account::from("0x03"));
        assert_eq!(third, accounts());
    }

    #[tokio::test]
    async fn switcher__disconnect_publishes_nothing_then_next_reconnects() {
        // given
        let (notifier, mut subscription) = AccountSubscription::channel();
        let mut switcher = AccountSwitcher::new(accounts(), notifier);

        // when
        switcher.disconnect();
        switcher.next();

        // then
        assert_eq!(subscription.next().await, Some(Vec::new()));
        assert_eq!(subscription.next().await, Some(accounts()));
        assert_eq!(switcher.active(), Some(&Account::from("0x01")));
    }

    #[test]
    fn switcher__with_no_accounts_never_publishes() {
        let (notifier, _subscription) = AccountSubscription::channel();
        let mut switcher = AccountSwitcher::new(Vec::new(), notifier);
        assert!(!switcher.next());
        assert!(switcher.published().is_empty());
    }
}
