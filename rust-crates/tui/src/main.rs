use clap::Parser;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use deployments::DeploymentStore;
use fuels::prelude::{
    ContractId,
    Provider,
};
use futures::StreamExt;
use lottery_client::{
    LotterySession,
    config::{
        AppConfig,
        Args,
    },
    fuel::{
        FuelBinder,
        parse_contract_id,
    },
    ui::{
        self,
        UserEvent,
    },
    wallets::{
        AccountSwitcher,
        Keystore,
        KeystoreWallets,
    },
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

const LOG_FILE: &str = "lottery-tui.log";

fn init_tracing(config: &AppConfig) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&config.log_dir)
        .wrap_err_with(|| format!("creating log directory {}", config.log_dir.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(&config.log_dir, LOG_FILE));
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| eyre!("installing tracing subscriber: {e}"))?;
    Ok(guard)
}

fn resolve_contract_id(config: &AppConfig) -> Result<ContractId> {
    if let Some(raw) = config.contract_id.as_deref() {
        return parse_contract_id(raw);
    }
    let env = config.network.deployment_env();
    let store = DeploymentStore::new(env).map_err(|e| eyre!(e))?;
    let record = store
        .load()
        .map_err(|e| eyre!(e))?
        .ok_or_else(|| {
            eyre!(
                "No {env} deployment recorded in {}; pass --contract-id",
                store.path().display()
            )
        })?;
    parse_contract_id(&record.contract_id)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let config = AppConfig::from_args(Args::parse())?;
    let _guard = init_tracing(&config)?;
    tracing::info!(network = %config.network.url(), "starting lottery client");

    let keystore = Keystore::require(&config.wallet_dir)?;
    deployments::ensure_structure().map_err(|e| eyre!(e))?;

    let contract_id = resolve_contract_id(&config)?;
    let provider = Provider::connect(config.network.url())
        .await
        .wrap_err("failed to connect to provider")?;
    let base_asset_id = *provider
        .consensus_parameters()
        .await
        .wrap_err("fetching consensus parameters")?
        .base_asset_id();

    let unlocked = keystore.unlock_all(&config.wallet_names, &provider);
    let (wallets, switcher) = KeystoreWallets::new(unlocked);
    let session = LotterySession::start(Some(wallets), |wallets: &KeystoreWallets| {
        FuelBinder::new(contract_id, base_asset_id, wallets.signers())
    })
    .await?;

    run_app(session, switcher).await
}

async fn run_app(
    mut session: LotterySession<KeystoreWallets, FuelBinder>,
    mut switcher: AccountSwitcher,
) -> Result<()> {
    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::input_event_stream();

    ui::terminal_enter(&mut ui_state)?;
    tracing::info!("UI ready");
    let res = run_loop(&mut session, &mut switcher, &mut ui_state, &mut input_events).await;
    session.close();
    ui::terminal_exit(&mut ui_state)?;
    res
}

async fn run_loop(
    session: &mut LotterySession<KeystoreWallets, FuelBinder>,
    switcher: &mut AccountSwitcher,
    ui_state: &mut ui::UiState,
    input_events: &mut crossterm::event::EventStream,
) -> Result<()> {
    ui::draw(ui_state, &session.view()).wrap_err("initial draw failed")?;
    loop {
        tokio::select! {
            maybe_input = input_events.next() => {
                let Some(input) = maybe_input else {
                    tracing::warn!("terminal input closed");
                    break;
                };
                let input = input.wrap_err("reading terminal input failed")?;
                match ui::interpret(&input) {
                    Some(UserEvent::Quit) => break,
                    Some(UserEvent::Invoke(kind)) => {
                        let outcome = session.invoke(kind);
                        tracing::debug!(?outcome, "invoke");
                    }
                    Some(UserEvent::NextAccount) => {
                        switcher.next();
                    }
                    Some(UserEvent::Disconnect) => {
                        switcher.disconnect();
                    }
                    None => {}
                }
            }
            Some(event) = session.next_event() => {
                tracing::debug!(?event, "session event");
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("ctrl-c received");
                break;
            }
        }
        ui::draw(ui_state, &session.view()).wrap_err("draw failed")?;
    }
    Ok(())
}
