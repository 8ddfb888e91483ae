use clap::{
    ArgGroup,
    Parser,
};
use color_eyre::eyre::Result;
use deployments::DeploymentEnv;
use std::path::PathBuf;

use crate::wallets::resolve_wallet_dir;

pub const DEFAULT_TESTNET_RPC_URL: &str = "https://testnet.fuel.network";
pub const DEFAULT_DEVNET_RPC_URL: &str = "https://devnet.fuel.network";
pub const DEFAULT_LOCAL_RPC_URL: &str = "http://localhost:4000/";
pub const DEFAULT_LOG_DIR: &str = "logs";

#[derive(Parser, Debug)]
#[command(
    name = "lottery-tui",
    about = "Enter, draw and claim a Fuel lottery from the terminal",
    version,
    group(
        ArgGroup::new("network")
            .args(["devnet", "testnet", "local"])
            .required(true)
    )
)]
pub struct Args {
    /// Connect to Fuel devnet
    #[arg(long)]
    pub devnet: bool,

    /// Connect to Fuel testnet
    #[arg(long)]
    pub testnet: bool,

    /// Connect to a local Fuel node
    #[arg(long)]
    pub local: bool,

    /// Override the RPC URL for the selected network
    #[arg(long)]
    pub rpc_url: Option<String>,

    /// forc-wallet profile to unlock; repeat to authorize several accounts
    #[arg(long = "wallet", value_name = "NAME")]
    pub wallets: Vec<String>,

    /// Override forc-wallet directory (defaults to ~/.fuel/wallets)
    #[arg(long)]
    pub wallet_dir: Option<String>,

    /// Lottery contract id (defaults to the recorded deployment)
    #[arg(long)]
    pub contract_id: Option<String>,

    /// Directory for the rolling log file
    #[arg(long, default_value = DEFAULT_LOG_DIR)]
    pub log_dir: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NetworkTarget {
    Devnet { url: String },
    Testnet { url: String },
    LocalNode { url: String },
}

impl NetworkTarget {
    pub fn url(&self) -> &str {
        match self {
            NetworkTarget::Devnet { url }
            | NetworkTarget::Testnet { url }
            | NetworkTarget::LocalNode { url } => url,
        }
    }

    pub fn deployment_env(&self) -> DeploymentEnv {
        match self {
            NetworkTarget::Devnet { .. } => DeploymentEnv::Dev,
            NetworkTarget::Testnet { .. } => DeploymentEnv::Test,
            NetworkTarget::LocalNode { .. } => DeploymentEnv::Local,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub network: NetworkTarget,
    pub wallet_dir: PathBuf,
    pub wallet_names: Vec<String>,
    pub contract_id: Option<String>,
    pub log_dir: PathBuf,
}

impl AppConfig {
    pub fn from_args(args: Args) -> Result<Self> {
        let network = if args.devnet {
            NetworkTarget::Devnet {
                url: args
                    .rpc_url
                    .unwrap_or_else(|| DEFAULT_DEVNET_RPC_URL.to_string()),
            }
        } else if args.testnet {
            NetworkTarget::Testnet {
                url: args
                    .rpc_url
                    .unwrap_or_else(|| DEFAULT_TESTNET_RPC_URL.to_string()),
            }
        } else {
            NetworkTarget::LocalNode {
                url: args
                    .rpc_url
                    .unwrap_or_else(|| DEFAULT_LOCAL_RPC_URL.to_string()),
            }
        };
        Ok(Self {
            network,
            wallet_dir: resolve_wallet_dir(args.wallet_dir.as_deref())?,
            wallet_names: args.wallets,
            contract_id: args.contract_id,
            log_dir: args.log_dir,
        })
    }
}
