//! The lottery contract on a Fuel network, behind [`LotteryContract`].

use crate::{
    account::Account,
    action::ActionRequest,
    binding::LotteryBinder,
    contract::{
        Inclusion,
        LotteryContract,
        PendingSubmission,
    },
    error::{
        BindError,
        ReadFailure,
        SubmissionFailure,
    },
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use fuels::{
    accounts::{
        ViewOnlyAccount,
        wallet::Wallet,
    },
    prelude::{
        AssetId,
        CallParameters,
        ContractId,
        Execution,
        TxPolicies,
        VariableOutputPolicy,
    },
    programs::responses::CallResponse,
    types::Address,
};
use futures::{
    FutureExt,
    future::LocalBoxFuture,
};
use generated_abi::{
    lottery_instance,
    lottery_types::Lottery,
};
use std::{
    collections::HashMap,
    future::Future,
    str::FromStr,
};

pub fn account_from_address(address: Address) -> Account {
    Account::new(format!("0x{}", hex::encode::<[u8; 32]>(address.into())))
}

pub fn wallet_account(wallet: &Wallet) -> Account {
    let address: Address = wallet.address().into();
    account_from_address(address)
}

pub fn parse_contract_id(raw: &str) -> Result<ContractId> {
    ContractId::from_str(raw.trim()).map_err(|e| eyre!("Invalid contract id '{raw}': {e}"))
}

fn read_failure(query: &'static str) -> impl FnOnce(fuels::types::errors::Error) -> ReadFailure {
    move |err| ReadFailure::new(query, err.to_string())
}

fn rejected(err: fuels::types::errors::Error) -> SubmissionFailure {
    SubmissionFailure::new(err.to_string())
}

fn included<T>(response: CallResponse<T>) -> Inclusion {
    Inclusion {
        tx_id: response
            .tx_id
            .map(|id| format!("0x{}", hex::encode::<[u8; 32]>(id.into()))),
    }
}

/// A lottery handle whose calls are signed by one unlocked wallet.
#[derive(Clone, Debug)]
pub struct FuelLottery {
    instance: Lottery<Wallet>,
    base_asset_id: AssetId,
    account: Account,
}

impl FuelLottery {
    pub fn new(contract_id: ContractId, base_asset_id: AssetId, wallet: Wallet) -> Self {
        let account = wallet_account(&wallet);
        Self {
            instance: lottery_instance(contract_id, wallet),
            base_asset_id,
            account,
        }
    }
}

/// A submitted transaction waiting for its block.
pub struct FuelSubmission(LocalBoxFuture<'static, Result<Inclusion, SubmissionFailure>>);

impl PendingSubmission for FuelSubmission {
    fn wait(self) -> impl Future<Output = Result<Inclusion, SubmissionFailure>> {
        self.0
    }
}

impl LotteryContract for FuelLottery {
    type Pending = FuelSubmission;

    fn account(&self) -> &Account {
        &self.account
    }

    async fn is_complete(&self) -> Result<bool, ReadFailure> {
        let response = self
            .instance
            .methods()
            .is_complete()
            .simulate(Execution::realistic())
            .await
            .map_err(read_failure("is_complete"))?;
        Ok(response.value)
    }

    async fn winner(&self) -> Result<Option<Account>, ReadFailure> {
        let response = self
            .instance
            .methods()
            .get_winner()
            .simulate(Execution::realistic())
            .await
            .map_err(read_failure("get_winner"))?;
        let winner = response.value;
        Ok((winner != Address::zeroed()).then(|| account_from_address(winner)))
    }

    async fn manager(&self) -> Result<Account, ReadFailure> {
        let response = self
            .instance
            .methods()
            .get_manager()
            .simulate(Execution::realistic())
            .await
            .map_err(read_failure("get_manager"))?;
        Ok(account_from_address(response.value))
    }

    async fn submit(&self, request: ActionRequest) -> Result<FuelSubmission, SubmissionFailure> {
        let methods = self.instance.methods();
        let pending = match request {
            ActionRequest::Enter { stake, gas_limit } => {
                let call = CallParameters::new(stake, self.base_asset_id, gas_limit);
                let submitted = methods
                    .enter()
                    .call_params(call)
                    .map_err(rejected)?
                    .with_tx_policies(TxPolicies::default().with_script_gas_limit(gas_limit))
                    .submit()
                    .await
                    .map_err(rejected)?;
                async move { submitted.response().await.map(included).map_err(rejected) }
                    .boxed_local()
            }
            ActionRequest::PickWinner => {
                let submitted = methods.pick_winner().submit().await.map_err(rejected)?;
                async move { submitted.response().await.map(included).map_err(rejected) }
                    .boxed_local()
            }
            ActionRequest::ClaimPrize => {
                let submitted = methods
                    .claim_prize()
                    .with_variable_output_policy(VariableOutputPolicy::EstimateMinimum)
                    .submit()
                    .await
                    .map_err(rejected)?;
                async move { submitted.response().await.map(included).map_err(rejected) }
                    .boxed_local()
            }
            ActionRequest::Reset => {
                let submitted = methods.reset_lottery().submit().await.map_err(rejected)?;
                async move { submitted.response().await.map(included).map_err(rejected) }
                    .boxed_local()
            }
        };
        Ok(FuelSubmission(pending))
    }
}

/// Binds the lottery contract for any account we hold a signer for.
#[derive(Clone, Debug)]
pub struct FuelBinder {
    contract_id: ContractId,
    base_asset_id: AssetId,
    signers: HashMap<Account, Wallet>,
}

impl FuelBinder {
    pub fn new<'a>(
        contract_id: ContractId,
        base_asset_id: AssetId,
        wallets: impl IntoIterator<Item = &'a Wallet>,
    ) -> Self {
        let signers = wallets
            .into_iter()
            .map(|wallet| (wallet_account(wallet), wallet.clone()))
            .collect();
        Self {
            contract_id,
            base_asset_id,
            signers,
        }
    }
}

impl LotteryBinder for FuelBinder {
    type Contract = FuelLottery;

    fn bind(&self, account: &Account) -> Result<FuelLottery, BindError> {
        let wallet = self.signers.get(account).ok_or_else(|| BindError {
            account: account.clone(),
            reason: "no unlocked wallet holds this address".to_string(),
        })?;
        Ok(FuelLottery::new(
            self.contract_id,
            self.base_asset_id,
            wallet.clone(),
        ))
    }
}
