use fuels::{
    accounts::wallet::Wallet,
    types::ContractId,
};

pub mod lottery_types {
    use fuels::macros::abigen;

    abigen!(Contract(
        name = "Lottery",
        abi = "sway-projects/lottery/out/release/lottery-abi.json"
    ));
}

/// Typed handle to the deployed lottery contract, signing with `wallet`.
pub fn lottery_instance(id: ContractId, wallet: Wallet) -> lottery_types::Lottery<Wallet> {
    lottery_types::Lottery::new(id, wallet)
}
