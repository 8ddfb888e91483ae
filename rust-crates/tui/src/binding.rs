use crate::{
    account::Account,
    contract::LotteryContract,
    error::{
        BindError,
        SessionError,
    },
};

/// Produces contract handles signed by a given account.
pub trait LotteryBinder {
    type Contract: LotteryContract + Clone + 'static;

    fn bind(&self, account: &Account) -> Result<Self::Contract, BindError>;
}

/// Bumped on every rebind; results tagged with an older generation are stale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

#[derive(Clone, Debug)]
pub struct Bound<C> {
    pub generation: Generation,
    pub contract: C,
}

/// The one live contract handle, derived from the current account.
#[derive(Debug)]
pub struct ContractBinding<C> {
    current: Option<Bound<C>>,
    generation: Generation,
}

impl<C> Default for ContractBinding<C> {
    fn default() -> Self {
        Self {
            current: None,
            generation: Generation::default(),
        }
    }
}

impl<C: LotteryContract + Clone> ContractBinding<C> {
    /// Drop whatever handle exists and bind a fresh one for `account`.
    ///
    /// The generation moves forward even when unbinding or when binding
    /// fails, so nothing issued under the old handle can be applied later.
    pub fn rebind<B>(
        &mut self,
        binder: &B,
        account: Option<&Account>,
    ) -> Result<Option<Generation>, BindError>
    where
        B: LotteryBinder<Contract = C>,
    {
        self.generation = self.generation.next();
        self.current = None;
        let Some(account) = account else {
            return Ok(None);
        };
        let contract = binder.bind(account)?;
        self.current = Some(Bound {
            generation: self.generation,
            contract,
        });
        Ok(Some(self.generation))
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.current
            .as_ref()
            .is_some_and(|bound| bound.generation == generation)
    }

    pub fn bound_account(&self) -> Option<&Account> {
        self.current.as_ref().map(|bound| bound.contract.account())
    }

    /// The live handle, provided it was bound for `account`.
    pub fn handle_for(&self, account: &Account) -> Result<Option<&Bound<C>>, SessionError> {
        match &self.current {
            Some(bound) if bound.contract.account().matches(account) => Ok(Some(bound)),
            Some(bound) => Err(SessionError::StaleHandleUse {
                bound: bound.contract.account().clone(),
                requested: account.clone(),
            }),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::test_helpers::{
        FakeBinder,
        FakeContract,
        FakeLedger,
    };

    fn binding() -> (ContractBinding<FakeContract>, FakeBinder) {
        let ledger = FakeLedger::new(Account::from("0xMANAGER"));
        (ContractBinding::default(), ledger.binder())
    }

    #[test]
    fn rebind__binds_the_new_account_under_a_new_generation() {
        // given
        let (mut binding, binder) = binding();
        let first = binding
            .rebind(&binder, Some(&Account::from("0xAAA")))
            .unwrap()
            .unwrap();

        // when
        let second = binding
            .rebind(&binder, Some(&Account::from("0xBBB")))
            .unwrap()
            .unwrap();

        // then
        assert!(second > first);
        assert!(!binding.is_current(first));
        assert!(binding.is_current(second));
        assert_eq!(binding.bound_account(), Some(&Account::from("0xBBB")));
    }

    #[test]
    fn rebind__to_no_account_drops_the_handle() {
        // given
        let (mut binding, binder) = binding();
        let first = binding
            .rebind(&binder, Some(&Account::from("0xAAA")))
            .unwrap()
            .unwrap();

        // when
        let result = binding.rebind(&binder, None).unwrap();

        // then
        assert_eq!(result, None);
        assert!(!binding.is_current(first));
        assert_eq!(binding.bound_account(), None);
        assert!(
            binding
                .handle_for(&Account::from("0xAAA"))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn rebind__failure_leaves_no_handle_behind() {
        // given
        let (mut binding, binder) = binding();
        binding
            .rebind(&binder, Some(&Account::from("0xAAA")))
            .unwrap();
        binder.refuse(Account::from("0xBBB"));

        // when
        let result = binding.rebind(&binder, Some(&Account::from("0xBBB")));

        // then
        assert!(result.is_err());
        assert_eq!(binding.bound_account(), None);
    }

    #[test]
    fn handle_for__refuses_a_handle_bound_to_someone_else() {
        // given
        let (mut binding, binder) = binding();
        binding
            .rebind(&binder, Some(&Account::from("0xAAA")))
            .unwrap();

        // when
        let same = binding.handle_for(&Account::from("0xaaa"));
        let other = binding.handle_for(&Account::from("0xBBB"));

        // then
        assert!(matches!(same, Ok(Some(_))));
        assert_eq!(
            other.err(),
            Some(SessionError::StaleHandleUse {
                bound: Account::from("0xAAA"),
                requested: Account::from("0xBBB"),
            })
        );
    }
}
