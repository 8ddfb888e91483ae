use std::{
    fmt,
    hash::{
        Hash,
        Hasher,
    },
};

/// A wallet-held identity address.
///
/// Addresses come back from the wallet and the contract in whatever case the
/// producer chose, so equality and hashing ignore ASCII case.
#[derive(Clone, Debug, Eq)]
pub struct Account(String);

impl Account {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, other: &Account) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }

    /// `0x1234…abcd` style label for narrow panels.
    pub fn short(&self) -> String {
        let raw = self.0.as_str();
        if raw.len() <= 14 {
            return raw.to_string();
        }
        let head = raw.get(..6).unwrap_or(raw);
        let tail = raw.get(raw.len() - 4..).unwrap_or_default();
        format!("{head}…{tail}")
    }
}

impl PartialEq for Account {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other)
    }
}

impl Hash for Account {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.0.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Account {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn eq__ignores_ascii_case() {
        assert_eq!(Account::from("0xAbCdEf"), Account::from("0xabcdef"));
        assert_ne!(Account::from("0xabcdef"), Account::from("0xabcde0"));
    }

    #[test]
    fn hash__agrees_with_case_insensitive_eq() {
        // given
        let mut seen = HashSet::new();
        seen.insert(Account::from("0xAAA"));

        // when
        let inserted = seen.insert(Account::from("0xaaa"));

        // then
        assert!(!inserted);
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn short__elides_the_middle_of_long_addresses() {
        let account = Account::new(format!("0x{}", "ab".repeat(32)));
        assert_eq!(account.short(), "0xabab…abab");
        assert_eq!(Account::from("0xBBB").short(), "0xBBB");
    }
}
