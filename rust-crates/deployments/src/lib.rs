use anyhow::{
    Context,
    Result,
    anyhow,
};
use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    fs,
    path::{
        Path,
        PathBuf,
    },
};

pub const DEPLOYMENTS_ROOT: &str = ".deployments";
const DEPLOYMENTS_FILE: &str = "deployments.json";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeploymentEnv {
    Dev,
    Test,
    Local,
}

impl DeploymentEnv {
    pub const ALL: [DeploymentEnv; 3] =
        [DeploymentEnv::Dev, DeploymentEnv::Test, DeploymentEnv::Local];

    pub fn dir_name(self) -> &'static str {
        match self {
            DeploymentEnv::Dev => "dev",
            DeploymentEnv::Test => "test",
            DeploymentEnv::Local => "local",
        }
    }
}

impl fmt::Display for DeploymentEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeploymentEnv::Dev => "Devnet",
            DeploymentEnv::Test => "Testnet",
            DeploymentEnv::Local => "Local",
        };
        write!(f, "{name}")
    }
}

/// Where the lottery contract for one network lives. Written by the deploy
/// step; this crate only reads it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub deployed_at: DateTime<Utc>,
    pub contract_id: String,
    pub network_url: String,
    #[serde(default)]
    pub deployment_block_height: Option<u64>,
}

#[derive(Debug)]
pub struct DeploymentStore {
    path: PathBuf,
}

impl DeploymentStore {
    pub fn new(env: DeploymentEnv) -> Result<Self> {
        Self::in_root(DEPLOYMENTS_ROOT, env)
    }

    pub fn in_root(root: impl AsRef<Path>, env: DeploymentEnv) -> Result<Self> {
        let path = ensure_store(root.as_ref(), env)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<DeploymentRecord>> {
        read_record(&self.path)
    }
}

pub fn ensure_structure() -> Result<()> {
    ensure_structure_in(DEPLOYMENTS_ROOT)
}

pub fn ensure_structure_in(root: impl AsRef<Path>) -> Result<()> {
    for env in DeploymentEnv::ALL {
        let _ = ensure_store(root.as_ref(), env)?;
    }
    Ok(())
}

fn ensure_store(root: &Path, env: DeploymentEnv) -> Result<PathBuf> {
    let env_dir = root.join(env.dir_name());
    if !env_dir.exists() {
        fs::create_dir_all(&env_dir).with_context(|| {
            format!("Failed to create deployment directory {}", env_dir.display())
        })?;
    }

    let file_path = env_dir.join(DEPLOYMENTS_FILE);
    if !file_path.exists() {
        fs::File::create(&file_path).with_context(|| {
            format!(
                "Failed to create deployment record file for {} at {:?}",
                env, file_path
            )
        })?;
    }

    Ok(file_path)
}

fn read_record(path: impl AsRef<Path>) -> Result<Option<DeploymentRecord>> {
    let data = fs::read(path.as_ref()).context("Failed to read deployment records")?;
    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    if let Ok(record) = serde_json::from_slice::<DeploymentRecord>(&data) {
        return Ok(Some(record));
    }
    // older stores kept every deployment; the newest one is last
    if let Ok(mut records) = serde_json::from_slice::<Vec<DeploymentRecord>>(&data) {
        return Ok(records.pop());
    }
    Err(anyhow!(
        "Failed to parse deployment record JSON; expected a single deployment object"
    ))
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use tempdir::TempDir;

    fn record(contract_id: &str) -> DeploymentRecord {
        DeploymentRecord {
            deployed_at: "2025-03-01T12:00:00Z".parse().unwrap(),
            contract_id: contract_id.to_string(),
            network_url: "http://localhost:4000/".to_string(),
            deployment_block_height: Some(42),
        }
    }

    #[test]
    fn ensure_structure_in__creates_an_empty_file_per_env() {
        // given
        let dir = TempDir::new("deployments").unwrap();

        // when
        ensure_structure_in(dir.path()).unwrap();

        // then
        for env in DeploymentEnv::ALL {
            let file = dir.path().join(env.dir_name()).join(DEPLOYMENTS_FILE);
            assert!(file.is_file(), "missing {}", file.display());
        }
    }

    #[test]
    fn load__returns_none_for_a_fresh_store() {
        // given
        let dir = TempDir::new("deployments").unwrap();
        let store = DeploymentStore::in_root(dir.path(), DeploymentEnv::Local).unwrap();

        // when
        let loaded = store.load().unwrap();

        // then
        assert_eq!(loaded, None);
    }

    #[test]
    fn load__returns_the_recorded_deployment() {
        // given
        let dir = TempDir::new("deployments").unwrap();
        let store = DeploymentStore::in_root(dir.path(), DeploymentEnv::Test).unwrap();
        let expected = record("0xabc");
        fs::write(store.path(), serde_json::to_vec_pretty(&expected).unwrap()).unwrap();

        // when
        let loaded = store.load().unwrap();

        // then
        assert_eq!(loaded, Some(expected));
    }

    #[test]
    fn load__takes_the_newest_entry_of_a_legacy_list() {
        // given
        let dir = TempDir::new("deployments").unwrap();
        let store = DeploymentStore::in_root(dir.path(), DeploymentEnv::Dev).unwrap();
        let legacy = vec![record("0x01"), record("0x02")];
        fs::write(store.path(), serde_json::to_vec(&legacy).unwrap()).unwrap();

        // when
        let loaded = store.load().unwrap();

        // then
        assert_eq!(loaded.map(|r| r.contract_id), Some("0x02".to_string()));
    }

    #[test]
    fn load__rejects_garbage() {
        // given
        let dir = TempDir::new("deployments").unwrap();
        let store = DeploymentStore::in_root(dir.path(), DeploymentEnv::Dev).unwrap();
        fs::write(store.path(), b"{ not json").unwrap();

        // when
        let result = store.load();

        // then
        assert!(result.is_err());
    }
}
