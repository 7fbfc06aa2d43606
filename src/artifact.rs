//! Contract artifacts used for creations: the ABI TRON stores alongside a
//! deployed contract, and fallback bytecode.

use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::SystemTime;

use alloy_primitives::Bytes;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha3::{Digest, Keccak256};
use tracing::{debug, info, warn};

use crate::translator::decode_hex;

/// ABI parameter. Unknown keys (`internalType`, ...) are preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbiParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<AbiParam>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// ABI function/event/constructor entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbiEntry {
    #[serde(rename = "type", default = "default_entry_type")]
    pub entry_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<AbiParam>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<AbiParam>>,
    #[serde(
        rename = "stateMutability",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub state_mutability: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_entry_type() -> String {
    "function".to_string()
}

impl AbiEntry {
    /// Canonical signature, e.g. `transfer(address,uint256)`.
    pub fn signature(&self) -> Option<String> {
        let name = self.name.as_deref()?;
        let types: Vec<String> = self
            .inputs
            .iter()
            .flatten()
            .map(|p| canonical_type(&p.param_type, &p.components))
            .collect();
        Some(format!("{}({})", name, types.join(",")))
    }

    /// 4-byte selector for function entries.
    pub fn selector(&self) -> Option<[u8; 4]> {
        if self.entry_type != "function" {
            return None;
        }
        let hash = Keccak256::digest(self.signature()?.as_bytes());
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&hash[..4]);
        Some(selector)
    }
}

fn canonical_type(param_type: &str, components: &Option<Vec<AbiParam>>) -> String {
    match (param_type.strip_prefix("tuple"), components) {
        (Some(suffix), Some(comps)) => {
            let inner: Vec<String> = comps
                .iter()
                .map(|c| canonical_type(&c.param_type, &c.components))
                .collect();
            format!("({}){}", inner.join(","), suffix)
        }
        _ => param_type.to_string(),
    }
}

/// ABI plus creation bytecode from a compiled contract.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContractArtifact {
    pub abi: Vec<AbiEntry>,
    pub bytecode: Bytes,
}

/// Parse a Foundry (or plain solc) artifact: `abi` plus `bytecode.object` or
/// a bare `bytecode` string.
pub fn parse_foundry_artifact(contents: &str) -> Result<ContractArtifact> {
    let value: Value = serde_json::from_str(contents).context("Artifact is not valid JSON")?;

    let abi = match value.get("abi") {
        Some(abi) => serde_json::from_value(abi.clone()).context("Artifact abi is malformed")?,
        None => Vec::new(),
    };

    let bytecode_hex = match value.get("bytecode") {
        Some(Value::String(s)) => s.as_str(),
        Some(Value::Object(obj)) => obj.get("object").and_then(Value::as_str).unwrap_or(""),
        Some(other) => return Err(anyhow!("Unexpected bytecode field: {}", other)),
        None => "",
    };
    let bytecode = decode_hex(bytecode_hex)
        .map_err(|e| anyhow!("Artifact bytecode is not valid hex: {}", e))?;

    Ok(ContractArtifact {
        abi,
        bytecode: Bytes::from(bytecode),
    })
}

/// ABI in the JSON string form the TRON wallet API expects: `{"entrys": [...]}`.
pub fn tron_abi_json(abi: &[AbiEntry]) -> Result<String> {
    serde_json::to_string(&json!({ "entrys": abi })).context("Failed to serialize ABI")
}

/// Source of the ABI, fallback bytecode and name used for creations.
pub trait ArtifactProvider: Send + Sync {
    fn current_abi(&self) -> Vec<AbiEntry>;

    fn current_bytecode(&self) -> Bytes;

    fn contract_name(&self) -> String;

    /// Signature of the ABI function `calldata` selects, if known.
    fn describe_call(&self, calldata: &[u8]) -> Option<String> {
        let selector: [u8; 4] = calldata.get(..4)?.try_into().ok()?;
        self.current_abi()
            .iter()
            .find(|entry| entry.selector() == Some(selector))
            .and_then(AbiEntry::signature)
    }
}

/// Fixed artifact, used when no artifact file is configured.
#[derive(Debug, Clone)]
pub struct StaticArtifacts {
    artifact: ContractArtifact,
    name: String,
}

impl StaticArtifacts {
    pub fn new(artifact: ContractArtifact, name: impl Into<String>) -> Self {
        Self {
            artifact,
            name: name.into(),
        }
    }
}

impl ArtifactProvider for StaticArtifacts {
    fn current_abi(&self) -> Vec<AbiEntry> {
        self.artifact.abi.clone()
    }

    fn current_bytecode(&self) -> Bytes {
        self.artifact.bytecode.clone()
    }

    fn contract_name(&self) -> String {
        self.name.clone()
    }
}

#[derive(Debug)]
struct Loaded {
    modified: SystemTime,
    artifact: ContractArtifact,
}

/// Artifact file on disk, re-read whenever its mtime changes.
///
/// A missing or unparseable file keeps the last good artifact (initially empty).
#[derive(Debug)]
pub struct FoundryArtifact {
    path: PathBuf,
    name: String,
    loaded: RwLock<Option<Loaded>>,
}

impl FoundryArtifact {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        let provider = Self {
            path: path.into(),
            name: name.into(),
            loaded: RwLock::new(None),
        };
        provider.refresh();
        provider
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn refresh(&self) -> ContractArtifact {
        let modified = match std::fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                debug!("Artifact {} unavailable: {}", self.path.display(), e);
                return self.last_good();
            }
        };

        {
            let loaded = self.loaded.read().unwrap_or_else(|e| e.into_inner());
            if let Some(loaded) = loaded.as_ref() {
                if loaded.modified == modified {
                    return loaded.artifact.clone();
                }
            }
        }

        let parsed = std::fs::read_to_string(&self.path)
            .context("Failed to read artifact")
            .and_then(|contents| parse_foundry_artifact(&contents));
        match parsed {
            Ok(artifact) => {
                info!(
                    "Loaded contract artifact from {} ({} ABI entries, {} bytecode bytes)",
                    self.path.display(),
                    artifact.abi.len(),
                    artifact.bytecode.len()
                );
                let mut loaded = self.loaded.write().unwrap_or_else(|e| e.into_inner());
                *loaded = Some(Loaded {
                    modified,
                    artifact: artifact.clone(),
                });
                artifact
            }
            Err(e) => {
                warn!(
                    "Keeping previous artifact, failed to load {}: {:#}",
                    self.path.display(),
                    e
                );
                self.last_good()
            }
        }
    }

    fn last_good(&self) -> ContractArtifact {
        let loaded = self.loaded.read().unwrap_or_else(|e| e.into_inner());
        loaded
            .as_ref()
            .map(|l| l.artifact.clone())
            .unwrap_or_default()
    }
}

impl ArtifactProvider for FoundryArtifact {
    fn current_abi(&self) -> Vec<AbiEntry> {
        self.refresh().abi
    }

    fn current_bytecode(&self) -> Bytes {
        self.refresh().bytecode
    }

    fn contract_name(&self) -> String {
        self.name.clone()
    }
}
