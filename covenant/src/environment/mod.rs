use std::collections::HashMap;
use std::sync::{OnceLock, PoisonError, RwLock};

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::caveats::{CaveatError, CaveatKind};
use crate::primitives::config::current_version;

mod deployments;

pub use deployments::{builtin_environment, SUPPORTED_VERSIONS};

/// Smart account implementations a delegator can be deployed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Implementations {
    /// Threshold multi-signature delegator.
    pub multi_sig: Address,
    /// EOA owner plus WebAuthn (P-256) keys.
    pub hybrid: Address,
    /// EIP-7702 delegation target for upgraded EOAs.
    pub eip7702_stateless: Address,
}

/// Deployed framework contracts on one chain, for one framework version.
///
/// Immutable once resolved; use [`override_environment`] to substitute a different deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleGatorEnvironment {
    /// Chain the contracts are deployed on.
    pub chain_id: u64,
    /// Framework version of the deployment.
    pub version: String,
    /// Validates and redeems delegations. Also the EIP-712 verifying contract.
    pub delegation_manager: Address,
    /// ERC-4337 entry point.
    pub entry_point: Address,
    /// CREATE2 factory for delegator accounts.
    pub simple_factory: Address,
    /// Account implementations.
    pub implementations: Implementations,
    /// Enforcer contract per caveat kind. Kinds without an entry are not deployed.
    pub caveat_enforcers: HashMap<CaveatKind, Address>,
}

impl DeleGatorEnvironment {
    /// Enforcer address for `kind`.
    ///
    /// # Errors
    /// - `CaveatError::UnknownEnforcer` if the kind is not deployed in this environment.
    pub fn enforcer(&self, kind: CaveatKind) -> Result<Address, CaveatError> {
        self.caveat_enforcers
            .get(&kind)
            .copied()
            .ok_or_else(|| CaveatError::UnknownEnforcer {
                kind,
                chain_id: self.chain_id,
                version: self.version.clone(),
            })
    }

    /// The caveat kind enforced by `enforcer`, if it belongs to this environment.
    #[must_use]
    pub fn kind_of(&self, enforcer: Address) -> Option<CaveatKind> {
        self.caveat_enforcers
            .iter()
            .find_map(|(kind, address)| (*address == enforcer).then_some(*kind))
    }

    /// Returns a copy with `kind` pointing at `enforcer`.
    #[must_use]
    pub fn with_enforcer(mut self, kind: CaveatKind, enforcer: Address) -> Self {
        self.caveat_enforcers.insert(kind, enforcer);
        self
    }

    /// Returns a copy where `kind` is not deployed.
    #[must_use]
    pub fn without_enforcer(mut self, kind: CaveatKind) -> Self {
        self.caveat_enforcers.remove(&kind);
        self
    }
}

/// Errors raised while resolving an environment.
#[crate::covenant_error]
pub enum EnvironmentError {
    /// Neither an override nor a known deployment exists for the chain and version.
    #[error("no delegation framework deployment for chain {chain_id} at version {version}")]
    UnsupportedEnvironment {
        /// The requested chain.
        chain_id: u64,
        /// The requested framework version.
        version: String,
    },
}

type EnvironmentKey = (u64, String);

/// Empty at process start; entries persist until process exit. Last write wins per key.
static OVERRIDES: OnceLock<RwLock<HashMap<EnvironmentKey, DeleGatorEnvironment>>> =
    OnceLock::new();

fn overrides() -> &'static RwLock<HashMap<EnvironmentKey, DeleGatorEnvironment>> {
    OVERRIDES.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Registers `environment` for `(chain_id, version)`, shadowing any known deployment.
///
/// Intended for local networks and tests. The chain id and version stored in
/// `environment` are replaced by the key so errors name the overridden key.
pub fn override_environment(chain_id: u64, version: &str, environment: DeleGatorEnvironment) {
    let environment = DeleGatorEnvironment {
        chain_id,
        version: version.to_string(),
        ..environment
    };
    let previous = overrides()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert((chain_id, version.to_string()), environment);

    if previous.is_some() {
        crate::info!("Replaced environment override for chain {chain_id} at version {version}");
    } else {
        crate::info!("Registered environment override for chain {chain_id} at version {version}");
    }
}

/// Resolves the environment for `chain_id` at `version`, or at the configured default version.
///
/// Overrides take precedence over known deployments.
///
/// # Errors
/// - `EnvironmentError::UnsupportedEnvironment` if nothing is deployed for the pair.
pub fn get_environment(
    chain_id: u64,
    version: Option<&str>,
) -> Result<DeleGatorEnvironment, EnvironmentError> {
    let version = version.map_or_else(current_version, ToString::to_string);

    let overridden = overrides()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&(chain_id, version.clone()))
        .cloned();
    if let Some(environment) = overridden {
        return Ok(environment);
    }

    builtin_environment(chain_id, &version)
        .ok_or(EnvironmentError::UnsupportedEnvironment { chain_id, version })
}
