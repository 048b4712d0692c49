use alloy::primitives::Bytes;

use super::{Caveat, CaveatError, CaveatKind, CaveatTerms};
use crate::environment::DeleGatorEnvironment;
use crate::primitives::config::CaveatBuilderConfig;

/// Accumulates an ordered caveat list against one environment.
///
/// Every call consumes the builder and hands back a new one, so two handles can
/// never diverge over the same list. `build` spends it for good.
///
/// # Examples
/// ```
/// use alloy::primitives::U256;
/// use covenant::caveats::{CaveatBuilder, LimitedCallsTerms, ValueLteTerms};
/// use covenant::environment::get_environment;
///
/// let environment = get_environment(11_155_111, None).unwrap();
/// let caveats = CaveatBuilder::new(&environment)
///     .add_caveat(ValueLteTerms { max_value: U256::ZERO })?
///     .add_caveat(LimitedCallsTerms { limit: 3 })?
///     .build()?;
/// assert_eq!(caveats.len(), 2);
/// # Ok::<(), covenant::caveats::CaveatError>(())
/// ```
#[derive(Debug)]
#[must_use]
pub struct CaveatBuilder<'env> {
    environment: &'env DeleGatorEnvironment,
    config: CaveatBuilderConfig,
    caveats: Vec<(CaveatKind, Caveat)>,
}

impl<'env> CaveatBuilder<'env> {
    /// Starts an empty list with the default policy.
    pub fn new(environment: &'env DeleGatorEnvironment) -> Self {
        Self::with_config(environment, CaveatBuilderConfig::default())
    }

    /// Starts an empty list with an explicit policy.
    pub const fn with_config(
        environment: &'env DeleGatorEnvironment,
        config: CaveatBuilderConfig,
    ) -> Self {
        Self {
            environment,
            config,
            caveats: Vec::new(),
        }
    }

    /// The policy this builder enforces.
    pub const fn config(&self) -> CaveatBuilderConfig {
        self.config
    }

    /// The environment enforcers are resolved from.
    pub const fn environment(&self) -> &'env DeleGatorEnvironment {
        self.environment
    }

    /// Encodes `terms` and appends the caveat with empty `args`.
    ///
    /// # Errors
    /// - `CaveatError::UnknownEnforcer` if the environment has no enforcer for the kind.
    /// - `CaveatError::InvalidTerms` if the encoder rejects the parameters.
    /// - `CaveatError::DuplicateEnforcer` if the kind is not composable and already present.
    pub fn add_caveat(self, terms: impl Into<CaveatTerms>) -> Result<Self, CaveatError> {
        self.add_caveat_with_args(terms, Bytes::new())
    }

    /// Like [`Self::add_caveat`], with redemption-time `args`.
    ///
    /// # Errors
    /// See [`Self::add_caveat`].
    pub fn add_caveat_with_args(
        self,
        terms: impl Into<CaveatTerms>,
        args: Bytes,
    ) -> Result<Self, CaveatError> {
        let terms = terms.into();
        let kind = terms.kind();
        // the enforcer is resolved first so a missing deployment is reported before any encoding issue
        let enforcer = self.environment.enforcer(kind)?;
        let encoded = terms.encode_terms()?;
        self.push(
            kind,
            Caveat {
                enforcer,
                terms: encoded.into(),
                args,
            },
        )
    }

    /// Appends an already encoded caveat. The enforcer must belong to the environment
    /// and the terms must decode for its kind.
    ///
    /// # Errors
    /// - `CaveatError::UnrecognizedEnforcer` if the enforcer is not part of the environment.
    /// - `CaveatError::TermsLengthMismatch` if the terms do not decode.
    /// - `CaveatError::DuplicateEnforcer` if the kind is not composable and already present.
    pub fn add_raw_caveat(self, caveat: Caveat) -> Result<Self, CaveatError> {
        let kind = self
            .environment
            .kind_of(caveat.enforcer)
            .ok_or(CaveatError::UnrecognizedEnforcer {
                enforcer: caveat.enforcer,
            })?;
        CaveatTerms::decode(kind, &caveat.terms)?;
        self.push(kind, caveat)
    }

    fn push(mut self, kind: CaveatKind, caveat: Caveat) -> Result<Self, CaveatError> {
        let repeated = self.caveats.iter().any(|(existing, _)| *existing == kind);
        if repeated && !kind.is_composable() && !self.config.allow_duplicate_enforcers {
            return Err(CaveatError::DuplicateEnforcer { kind });
        }

        crate::debug!("Adding caveat {kind} enforced by {}", caveat.enforcer);
        self.caveats.push((kind, caveat));
        Ok(self)
    }

    /// Number of caveats added so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.caveats.len()
    }

    /// Whether no caveat was added yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.caveats.is_empty()
    }

    /// Returns the caveats in insertion order.
    ///
    /// # Errors
    /// - `CaveatError::EmptyCaveats` if nothing was added, unless the policy allows it.
    pub fn build(self) -> Result<Vec<Caveat>, CaveatError> {
        if self.caveats.is_empty() && !self.config.allow_empty_caveats {
            return Err(CaveatError::EmptyCaveats);
        }
        Ok(self.caveats.into_iter().map(|(_, caveat)| caveat).collect())
    }
}
