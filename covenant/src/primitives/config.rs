use std::sync::OnceLock;

use crate::covenant_export;

/// Delegation framework version used when a caller does not pin one.
pub const DEFAULT_FRAMEWORK_VERSION: &str = "1.3.0";

/// Global configuration for Covenant
static CONFIG_INSTANCE: OnceLock<CovenantConfig> = OnceLock::new();

/// Global configuration for Covenant
#[derive(Debug, Clone, uniffi::Object)]
pub struct CovenantConfig {
    default_version: String,
}

#[covenant_export]
impl CovenantConfig {
    /// Creates a new `CovenantConfig` pinned to a delegation framework version.
    ///
    /// # Arguments
    /// * `default_version` - The framework version (e.g. `1.3.0`) whose deployments are used
    ///   when a caller does not pass one explicitly.
    ///
    /// # Examples
    ///
    /// ## Swift
    ///
    /// ```swift
    /// let config = CovenantConfig(defaultVersion: "1.3.0")
    /// ```
    #[uniffi::constructor]
    #[must_use]
    pub fn new(default_version: String) -> Self {
        Self { default_version }
    }

    /// Gets the framework version used by default.
    #[must_use]
    pub fn default_version(&self) -> String {
        self.default_version.clone()
    }
}

impl Default for CovenantConfig {
    fn default() -> Self {
        Self {
            default_version: DEFAULT_FRAMEWORK_VERSION.to_string(),
        }
    }
}

/// Initializes the global Covenant configuration.
///
/// This function should be called once at application startup before any other Covenant operations.
/// Subsequent calls will be ignored and log a warning.
///
/// # Examples
///
/// ## Swift
///
/// ```swift
/// import Covenant
///
/// Covenant.initCovenantConfig(defaultVersion: "1.3.0")
/// ```
#[uniffi::export]
pub fn init_covenant_config(default_version: String) {
    let config = CovenantConfig::new(default_version.clone());

    match CONFIG_INSTANCE.set(config) {
        Ok(()) => {
            crate::info!("Covenant config initialized with framework version: {default_version}");
        }
        Err(_) => {
            crate::warn!("Covenant config already initialized, ignoring");
        }
    }
}

/// Gets the active configuration, falling back to the defaults when uninitialized.
#[must_use]
pub fn current_config() -> CovenantConfig {
    CONFIG_INSTANCE.get().cloned().unwrap_or_default()
}

/// Gets the framework version that environment lookups use when none is given.
#[must_use]
pub fn current_version() -> String {
    CONFIG_INSTANCE.get().map_or_else(
        || DEFAULT_FRAMEWORK_VERSION.to_string(),
        CovenantConfig::default_version,
    )
}

/// Checks if the Covenant configuration has been initialized.
#[must_use]
pub fn is_initialized() -> bool {
    CONFIG_INSTANCE.get().is_some()
}

/// Policy for a single [`crate::caveats::CaveatBuilder`].
///
/// Lives only as long as the builder it configures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Record)]
pub struct CaveatBuilderConfig {
    /// `build()` succeeds with zero caveats. Unrestricted delegations are dangerous, so this is off by default.
    pub allow_empty_caveats: bool,
    /// Allows repeating an enforcer whose kind is not composable.
    pub allow_duplicate_enforcers: bool,
    /// Scope resolution prepends a calldata guard when the scope carries none.
    pub inject_default_guards: bool,
}

impl Default for CaveatBuilderConfig {
    fn default() -> Self {
        Self {
            allow_empty_caveats: false,
            allow_duplicate_enforcers: false,
            inject_default_guards: true,
        }
    }
}
