use serde::{Deserialize, Serialize};

/// PATCH engine behaviour.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct PatchConfig {
    /// Skip operations and value members naming attributes the schema does
    /// not define instead of rejecting the request.
    #[serde(default)]
    pub ignore_unknown_attribute: bool,

    /// Identity provider dialects to tolerate.
    #[serde(default)]
    pub workarounds: WorkaroundsConfig,
}

/// Built-in workarounds for non-conforming clients.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct WorkaroundsConfig {
    /// Microsoft Entra ID (Azure AD) provisioning: `"True"`/`"False"`
    /// booleans, qualified extension keys in path-less values and filtered
    /// paths that create missing elements.
    #[serde(default)]
    pub ms_azure: bool,
}
