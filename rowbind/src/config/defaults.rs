//! Default option values - single source of truth

use crate::expand::EmptyListPolicy;
use crate::reflect::NameConvention;

/// Field identifiers are lowercased and matched case-insensitively
pub const NAMING: NameConvention = NameConvention::Lowercase;

/// Unmapped result columns are an error
pub const UNSAFE_COLUMNS: bool = false;

/// Empty list arguments are an error
pub const EMPTY_LISTS: EmptyListPolicy = EmptyListPolicy::Reject;

/// Config file looked up by `Options::load` (any extension config-rs knows)
pub const FILE_NAME: &str = "rowbind";

/// Prefix of environment overrides (`ROWBIND_UNSAFE_COLUMNS=true`)
pub const ENV_PREFIX: &str = "ROWBIND";
