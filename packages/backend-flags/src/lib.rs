/*
 * Backend Flags - Runtime Configuration Registry
 *
 * Layout:
 * - config/ : Typed settings, namespace tree, patch / snapshot / hash
 * - flags/  : Built-in compiler backend flags and typed views
 *
 * Concurrency:
 * - One RwLock per registry, multi-key mutations applied under a single guard
 * - Process-wide instance via once_cell
 */

/// Setting registry (types, tree, patch, snapshot, hash, YAML)
pub mod config;

/// Built-in flag declarations
pub mod flags;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use config::{
    ConfigHash, Overrides, PatchGuard, Registry, RegistryBuilder, RegistryError, RegistryResult,
    RestoreReport, SettingSpec, SettingType, SettingValue, Snapshot,
};
pub use flags::global;
