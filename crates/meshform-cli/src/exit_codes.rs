//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// Success - operation completed without errors
#[allow(dead_code)]
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Validation error - metadata or spec failed validation
pub const VALIDATION_ERROR: i32 = 2;

/// Cluster error - a Kubernetes API call failed
pub const CLUSTER_ERROR: i32 = 3;

/// Configuration error - provider config or kubeconfig unusable
pub const CONFIG_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;
