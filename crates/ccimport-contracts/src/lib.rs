//! Shared, version-pinned protocol identifiers.
//!
//! These constants are the single source of truth for schema/version strings
//! that appear in machine-readable I/O between the frontend dumper, the
//! importer, and downstream consumers of the IR.

/// Schema of the semantics dump the C++ frontend prints on stdout.
pub const SEMANTICS_DUMP_SCHEMA_VERSION: &str = "ccimport.semantics@0.1.0";

/// Schema of the JSON IR written via `--ir_out`.
pub const IR_SCHEMA_VERSION: &str = "ccimport.ir@0.1.0";

/// Default executable name of the frontend dumper; overridable through the
/// `CCIMPORT_FRONTEND` environment variable.
pub const FRONTEND_BIN_DEFAULT: &str = "ccfrontend";

/// Environment variable naming the frontend dumper executable.
pub const FRONTEND_BIN_ENV: &str = "CCIMPORT_FRONTEND";
