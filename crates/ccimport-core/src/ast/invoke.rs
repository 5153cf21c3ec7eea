//! Runs the external frontend dumper and parses its output.

use std::process::Command;

use anyhow::{bail, Context, Result};

use crate::ir::HeaderName;

use super::TranslationUnit;

fn frontend_bin() -> String {
    std::env::var(ccimport_contracts::FRONTEND_BIN_ENV)
        .unwrap_or_else(|_| ccimport_contracts::FRONTEND_BIN_DEFAULT.to_string())
}

/// Invokes the frontend on the given entry headers and deserializes the
/// semantics dump it prints on stdout.
pub fn parse_translation_unit(headers: &[HeaderName]) -> Result<TranslationUnit> {
    let bin = frontend_bin();
    let mut cmd = Command::new(&bin);
    cmd.arg("--emit-semantics-json");
    for header in headers {
        cmd.arg("--header").arg(&header.0);
    }

    let out = cmd.output().with_context(|| format!("run frontend: {bin}"))?;
    if !out.status.success() {
        bail!(
            "frontend parse failed ({bin}):\n{}",
            String::from_utf8_lossy(&out.stderr)
        );
    }

    let tu: TranslationUnit =
        serde_json::from_slice(&out.stdout).context("parse frontend semantics JSON")?;
    if tu.schema_version != ccimport_contracts::SEMANTICS_DUMP_SCHEMA_VERSION {
        bail!(
            "semantics dump schema_version mismatch: expected {} got {:?}",
            ccimport_contracts::SEMANTICS_DUMP_SCHEMA_VERSION,
            tu.schema_version
        );
    }
    Ok(tu)
}
