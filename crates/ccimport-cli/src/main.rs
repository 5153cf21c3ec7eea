use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ccimport_core::ast::lifetimes::AnnotationOracle;
use ccimport_core::ast::{invoke, AstContext, Invocation};
use ccimport_core::gen;
use ccimport_core::importer;
use ccimport_core::ir::{serialize_ir, HeaderName, Label};
use clap::Parser;

const DO_NOTHING_SENTINEL: &str =
    "// intentionally left empty because --do_nothing was passed.";

#[derive(Parser, Debug)]
#[command(name = "ccimport")]
#[command(about = "Generates target-language bindings for C++ headers.", long_about = None)]
#[command(rename_all = "snake_case")]
struct Cli {
    /// Output path for the target-language source file with bindings.
    #[arg(long)]
    rs_out: PathBuf,
    /// Output path for the C++ source file with the bindings implementation.
    #[arg(long)]
    cc_out: PathBuf,
    /// Optional output path for the JSON IR. If not present, the IR is not
    /// dumped.
    #[arg(long)]
    ir_out: Option<PathBuf>,
    /// Public headers of the library to generate bindings for.
    #[arg(long, num_args = 1.., value_delimiter = ',', required = true)]
    public_headers: Vec<String>,
    /// Which headers belong to which targets, as a JSON array of
    /// {"t": target, "h": [header, ...]} objects.
    #[arg(long)]
    targets_and_headers: String,
    /// If set, write sentinel empty files and exit (useful for testing the
    /// build-system integration).
    #[arg(long, default_value_t = false)]
    do_nothing: bool,
}

#[derive(Debug, serde::Deserialize)]
struct TargetAndHeaders {
    t: String,
    h: Vec<String>,
}

fn main() -> Result<()> {
    try_main().map_err(|err| {
        eprintln!("{err:#}");
        err
    })
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();

    if cli.do_nothing {
        write_output(&cli.rs_out, DO_NOTHING_SENTINEL)?;
        write_output(&cli.cc_out, DO_NOTHING_SENTINEL)?;
        return Ok(());
    }

    let header_targets = parse_targets_and_headers(&cli.targets_and_headers)?;
    let public_headers: Vec<HeaderName> =
        cli.public_headers.iter().map(|h| HeaderName(h.clone())).collect();

    let current_target = header_targets
        .get(&public_headers[0])
        .with_context(|| {
            format!(
                "couldn't find header '{}' in the headers-to-target map derived \
                 from --targets_and_headers",
                public_headers[0].0
            )
        })?
        .clone();
    let invocation =
        Invocation::new(current_target, public_headers.clone(), header_targets)?;

    if let Err(err) = run_import(&cli, &invocation, &public_headers) {
        remove_outputs(&cli);
        return Err(err);
    }
    Ok(())
}

fn run_import(cli: &Cli, invocation: &Invocation, headers: &[HeaderName]) -> Result<()> {
    let tu = invoke::parse_translation_unit(headers)?;
    let ctx = AstContext::new(tu).context("validate frontend semantics dump")?;
    let oracle = AnnotationOracle::new(&ctx);
    let ir = importer::import_ir(&ctx, invocation, &oracle);

    if let Some(ir_out) = &cli.ir_out {
        write_output(ir_out, &serialize_ir(&ir)?)?;
    }
    let bindings = gen::generate_bindings(&ir)?;
    write_output(&cli.rs_out, &bindings.api)?;
    write_output(&cli.cc_out, &bindings.api_impl)?;
    Ok(())
}

fn parse_targets_and_headers(json: &str) -> Result<BTreeMap<HeaderName, Label>> {
    let entries: Vec<TargetAndHeaders> =
        serde_json::from_str(json).context("parse --targets_and_headers JSON")?;
    let mut map = BTreeMap::new();
    for entry in entries {
        for header in entry.h {
            map.insert(HeaderName(header), Label(entry.t.clone()));
        }
    }
    Ok(map)
}

fn write_output(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir: {}", parent.display()))?;
        }
    }
    std::fs::write(path, contents.as_bytes())
        .with_context(|| format!("write output: {}", path.display()))
}

/// On failure any partial output is removed so the build system never sees a
/// half-written file.
fn remove_outputs(cli: &Cli) {
    let _ = std::fs::remove_file(&cli.rs_out);
    let _ = std::fs::remove_file(&cli.cc_out);
    if let Some(ir_out) = &cli.ir_out {
        let _ = std::fs::remove_file(ir_out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_and_headers_round_trip() {
        let map = parse_targets_and_headers(
            r#"[{"t": "//foo:bar", "h": ["foo/bar.h", "foo/baz.h"]}]"#,
        )
        .unwrap();
        assert_eq!(
            map.get(&HeaderName("foo/bar.h".to_string())),
            Some(&Label("//foo:bar".to_string()))
        );
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn mismatched_targets_are_rejected() {
        let map = parse_targets_and_headers(
            r#"[{"t": "//foo:bar", "h": ["foo/bar.h"]}, {"t": "//foo:baz", "h": ["foo/baz.h"]}]"#,
        )
        .unwrap();
        let headers = vec![
            HeaderName("foo/bar.h".to_string()),
            HeaderName("foo/baz.h".to_string()),
        ];
        let err = Invocation::new(Label("//foo:bar".to_string()), headers, map).unwrap_err();
        assert!(err.to_string().contains("foo/baz.h"));
    }
}
