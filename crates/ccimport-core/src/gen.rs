//! Renders the IR into the two output source files: the target-language API
//! and the C++ thunk implementation.
//!
//! Only free functions with ordinary identifiers are rendered; constructors,
//! destructors and member functions stay IR-only until the emitters learn to
//! represent them. Unsupported items surface as markers so the generated
//! file documents what was left out.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use anyhow::{bail, Result};
use sha2::{Digest, Sha256};

use crate::ir::{
    Func, Item, LifetimeId, MappedType, Record, TypeAlias, TypeKind, UnqualifiedIdentifier, IR,
};

/// Source code for generated bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bindings {
    /// Target-language source code.
    pub api: String,
    /// C++ source code implementing the thunks.
    pub api_impl: String,
}

pub fn generate_bindings(ir: &IR) -> Result<Bindings> {
    let header = provenance_header(ir)?;
    Ok(Bindings {
        api: format!("{header}{}", generate_api(ir)?),
        api_impl: format!("{header}{}", generate_api_impl(ir)?),
    })
}

fn provenance_header(ir: &IR) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(crate::ir::serialize_ir(ir)?.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    Ok(format!(
        "// Generated by ccimport ({}) from IR sha256:{hex}. Do not edit.\n\n",
        ccimport_contracts::IR_SCHEMA_VERSION
    ))
}

/// Inline functions may not be codegenned in the C++ library, so they are
/// reached through a generated thunk; everything else links directly against
/// the mangled symbol.
fn can_skip_cc_thunk(func: &Func) -> bool {
    !func.is_inline
}

fn is_plain_function(func: &Func) -> bool {
    matches!(func.name, UnqualifiedIdentifier::Identifier(_))
        && func.member_func_metadata.is_none()
}

fn func_identifier(func: &Func) -> &str {
    match &func.name {
        UnqualifiedIdentifier::Identifier(identifier) => &identifier.identifier,
        UnqualifiedIdentifier::Constructor | UnqualifiedIdentifier::Destructor => {
            unreachable!("structors are filtered out before rendering")
        }
    }
}

fn lifetime_names(func: &Func) -> BTreeMap<LifetimeId, String> {
    func.lifetime_params.iter().map(|l| (l.id, l.name.clone())).collect()
}

fn format_target_type(ty: &MappedType, lifetimes: &BTreeMap<LifetimeId, String>) -> Result<String> {
    Ok(match &ty.kind {
        TypeKind::Void => "()".to_string(),
        TypeKind::Simple { target_name, .. } => target_name.clone(),
        TypeKind::WithDeclIds { target_name, .. } => target_name.clone(),
        TypeKind::PointerTo { pointee, lifetime, .. } => {
            let inner = format_target_type(pointee, lifetimes)?;
            match lifetime.and_then(|id| lifetimes.get(&id)) {
                Some(name) if pointee.cc_const => format!("&'{name} {inner}"),
                Some(name) => format!("&'{name} mut {inner}"),
                None if pointee.cc_const => format!("*const {inner}"),
                None => format!("*mut {inner}"),
            }
        }
        TypeKind::LValueReferenceTo { pointee, lifetime } => {
            let inner = format_target_type(pointee, lifetimes)?;
            match lifetime.and_then(|id| lifetimes.get(&id)) {
                Some(name) if pointee.cc_const => format!("&'{name} {inner}"),
                Some(name) => format!("&'{name} mut {inner}"),
                None if pointee.cc_const => format!("*const {inner}"),
                None => format!("*mut {inner}"),
            }
        }
    })
}

fn format_cc_type(ty: &MappedType) -> Result<String> {
    let const_prefix = if ty.cc_const { "const " } else { "" };
    Ok(match &ty.kind {
        TypeKind::Void => format!("{const_prefix}void"),
        TypeKind::Simple { cc_name, .. } => format!("{const_prefix}{cc_name}"),
        TypeKind::WithDeclIds { cc_name, .. } => format!("{const_prefix}{cc_name}"),
        TypeKind::PointerTo { pointee, .. } => {
            format!("{}{}*", const_prefix, format_cc_type(pointee)?)
        }
        TypeKind::LValueReferenceTo { pointee, .. } => {
            format!("{}{}&", const_prefix, format_cc_type(pointee)?)
        }
    })
}

fn generic_params(func: &Func) -> String {
    if func.lifetime_params.is_empty() {
        return String::new();
    }
    let names: Vec<String> =
        func.lifetime_params.iter().map(|l| format!("'{}", l.name)).collect();
    format!("<{}>", names.join(", "))
}

fn generate_api(ir: &IR) -> Result<String> {
    let mut api = String::new();
    let mut thunks = String::new();

    for item in &ir.items {
        match item {
            Item::Func(func) if is_plain_function(func) => {
                generate_api_func(func, &mut api, &mut thunks)?;
            }
            Item::Func(_) => {}
            Item::Record(record) => generate_api_record(record, &mut api)?,
            Item::TypeAlias(alias) => generate_api_alias(alias, &mut api)?,
            Item::Comment(comment) => {
                for line in comment.text.lines() {
                    let _ = writeln!(api, "// {line}");
                }
                api.push('\n');
            }
            Item::UnsupportedItem(unsupported) => {
                let _ = writeln!(
                    api,
                    "// Unsupported: {}: {}\n",
                    unsupported.name, unsupported.message
                );
            }
        }
    }

    if !thunks.is_empty() {
        api.push_str("mod detail {\n    extern \"C\" {\n");
        api.push_str(&thunks);
        api.push_str("    }\n}\n");
    }
    Ok(api)
}

fn generate_api_func(func: &Func, api: &mut String, thunks: &mut String) -> Result<()> {
    let ident = func_identifier(func);
    let lifetimes = lifetime_names(func);
    let generics = generic_params(func);
    let return_type = format_target_type(&func.return_type, &lifetimes)?;

    let mut params = Vec::with_capacity(func.params.len());
    let mut args = Vec::with_capacity(func.params.len());
    for param in &func.params {
        let name = &param.identifier.identifier;
        params.push(format!("{name}: {}", format_target_type(&param.type_, &lifetimes)?));
        args.push(name.clone());
    }
    let params = params.join(", ");
    let args = args.join(", ");

    if let Some(doc) = &func.doc_comment {
        for line in doc.lines() {
            let _ = writeln!(api, "/// {line}");
        }
    }
    let _ = writeln!(api, "#[inline(always)]");
    let _ = writeln!(api, "pub fn {ident}{generics}({params}) -> {return_type} {{");
    let _ = writeln!(api, "    unsafe {{ crate::detail::__cc_thunk__{ident}({args}) }}");
    let _ = writeln!(api, "}}\n");

    if can_skip_cc_thunk(func) {
        let _ = writeln!(thunks, "        #[link_name = \"{}\"]", func.mangled_name);
    }
    let _ = writeln!(
        thunks,
        "        pub(crate) fn __cc_thunk__{ident}{generics}({params}) -> {return_type};"
    );
    Ok(())
}

fn generate_api_record(record: &Record, api: &mut String) -> Result<()> {
    if let Some(doc) = &record.doc_comment {
        for line in doc.lines() {
            let _ = writeln!(api, "/// {line}");
        }
    }
    let _ = writeln!(api, "#[repr(C)]");
    let _ = writeln!(api, "pub struct {} {{", record.identifier.identifier);
    let no_lifetimes = BTreeMap::new();
    for field in &record.fields {
        if let Some(doc) = &field.doc_comment {
            for line in doc.lines() {
                let _ = writeln!(api, "    /// {line}");
            }
        }
        let _ = writeln!(
            api,
            "    pub {}: {},",
            field.identifier.identifier,
            format_target_type(&field.type_, &no_lifetimes)?
        );
    }
    let _ = writeln!(api, "}}\n");
    Ok(())
}

fn generate_api_alias(alias: &TypeAlias, api: &mut String) -> Result<()> {
    let no_lifetimes = BTreeMap::new();
    let _ = writeln!(
        api,
        "pub type {} = {};\n",
        alias.identifier.identifier,
        format_target_type(&alias.underlying_type, &no_lifetimes)?
    );
    Ok(())
}

fn generate_api_impl(ir: &IR) -> Result<String> {
    let mut out = String::new();
    // The thunks need the declarations from the library's public headers.
    for header in &ir.used_headers {
        let _ = writeln!(out, "#include \"{}\"", header.0);
    }
    out.push('\n');

    for func in ir.functions() {
        if !is_plain_function(func) || can_skip_cc_thunk(func) {
            continue;
        }
        if !func.lifetime_params.is_empty() {
            bail!(
                "cannot generate a thunk for '{}': lifetime-parameterized \
                 signatures are not representable in C++",
                func_identifier(func)
            );
        }
        let ident = func_identifier(func);
        let return_type = format_cc_type(&func.return_type)?;

        let mut params = Vec::with_capacity(func.params.len());
        let mut args = Vec::with_capacity(func.params.len());
        for param in &func.params {
            let name = &param.identifier.identifier;
            params.push(format!("{} {name}", format_cc_type(&param.type_)?));
            args.push(name.clone());
        }
        let _ = writeln!(
            out,
            "extern \"C\" {return_type} __cc_thunk__{ident}({}) {{",
            params.join(", ")
        );
        let _ = writeln!(out, "    return {ident}({});", args.join(", "));
        let _ = writeln!(out, "}}\n");
    }
    Ok(out)
}
