//! The IR importer: walks a parsed translation unit and produces the ordered
//! item list.
//!
//! Import results are memoized per canonical declaration. A declaration
//! imports to an item, to one or more error strings (surfaced as
//! `UnsupportedItem`s when the declaration is from the current target), or to
//! nothing at all. A single unsupported construct never halts the run;
//! frontend-invariant violations panic.

mod alias;
mod function;
mod names;
mod record;
mod types;

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::ast::lifetimes::LifetimeOracle;
use crate::ast::{AstContext, CtorKind, DeclKey, DeclKind, Invocation, SourceRange};
use crate::ir::{Comment, Item, UnsupportedItem, IR};

pub use self::types::UnsupportedTypeError;

/// Owning target assigned to declarations from built-in buffers.
pub const BUILTIN_TARGET: &str = "//:builtin";
/// Owning target assigned to declarations from system headers.
pub const RESOURCE_DIR_TARGET: &str = "//:virtual_clang_resource_dir_target";

/// Memoized outcome of importing one declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupResult {
    item: Option<Item>,
    errors: Vec<String>,
}

impl LookupResult {
    fn from_item(item: impl Into<Item>) -> Self {
        LookupResult { item: Some(item.into()), errors: Vec::new() }
    }

    fn from_error(message: impl Into<String>) -> Self {
        LookupResult { item: None, errors: vec![message.into()] }
    }

    fn from_errors(errors: Vec<String>) -> Self {
        LookupResult { item: None, errors }
    }

    pub fn item(&self) -> Option<&Item> {
        self.item.as_ref()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}

pub struct Importer<'tu> {
    ctx: &'tu AstContext,
    invocation: &'tu Invocation,
    oracle: &'tu dyn LifetimeOracle,
    lookup_cache: BTreeMap<DeclKey, LookupResult>,
    /// Tag/typedef declarations (canonical keys) whose import succeeded. The
    /// type mapper treats anything else as unknown.
    known_type_decls: BTreeSet<DeclKey>,
}

/// Imports the whole translation unit and returns the IR.
pub fn import_ir(
    ctx: &AstContext,
    invocation: &Invocation,
    oracle: &dyn LifetimeOracle,
) -> IR {
    Importer::new(ctx, invocation, oracle).import_translation_unit()
}

impl<'tu> Importer<'tu> {
    pub fn new(
        ctx: &'tu AstContext,
        invocation: &'tu Invocation,
        oracle: &'tu dyn LifetimeOracle,
    ) -> Self {
        Importer {
            ctx,
            invocation,
            oracle,
            lookup_cache: BTreeMap::new(),
            known_type_decls: BTreeSet::new(),
        }
    }

    pub fn import_translation_unit(mut self) -> IR {
        let top_level = self.ctx.top_level().to_vec();
        self.import_decls_from_context(&top_level);
        let items = self.ordered_items();
        IR {
            used_headers: self.invocation.entry_headers.clone(),
            current_target: self.invocation.current_target.clone(),
            items,
        }
    }

    /// Looks a declaration up, importing it on first sight. Two lookups of
    /// the same canonical declaration return the identical result.
    pub fn lookup_decl(&mut self, key: DeclKey) -> &LookupResult {
        let canonical = self.ctx.canonical(key);
        if !self.lookup_cache.contains_key(&canonical) {
            let result = self.import_decl(canonical);
            self.lookup_cache.entry(canonical).or_insert(result);
        }
        &self.lookup_cache[&canonical]
    }

    /// Visits every declaration of one context. Namespaces are recursed into
    /// here; record contexts are visited by the record importer's caller so
    /// that nested unsupported items still surface.
    fn import_decls_from_context(&mut self, decls: &[DeclKey]) {
        let ctx = self.ctx;
        for &key in decls {
            self.lookup_decl(key);
            if let DeclKind::Namespace(ns) = &ctx.decl(key).kind {
                self.import_decls_from_context(&ns.decls);
            }
        }
    }

    fn import_decl(&mut self, key: DeclKey) -> LookupResult {
        let ctx = self.ctx;
        let decl = ctx.decl(key);
        if let Some(parent) = decl.parent {
            if matches!(ctx.decl(parent).kind, DeclKind::Namespace(_)) {
                return LookupResult::from_error(
                    "Items contained in namespaces are not supported yet",
                );
            }
        }
        match &decl.kind {
            DeclKind::Function(func) => self.import_function(key, func),
            DeclKind::FunctionTemplate { templated } => {
                match &ctx.decl(*templated).kind {
                    DeclKind::Function(func) => self.import_function(*templated, func),
                    _ => LookupResult::default(),
                }
            }
            DeclKind::Record(record) => {
                let result = self.import_record(key);
                // Nested decls are visited even when the record itself could
                // not be imported, so that their diagnostics still surface.
                self.import_decls_from_context(&record.decls);
                result
            }
            DeclKind::Typedef(typedef) => self.import_typedef(key, typedef),
            DeclKind::ClassTemplate { .. } => {
                LookupResult::from_error("Class templates are not supported yet")
            }
            DeclKind::Namespace(_) | DeclKind::Other { .. } => LookupResult::default(),
        }
    }

    /// Stable tie-break for items generated from the same source range.
    fn local_order(&self, key: DeclKey) -> i32 {
        let decl = self.ctx.decl(key);
        match &decl.kind {
            DeclKind::Record(_) => {
                let nested_in_record = decl
                    .parent
                    .map_or(false, |p| matches!(self.ctx.decl(p).kind, DeclKind::Record(_)));
                if nested_in_record {
                    1
                } else {
                    0
                }
            }
            DeclKind::Function(func) => match &func.method {
                Some(method) => {
                    if let Some(ctor) = &method.constructor {
                        match ctor.kind {
                            CtorKind::Default => 2,
                            CtorKind::Copy => 3,
                            CtorKind::Move => 4,
                            CtorKind::Other => 5,
                        }
                    } else if method.is_destructor {
                        6
                    } else {
                        7
                    }
                }
                None => 7,
            },
            _ => 7,
        }
    }

    fn ordered_items(&self) -> Vec<Item> {
        let mut items: Vec<(SourceRange, i32, Item)> = Vec::new();

        for (&key, result) in &self.lookup_cache {
            let decl = self.ctx.decl(key);
            let local_order = self.local_order(key);

            if let Some(item) = result.item() {
                items.push((decl.range, local_order, item.clone()));
            }
            if self.is_from_current_target(key) {
                for error in result.errors() {
                    let name = self
                        .ctx
                        .qualified_name(key)
                        .unwrap_or_else(|| "unnamed".to_string());
                    items.push((
                        decl.range,
                        local_order,
                        UnsupportedItem {
                            name,
                            message: error.clone(),
                            source_loc: names::convert_source_loc(self.ctx, decl.range.begin),
                        }
                        .into(),
                    ));
                }
            }
        }

        for (range, text) in self.free_comments() {
            items.push((range, 0, Comment { text }.into()));
        }

        items.sort_by(item_order);
        items.into_iter().map(|(_, _, item)| item).collect()
    }

    /// Comments from the entry headers that are neither the doc comment of an
    /// imported declaration nor located inside one.
    fn free_comments(&self) -> Vec<(SourceRange, String)> {
        let mut ordered: BTreeMap<u64, crate::ast::CommentId> = BTreeMap::new();
        for header in &self.invocation.entry_headers {
            for (id, comment) in self.ctx.comments_in_file(&header.0) {
                ordered.insert(comment.begin.offset, id);
            }
        }

        for (&key, result) in &self.lookup_cache {
            if result.item().is_none() {
                continue;
            }
            let decl = self.ctx.decl(key);
            if let Some(id) = decl.raw_comment {
                ordered.remove(&self.ctx.comment(id).begin.offset);
            }
            // TODO: retain floating comments inside record and namespace
            // bodies instead of erasing the whole range.
            if let (Some(begin), Some(end)) = (decl.range.begin, decl.range.end) {
                let inside: Vec<u64> =
                    ordered.range(begin.offset..=end.offset).map(|(k, _)| *k).collect();
                for k in inside {
                    ordered.remove(&k);
                }
            }
        }

        ordered
            .into_values()
            .map(|id| {
                let comment = self.ctx.comment(id);
                (
                    SourceRange { begin: Some(comment.begin), end: Some(comment.end) },
                    comment.text.clone(),
                )
            })
            .collect()
    }
}

// Items sort by source range (invalid ranges first), with `local_order`
// breaking ties among items generated for the same range.
fn item_order(a: &(SourceRange, i32, Item), b: &(SourceRange, i32, Item)) -> Ordering {
    let (a_range, a_local, _) = a;
    let (b_range, b_local, _) = b;
    match ((a_range.begin, a_range.end), (b_range.begin, b_range.end)) {
        ((Some(a_begin), Some(a_end)), (Some(b_begin), Some(b_end))) => a_begin
            .offset
            .cmp(&b_begin.offset)
            .then(a_end.offset.cmp(&b_end.offset))
            .then(a_local.cmp(b_local)),
        ((Some(_), Some(_)), _) => Ordering::Greater,
        (_, (Some(_), Some(_))) => Ordering::Less,
        _ => a_local.cmp(b_local),
    }
}
