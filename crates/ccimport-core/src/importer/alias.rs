//! The typedef importer.

use crate::ast::{DeclKey, DeclKind, TypedefDecl};
use crate::ir::{DeclId, TypeAlias};

use super::{names, types, Importer, LookupResult};

impl Importer<'_> {
    pub(super) fn import_typedef(&mut self, key: DeclKey, typedef: &TypedefDecl) -> LookupResult {
        let ctx = self.ctx;
        let decl = ctx.decl(key);
        if let Some(parent) = decl.parent {
            match &ctx.decl(parent).kind {
                DeclKind::Function(_) | DeclKind::FunctionTemplate { .. } => {
                    return LookupResult::default();
                }
                DeclKind::Record(_) => {
                    return LookupResult::from_error(
                        "Typedefs nested in classes are not supported yet",
                    );
                }
                _ => {}
            }
        }

        // Well-known types are substituted directly by the type mapper, so no
        // alias item is needed for them.
        if types::well_known_type(&typedef.spelling).is_some() {
            return LookupResult::default();
        }

        let identifier = names::translate_identifier(&typedef.name)
            .expect("couldn't get an identifier for a typedef declaration");

        match self.convert_type(&typedef.underlying, None, true) {
            Ok(underlying_type) => {
                let canonical = ctx.canonical(key);
                self.known_type_decls.insert(canonical);
                LookupResult::from_item(TypeAlias {
                    identifier,
                    decl_id: DeclId(canonical.0),
                    owning_target: self.owning_target(key),
                    underlying_type,
                })
            }
            Err(err) => LookupResult::from_error(err.to_string()),
        }
    }
}
