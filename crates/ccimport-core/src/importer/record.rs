//! The record and field importers.

use crate::ast::{DeclKey, DeclKind, RecordDecl, TagKind};
use crate::ir::{AccessSpecifier, DeclId, Field, Record};

use super::{names, Importer, LookupResult};

impl Importer<'_> {
    pub(super) fn import_record(&mut self, key: DeclKey) -> LookupResult {
        let ctx = self.ctx;
        let decl = ctx.decl(key);
        let DeclKind::Record(record) = &decl.kind else {
            return LookupResult::default();
        };

        if let Some(parent) = decl.parent {
            match &ctx.decl(parent).kind {
                DeclKind::Function(_) | DeclKind::FunctionTemplate { .. } => {
                    return LookupResult::default();
                }
                DeclKind::Record(_) => {
                    if record.is_injected_class_name {
                        return LookupResult::default();
                    }
                    return LookupResult::from_error("Nested classes are not supported yet");
                }
                _ => {}
            }
        }
        if record.is_injected_class_name {
            return LookupResult::default();
        }
        if record.tag_kind == TagKind::Union {
            return LookupResult::from_error("Unions are not supported yet");
        }

        // The rest needs a definition the layout query will accept.
        let Some(def_key) = record.definition else {
            return LookupResult::default();
        };
        let DeclKind::Record(def) = &ctx.decl(def_key).kind else {
            return LookupResult::default();
        };
        if def.is_invalid || !def.is_complete_definition {
            return LookupResult::default();
        }

        if def.is_template {
            return LookupResult::from_error("Class templates are not supported yet");
        }

        // Implicit members must be declared before their properties can be
        // queried.
        ctx.force_declaration_of_implicit_members(def_key);
        let default_access = match def.tag_kind {
            TagKind::Class => AccessSpecifier::Private,
            TagKind::Struct | TagKind::Union => AccessSpecifier::Public,
        };
        let is_final = def.is_effectively_final;

        let Some(record_name) =
            names::translate_identifier(def.name.as_deref().unwrap_or(""))
        else {
            return LookupResult::default();
        };

        // Provisionally assume this record is known so that fields whose type
        // mentions the record itself can still be converted.
        let canonical = ctx.canonical(key);
        self.known_type_decls.insert(canonical);
        let fields = match self.import_fields(def_key, def, default_access) {
            Ok(fields) => fields,
            Err(_field_error) => {
                // Importing a field failed, so this record is not known after
                // all.
                self.known_type_decls.remove(&canonical);
                return LookupResult::from_error("Importing field failed");
            }
        };

        let layout = ctx.record_layout(def_key);
        let special = ctx.special_members(def_key);
        LookupResult::from_item(Record {
            identifier: record_name,
            decl_id: DeclId(canonical.0),
            owning_target: self.owning_target(def_key),
            doc_comment: self.doc_comment(def_key),
            fields,
            size: layout.size,
            alignment: layout.alignment,
            copy_constructor: special.copy_constructor,
            move_constructor: special.move_constructor,
            destructor: special.destructor,
            is_trivial_abi: def.can_pass_in_registers,
            is_final,
        })
    }

    /// Either every field converts, or the record is not emitted at all.
    fn import_fields(
        &self,
        def_key: DeclKey,
        def: &RecordDecl,
        default_access: AccessSpecifier,
    ) -> Result<Vec<Field>, String> {
        let layout = self.ctx.record_layout(def_key);
        let mut fields = Vec::with_capacity(def.fields.len());
        for (i, field) in def.fields.iter().enumerate() {
            let type_ = self
                .convert_type(&field.type_, None, true)
                .map_err(|_| {
                    format!(
                        "Field type '{}' is not supported",
                        field.type_.qualified_spelling()
                    )
                })?;
            let access = field.access.unwrap_or(default_access);
            let Some(identifier) = names::translate_identifier(&field.name) else {
                return Err(format!("Cannot translate name for field '{}'", field.name));
            };
            fields.push(Field {
                identifier,
                doc_comment: self.clean_comment(field.raw_comment),
                type_,
                access,
                offset: layout.field_offsets[i],
            });
        }
        Ok(fields)
    }
}
