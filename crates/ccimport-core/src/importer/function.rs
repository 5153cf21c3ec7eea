//! The function importer.

use std::collections::BTreeSet;

use crate::ast::lifetimes::Lifetime;
use crate::ast::{DeclKey, DeclKind, DeclName, FunctionDecl, QualType, RefQualifier, TypeNode};
use crate::ir::{
    AccessSpecifier, DeclId, Func, FuncParam, Identifier, InstanceMethodMetadata,
    MemberFuncMetadata, ReferenceQualification,
};

use super::{names, Importer, LookupResult};

impl Importer<'_> {
    pub(super) fn import_function(&mut self, key: DeclKey, func: &FunctionDecl) -> LookupResult {
        if !self.is_from_current_target(key) {
            return LookupResult::default();
        }
        if func.is_deleted {
            return LookupResult::default();
        }
        if func.is_templated {
            return LookupResult::from_error("Function templates are not supported yet");
        }

        let lifetimes = self.oracle.function_lifetimes(key);
        let mut all_lifetimes: BTreeSet<Lifetime> = BTreeSet::new();

        let mut params: Vec<FuncParam> = Vec::new();
        let mut errors: Vec<String> = Vec::new();

        if let Some(method) = &func.method {
            if !self.known_type_decls.contains(&self.ctx.canonical(method.parent)) {
                return LookupResult::from_error("Couldn't import the parent");
            }

            // Non-static member functions receive an implicit `this`
            // parameter.
            if method.is_instance {
                let this_lifetimes = lifetimes.map(|l| l.this_lifetimes.clone());
                if let Some(tl) = &this_lifetimes {
                    all_lifetimes.extend(tl.iter().copied());
                }
                let this_type = method
                    .this_type
                    .as_ref()
                    .expect("instance method without a `this` type in the dump");
                match self.convert_type(this_type, this_lifetimes, /* nullable= */ false) {
                    Ok(param_type) => params.push(FuncParam {
                        type_: param_type,
                        identifier: Identifier::new("__this"),
                    }),
                    Err(err) => errors.push(err.to_string()),
                }
            }
        }

        if let Some(l) = lifetimes {
            assert_eq!(
                l.param_lifetimes.len(),
                func.params.len(),
                "lifetime annotation count does not match the parameter count"
            );
        }
        for (i, param) in func.params.iter().enumerate() {
            let param_lifetimes = lifetimes.map(|l| l.param_lifetimes[i].clone());
            if let Some(pl) = &param_lifetimes {
                all_lifetimes.extend(pl.iter().copied());
            }
            let param_type = match self.convert_type(&param.type_, param_lifetimes, true) {
                Ok(param_type) => param_type,
                Err(_) => {
                    // Keep going so that every unsupported parameter type is
                    // reported in one pass.
                    errors.push(format!(
                        "Parameter type '{}' is not supported",
                        param.type_.qualified_spelling()
                    ));
                    continue;
                }
            };

            if let Some(message) = self.non_trivial_abi_by_value(&param.type_, "parameter") {
                errors.push(message);
            }

            params.push(FuncParam {
                type_: param_type,
                identifier: names::translate_param_identifier(&param.name, i),
            });
        }

        if let Some(message) = self.non_trivial_abi_by_value(&func.return_type, "return type") {
            errors.push(message);
        }

        let return_lifetimes = lifetimes.map(|l| l.return_lifetimes.clone());
        if let Some(rl) = &return_lifetimes {
            all_lifetimes.extend(rl.iter().copied());
        }
        let return_type = match self.convert_type(&func.return_type, return_lifetimes, true) {
            Ok(return_type) => Some(return_type),
            Err(_) => {
                errors.push(format!(
                    "Return type '{}' is not supported",
                    func.return_type.qualified_spelling()
                ));
                None
            }
        };

        let mut lifetime_params: Vec<crate::ir::Lifetime> = all_lifetimes
            .iter()
            .map(|lifetime| crate::ir::Lifetime {
                name: self
                    .oracle
                    .symbol_table()
                    .lookup_lifetime(*lifetime)
                    .expect("lifetime is missing from the symbol table")
                    .to_string(),
                id: crate::ir::LifetimeId(lifetime.0),
            })
            .collect();
        lifetime_params.sort_by(|a, b| a.name.cmp(&b.name));

        let mut member_func_metadata = None;
        if let Some(method) = &func.method {
            match method.access {
                AccessSpecifier::Public => {}
                // The IR has no use for Funcs representing private methods.
                AccessSpecifier::Protected | AccessSpecifier::Private => {
                    return LookupResult::default();
                }
            }
            let instance_method_metadata =
                method.is_instance.then(|| InstanceMethodMetadata {
                    reference: match method.ref_qualifier {
                        RefQualifier::None => ReferenceQualification::Unqualified,
                        RefQualifier::LValue => ReferenceQualification::LValue,
                        RefQualifier::RValue => ReferenceQualification::RValue,
                    },
                    is_const: method.is_const,
                    is_virtual: method.is_virtual,
                    is_explicit_ctor: method.constructor.map_or(false, |c| c.is_explicit),
                });
            member_func_metadata = Some(MemberFuncMetadata {
                record_id: DeclId(self.ctx.canonical(method.parent).0),
                instance_method_metadata,
            });
        }

        if !errors.is_empty() {
            return LookupResult::from_errors(errors);
        }

        let Some(translated_name) = names::translate_name(&func.name) else {
            return LookupResult::default();
        };
        let return_type = return_type.expect("return type converted when no errors were recorded");

        let decl = self.ctx.decl(key);
        LookupResult::from_item(Func {
            name: translated_name,
            decl_id: DeclId(self.ctx.canonical(key).0),
            owning_target: self.owning_target(key),
            doc_comment: self.doc_comment(key),
            mangled_name: mangled_name(func),
            return_type,
            params,
            lifetime_params,
            is_inline: func.is_inline,
            member_func_metadata,
            source_loc: names::convert_source_loc(self.ctx, decl.range.begin),
        })
    }

    /// By-value record parameters and returns must be passable in registers;
    /// anything else needs a representation the bindings cannot provide yet.
    fn non_trivial_abi_by_value(&self, ty: &QualType, what: &str) -> Option<String> {
        let TypeNode::Tag { decl } = &ty.node else {
            return None;
        };
        let DeclKind::Record(record) = &self.ctx.decl(*decl).kind else {
            return None;
        };
        let definition = match record.definition {
            Some(def_key) => match &self.ctx.decl(def_key).kind {
                DeclKind::Record(def) => def,
                _ => record,
            },
            None => record,
        };
        if definition.can_pass_in_registers {
            return None;
        }
        Some(format!(
            "Non-trivial_abi type '{}' is not supported by value as a {}",
            ty.qualified_spelling(),
            what
        ))
    }
}

/// The symbol the linker will see. Constructors and destructors have several
/// mangled variants; only the complete-object one is callable for our
/// purposes, so that is the one recorded in the IR.
fn mangled_name(func: &FunctionDecl) -> String {
    match func.name {
        DeclName::Constructor | DeclName::Destructor => func
            .complete_object_mangled_name
            .clone()
            .expect("structor lacks a complete-object mangled name"),
        _ => func.mangled_name.clone(),
    }
}
