//! The type mapper: converts one qualified C++ type into a `MappedType`.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;

use crate::ast::lifetimes::TypeLifetimes;
use crate::ast::{BuiltinKind, QualType, TypeNode};
use crate::ir::{DeclId, LifetimeId, MappedType};

use super::{names, Importer};

// C++ standard types with a fixed target-language equivalent. These bypass
// the generic mapping so the result is idiomatic rather than desugared.
static WELL_KNOWN_TYPES: Lazy<BTreeMap<&'static str, &'static str>> = Lazy::new(|| {
    BTreeMap::from([
        ("ptrdiff_t", "isize"),
        ("intptr_t", "isize"),
        ("size_t", "usize"),
        ("uintptr_t", "usize"),
        ("std::ptrdiff_t", "isize"),
        ("std::intptr_t", "isize"),
        ("std::size_t", "usize"),
        ("std::uintptr_t", "usize"),
        ("int8_t", "i8"),
        ("int16_t", "i16"),
        ("int32_t", "i32"),
        ("int64_t", "i64"),
        ("std::int8_t", "i8"),
        ("std::int16_t", "i16"),
        ("std::int32_t", "i32"),
        ("std::int64_t", "i64"),
        ("uint8_t", "u8"),
        ("uint16_t", "u16"),
        ("uint32_t", "u32"),
        ("uint64_t", "u64"),
        ("std::uint8_t", "u8"),
        ("std::uint16_t", "u16"),
        ("std::uint32_t", "u32"),
        ("std::uint64_t", "u64"),
        ("char16_t", "u16"),
        ("char32_t", "u32"),
        ("wchar_t", "i32"),
    ])
});

pub(super) fn well_known_type(spelling: &str) -> Option<&'static str> {
    WELL_KNOWN_TYPES.get(spelling).copied()
}

/// A type the mapper cannot represent. Carries the spelled form so that
/// downstream tooling can pattern-match on the offending type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedTypeError {
    pub type_spelling: String,
}

impl fmt::Display for UnsupportedTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unsupported type '{}'", self.type_spelling)
    }
}

impl std::error::Error for UnsupportedTypeError {}

fn pop_lifetime(lifetimes: &mut Option<TypeLifetimes>) -> Option<LifetimeId> {
    lifetimes.as_mut().map(|stack| {
        let lifetime = stack
            .pop()
            .expect("lifetime stack exhausted before the type was fully unwrapped");
        LifetimeId(lifetime.0)
    })
}

impl Importer<'_> {
    /// Converts `ty`, consuming one lifetime from the top of `lifetimes` per
    /// pointer/reference level. The stack mutates across recursive calls;
    /// callers that want to inspect it afterwards must pass their own copy.
    pub(crate) fn convert_type(
        &self,
        ty: &QualType,
        mut lifetimes: Option<TypeLifetimes>,
        nullable: bool,
    ) -> Result<MappedType, UnsupportedTypeError> {
        let mut mapped: Option<MappedType> = None;

        if let Some(target_name) = well_known_type(&ty.spelling) {
            mapped = Some(MappedType::simple(target_name, ty.spelling.clone()));
        } else {
            match &ty.node {
                TypeNode::Pointer { pointee } => {
                    let lifetime = pop_lifetime(&mut lifetimes);
                    if let Ok(pointee_type) = self.convert_type(pointee, lifetimes, true) {
                        mapped = Some(MappedType::pointer_to(pointee_type, lifetime, nullable));
                    }
                }
                TypeNode::LValueReference { pointee } => {
                    let lifetime = pop_lifetime(&mut lifetimes);
                    if let Ok(pointee_type) = self.convert_type(pointee, lifetimes, true) {
                        mapped = Some(MappedType::lvalue_reference_to(pointee_type, lifetime));
                    }
                }
                TypeNode::Builtin(kind) => {
                    mapped = match kind {
                        BuiltinKind::Bool => Some(MappedType::simple("bool", "bool")),
                        BuiltinKind::Float => Some(MappedType::simple("f32", "float")),
                        BuiltinKind::Double => Some(MappedType::simple("f64", "double")),
                        BuiltinKind::Void => Some(MappedType::void()),
                        BuiltinKind::SignedInt { width }
                            if matches!(width, 8 | 16 | 32 | 64) =>
                        {
                            Some(MappedType::simple(format!("i{width}"), ty.spelling.clone()))
                        }
                        BuiltinKind::UnsignedInt { width }
                            if matches!(width, 8 | 16 | 32 | 64) =>
                        {
                            Some(MappedType::simple(format!("u{width}"), ty.spelling.clone()))
                        }
                        _ => None,
                    };
                }
                TypeNode::Tag { decl } | TypeNode::Typedef { decl } => {
                    let canonical = self.ctx.canonical(*decl);
                    if self.known_type_decls.contains(&canonical) {
                        if let Some(identifier) = self
                            .ctx
                            .decl_name(*decl)
                            .as_deref()
                            .and_then(names::translate_identifier)
                        {
                            let decl_id = DeclId(canonical.0);
                            mapped = Some(MappedType::with_decl_ids(
                                identifier.identifier.clone(),
                                decl_id,
                                identifier.identifier,
                                decl_id,
                            ));
                        }
                    }
                }
                TypeNode::RValueReference { .. } | TypeNode::Other => {}
            }
        }

        let Some(mut mapped) = mapped else {
            return Err(UnsupportedTypeError { type_spelling: ty.spelling.clone() });
        };

        mapped.cc_const = ty.is_const;
        // Volatile pointers do not exist in the target language; volatile
        // qualifiers are dropped here.

        Ok(mapped)
    }
}
