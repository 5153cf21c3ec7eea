//! The intermediate representation consumed by the code emitters.
//!
//! Items appear in source order (see `importer` for the ordering contract).
//! The JSON form uses externally tagged variants and two-space indentation;
//! `serialize_ir`/`deserialize_ir` are the only supported entry points.

use std::io::Read;

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeaderName(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(pub String);

impl<T: Into<String>> From<T> for Label {
    fn from(label: T) -> Self {
        Self(label.into())
    }
}

/// Stable handle for a canonical declaration. Two `DeclId`s compare equal iff
/// they denote the same canonical declaration within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeclId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LifetimeId(pub u32);

/// A named lifetime parameter of a function.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Lifetime {
    pub name: String,
    pub id: LifetimeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    pub identifier: String,
}

impl Identifier {
    pub fn new(identifier: impl Into<String>) -> Self {
        Identifier { identifier: identifier.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnqualifiedIdentifier {
    Identifier(Identifier),
    Constructor,
    Destructor,
}

/// Paired C++-side and target-side representation of one type.
///
/// Only the C++ side is const-qualified by the importer; volatile is
/// intentionally not represented.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MappedType {
    pub kind: TypeKind,
    pub cc_const: bool,
    pub target_const: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    Void,
    Simple {
        cc_name: String,
        target_name: String,
    },
    PointerTo {
        pointee: Box<MappedType>,
        lifetime: Option<LifetimeId>,
        nullable: bool,
    },
    LValueReferenceTo {
        pointee: Box<MappedType>,
        lifetime: Option<LifetimeId>,
    },
    WithDeclIds {
        cc_name: String,
        cc_id: DeclId,
        target_name: String,
        target_id: DeclId,
    },
}

impl MappedType {
    pub fn void() -> Self {
        MappedType { kind: TypeKind::Void, cc_const: false, target_const: false }
    }

    pub fn simple(target_name: impl Into<String>, cc_name: impl Into<String>) -> Self {
        MappedType {
            kind: TypeKind::Simple { cc_name: cc_name.into(), target_name: target_name.into() },
            cc_const: false,
            target_const: false,
        }
    }

    pub fn pointer_to(pointee: MappedType, lifetime: Option<LifetimeId>, nullable: bool) -> Self {
        MappedType {
            kind: TypeKind::PointerTo { pointee: Box::new(pointee), lifetime, nullable },
            cc_const: false,
            target_const: false,
        }
    }

    pub fn lvalue_reference_to(pointee: MappedType, lifetime: Option<LifetimeId>) -> Self {
        MappedType {
            kind: TypeKind::LValueReferenceTo { pointee: Box::new(pointee), lifetime },
            cc_const: false,
            target_const: false,
        }
    }

    pub fn with_decl_ids(
        target_name: impl Into<String>,
        target_id: DeclId,
        cc_name: impl Into<String>,
        cc_id: DeclId,
    ) -> Self {
        MappedType {
            kind: TypeKind::WithDeclIds {
                cc_name: cc_name.into(),
                cc_id,
                target_name: target_name.into(),
                target_id,
            },
            cc_const: false,
            target_const: false,
        }
    }

    /// True if any leaf of this type is still unresolved. The importer never
    /// emits such a type; the check exists for consumers validating IR from
    /// untrusted producers.
    pub fn is_fully_resolved(&self) -> bool {
        match &self.kind {
            TypeKind::Void | TypeKind::Simple { .. } | TypeKind::WithDeclIds { .. } => true,
            TypeKind::PointerTo { pointee, .. } | TypeKind::LValueReferenceTo { pointee, .. } => {
                pointee.is_fully_resolved()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessSpecifier {
    Public,
    Protected,
    Private,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    pub identifier: Identifier,
    pub doc_comment: Option<String>,
    #[serde(rename = "type")]
    pub type_: MappedType,
    pub access: AccessSpecifier,
    /// Bit offset within the record.
    pub offset: u64,
}

/// How a special member function is defined. The exact classification is
/// computed by the frontend; the importer copies it through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialMemberDefinition {
    Trivial,
    NontrivialMembers,
    NontrivialSelf,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpecialMemberFunc {
    pub definition: SpecialMemberDefinition,
    pub access: AccessSpecifier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceQualification {
    LValue,
    RValue,
    Unqualified,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceMethodMetadata {
    pub reference: ReferenceQualification,
    pub is_const: bool,
    pub is_virtual: bool,
    pub is_explicit_ctor: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberFuncMetadata {
    pub record_id: DeclId,
    pub instance_method_metadata: Option<InstanceMethodMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FuncParam {
    #[serde(rename = "type")]
    pub type_: MappedType,
    pub identifier: Identifier,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Func {
    pub name: UnqualifiedIdentifier,
    pub decl_id: DeclId,
    pub owning_target: Label,
    pub doc_comment: Option<String>,
    pub mangled_name: String,
    pub return_type: MappedType,
    pub params: Vec<FuncParam>,
    /// Sorted by name; contains every lifetime referenced in the signature.
    pub lifetime_params: Vec<Lifetime>,
    pub is_inline: bool,
    pub member_func_metadata: Option<MemberFuncMetadata>,
    pub source_loc: SourceLoc,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    pub identifier: Identifier,
    pub decl_id: DeclId,
    pub owning_target: Label,
    pub doc_comment: Option<String>,
    pub fields: Vec<Field>,
    /// Size and alignment in bytes.
    pub size: u64,
    pub alignment: u64,
    pub copy_constructor: SpecialMemberFunc,
    pub move_constructor: SpecialMemberFunc,
    pub destructor: SpecialMemberFunc,
    pub is_trivial_abi: bool,
    pub is_final: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeAlias {
    pub identifier: Identifier,
    pub decl_id: DeclId,
    pub owning_target: Label,
    pub underlying_type: MappedType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLoc {
    /// Filename with a leading `./` stripped; empty for invalid locations.
    pub filename: String,
    pub line: u64,
    pub column: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnsupportedItem {
    /// Fully qualified name, or `"unnamed"`.
    pub name: String,
    pub message: String,
    pub source_loc: SourceLoc,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Item {
    Func(Func),
    Record(Record),
    TypeAlias(TypeAlias),
    UnsupportedItem(UnsupportedItem),
    Comment(Comment),
}

impl From<Func> for Item {
    fn from(func: Func) -> Item {
        Item::Func(func)
    }
}

impl From<Record> for Item {
    fn from(record: Record) -> Item {
        Item::Record(record)
    }
}

impl From<TypeAlias> for Item {
    fn from(alias: TypeAlias) -> Item {
        Item::TypeAlias(alias)
    }
}

impl From<UnsupportedItem> for Item {
    fn from(unsupported: UnsupportedItem) -> Item {
        Item::UnsupportedItem(unsupported)
    }
}

impl From<Comment> for Item {
    fn from(comment: Comment) -> Item {
        Item::Comment(comment)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IR {
    #[serde(default)]
    pub used_headers: Vec<HeaderName>,
    pub current_target: Label,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl IR {
    pub fn functions(&self) -> impl Iterator<Item = &Func> {
        self.items.iter().filter_map(|item| match item {
            Item::Func(func) => Some(func),
            _ => None,
        })
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.items.iter().filter_map(|item| match item {
            Item::Record(record) => Some(record),
            _ => None,
        })
    }

    pub fn type_aliases(&self) -> impl Iterator<Item = &TypeAlias> {
        self.items.iter().filter_map(|item| match item {
            Item::TypeAlias(alias) => Some(alias),
            _ => None,
        })
    }

    pub fn unsupported_items(&self) -> impl Iterator<Item = &UnsupportedItem> {
        self.items.iter().filter_map(|item| match item {
            Item::UnsupportedItem(unsupported) => Some(unsupported),
            _ => None,
        })
    }

    pub fn comments(&self) -> impl Iterator<Item = &Comment> {
        self.items.iter().filter_map(|item| match item {
            Item::Comment(comment) => Some(comment),
            _ => None,
        })
    }
}

pub fn deserialize_ir<R: Read>(reader: R) -> Result<IR> {
    Ok(serde_json::from_reader(reader)?)
}

/// Pretty-printed (two-space indented) JSON form of the IR.
pub fn serialize_ir(ir: &IR) -> Result<String> {
    Ok(serde_json::to_string_pretty(ir)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_used_headers() {
        let input = r#"
        {
            "used_headers": ["foo/bar.h"],
            "current_target": "//foo:bar"
        }
        "#;
        let ir = deserialize_ir(input.as_bytes()).unwrap();
        let expected = IR {
            used_headers: vec![HeaderName("foo/bar.h".to_string())],
            current_target: "//foo:bar".into(),
            items: vec![],
        };
        assert_eq!(ir, expected);
    }

    #[test]
    fn test_round_trip_record() {
        let ir = IR {
            used_headers: vec![HeaderName("foo/bar.h".to_string())],
            current_target: "//foo:bar".into(),
            items: vec![Item::Record(Record {
                identifier: Identifier::new("SomeStruct"),
                decl_id: DeclId(42),
                owning_target: "//foo:bar".into(),
                doc_comment: None,
                fields: vec![Field {
                    identifier: Identifier::new("ptr"),
                    doc_comment: None,
                    type_: MappedType::pointer_to(
                        MappedType::simple("i32", "int"),
                        None,
                        true,
                    ),
                    access: AccessSpecifier::Public,
                    offset: 0,
                }],
                size: 8,
                alignment: 8,
                copy_constructor: SpecialMemberFunc {
                    definition: SpecialMemberDefinition::Trivial,
                    access: AccessSpecifier::Public,
                },
                move_constructor: SpecialMemberFunc {
                    definition: SpecialMemberDefinition::Trivial,
                    access: AccessSpecifier::Public,
                },
                destructor: SpecialMemberFunc {
                    definition: SpecialMemberDefinition::Trivial,
                    access: AccessSpecifier::Public,
                },
                is_trivial_abi: true,
                is_final: false,
            })],
        };
        let json = serialize_ir(&ir).unwrap();
        let back = deserialize_ir(json.as_bytes()).unwrap();
        assert_eq!(ir, back);
    }

    #[test]
    fn test_member_access_specifiers() {
        let input = r#"
        {
            "current_target": "//foo:bar",
            "items": [
                { "Record": {
                    "identifier": { "identifier": "SomeStruct" },
                    "decl_id": 42,
                    "owning_target": "//foo:bar",
                    "doc_comment": null,
                    "fields": [
                        {
                            "identifier": { "identifier": "public_int" },
                            "doc_comment": null,
                            "type": {
                                "kind": { "Simple": { "cc_name": "int", "target_name": "i32" } },
                                "cc_const": false,
                                "target_const": false
                            },
                            "access": "Public",
                            "offset": 0
                        },
                        {
                            "identifier": { "identifier": "private_int" },
                            "doc_comment": null,
                            "type": {
                                "kind": { "Simple": { "cc_name": "int", "target_name": "i32" } },
                                "cc_const": false,
                                "target_const": false
                            },
                            "access": "Private",
                            "offset": 32
                        }
                    ],
                    "size": 8,
                    "alignment": 4,
                    "copy_constructor": { "definition": "NontrivialSelf", "access": "Private" },
                    "move_constructor": { "definition": "Deleted", "access": "Protected" },
                    "destructor": { "definition": "Trivial", "access": "Public" },
                    "is_trivial_abi": true,
                    "is_final": false
                }}
            ]
        }
        "#;
        let ir = deserialize_ir(input.as_bytes()).unwrap();
        let record = ir.records().next().unwrap();
        assert_eq!(record.fields[0].access, AccessSpecifier::Public);
        assert_eq!(record.fields[1].access, AccessSpecifier::Private);
        assert_eq!(
            record.copy_constructor,
            SpecialMemberFunc {
                definition: SpecialMemberDefinition::NontrivialSelf,
                access: AccessSpecifier::Private,
            }
        );
    }

    #[test]
    fn test_fully_resolved() {
        let ok = MappedType::pointer_to(MappedType::simple("f64", "double"), None, true);
        assert!(ok.is_fully_resolved());
    }
}
