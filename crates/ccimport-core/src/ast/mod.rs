//! Typed model of the frontend's semantics dump.
//!
//! The C++ frontend is an external executable (see [`invoke`]) that parses a
//! translation unit and prints one JSON document: flat tables of source
//! files, declarations and raw comments, plus per-record layouts and
//! per-function mangled names. This module owns the deserialized form and the
//! lookup surface the importer works against. Nothing here understands C++
//! source text; that stays in the frontend.

pub mod invoke;
pub mod lifetimes;

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use anyhow::{bail, ensure, Result};
use serde::{Deserialize, Serialize};

use crate::ir::{AccessSpecifier, HeaderName, Label, SpecialMemberFunc};
use self::lifetimes::FunctionLifetimes;

/// Index into [`TranslationUnit::decls`]. This is the frontend's declaration
/// handle; the importer derives [`crate::ir::DeclId`]s from canonical keys.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DeclKey(pub usize);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct FileId(pub usize);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CommentId(pub usize);

/// A resolved location. `offset` is a translation-unit-wide monotone key:
/// `a` precedes `b` in the TU iff `a.offset < b.offset`. Invalid locations
/// are represented as `Option::None` at the use site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: FileId,
    pub line: u64,
    pub column: u64,
    pub offset: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRange {
    #[serde(default)]
    pub begin: Option<SourceLocation>,
    #[serde(default)]
    pub end: Option<SourceLocation>,
}

impl SourceRange {
    pub fn is_valid(&self) -> bool {
        self.begin.is_some() && self.end.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// `None` for built-in buffers (e.g. predefines) that have no file.
    #[serde(default)]
    pub name: Option<String>,
    /// Location of the `#include` that brought this file in, if any.
    #[serde(default)]
    pub included_from: Option<SourceLocation>,
    #[serde(default)]
    pub is_system_header: bool,
}

/// A raw comment with its pre-formatted text (comment markers stripped by the
/// frontend, like clang's `getFormattedText`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawComment {
    pub begin: SourceLocation,
    pub end: SourceLocation,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decl {
    /// Canonical declaration this one redeclares; `None` means self.
    #[serde(default)]
    pub canonical: Option<DeclKey>,
    /// Enclosing declaration context; `None` for top-level decls.
    #[serde(default)]
    pub parent: Option<DeclKey>,
    /// Primary location, used for owning-target resolution.
    #[serde(default)]
    pub loc: Option<SourceLocation>,
    #[serde(default)]
    pub range: SourceRange,
    /// Doc comment attached to this decl by the frontend.
    #[serde(default)]
    pub raw_comment: Option<CommentId>,
    pub kind: DeclKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeclKind {
    Namespace(NamespaceDecl),
    Function(FunctionDecl),
    FunctionTemplate {
        templated: DeclKey,
    },
    Record(RecordDecl),
    ClassTemplate {
        name: String,
    },
    Typedef(TypedefDecl),
    /// Declaration kinds the importer has no interest in (enums, variables,
    /// using-directives, ...). Silently skipped.
    Other {
        #[serde(default)]
        name: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceDecl {
    pub name: String,
    #[serde(default)]
    pub decls: Vec<DeclKey>,
}

/// How the frontend spelled a declaration's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeclName {
    Identifier(String),
    Constructor,
    Destructor,
    /// Operators, conversion functions, literal operators, deduction guides.
    /// The payload is the diagnostic spelling.
    Special(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: DeclName,
    /// Symbol produced by mangling the declaration directly.
    pub mangled_name: String,
    /// Complete-object variant for constructors and destructors; those have
    /// more than one global symbol and the direct mangling is not callable.
    #[serde(default)]
    pub complete_object_mangled_name: Option<String>,
    pub return_type: QualType,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub is_templated: bool,
    #[serde(default)]
    pub is_inline: bool,
    #[serde(default)]
    pub method: Option<MethodInfo>,
    /// Lifetime annotations resolved by the external inference engine, when
    /// it succeeded for this function.
    #[serde(default)]
    pub lifetimes: Option<FunctionLifetimes>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDecl {
    /// Empty for unnamed parameters.
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub type_: QualType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefQualifier {
    None,
    LValue,
    RValue,
}

impl Default for RefQualifier {
    fn default() -> Self {
        RefQualifier::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CtorKind {
    Default,
    Copy,
    Move,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CtorInfo {
    pub kind: CtorKind,
    #[serde(default)]
    pub is_explicit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodInfo {
    /// The record this method belongs to.
    pub parent: DeclKey,
    pub access: AccessSpecifier,
    /// False for static member functions.
    #[serde(default)]
    pub is_instance: bool,
    #[serde(default)]
    pub ref_qualifier: RefQualifier,
    #[serde(default)]
    pub is_const: bool,
    #[serde(default)]
    pub is_virtual: bool,
    /// Type of the implicit object parameter; present for instance methods.
    #[serde(default)]
    pub this_type: Option<QualType>,
    #[serde(default)]
    pub constructor: Option<CtorInfo>,
    #[serde(default)]
    pub is_destructor: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagKind {
    Struct,
    Class,
    Union,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDecl {
    /// `None` for anonymous records.
    #[serde(default)]
    pub name: Option<String>,
    pub tag_kind: TagKind,
    #[serde(default)]
    pub is_injected_class_name: bool,
    #[serde(default)]
    pub is_invalid: bool,
    #[serde(default)]
    pub is_complete_definition: bool,
    /// The defining declaration (possibly this one); `None` if the record is
    /// only ever forward-declared.
    #[serde(default)]
    pub definition: Option<DeclKey>,
    /// Described by a class template, or a template specialization.
    #[serde(default)]
    pub is_template: bool,
    #[serde(default)]
    pub is_effectively_final: bool,
    #[serde(default)]
    pub can_pass_in_registers: bool,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
    #[serde(default)]
    pub layout: Option<RecordLayout>,
    /// Special-member summaries, computed by the frontend once implicit
    /// members have been forced (see [`AstContext::force_declaration_of_implicit_members`]).
    #[serde(default)]
    pub special_members: Option<SpecialMembers>,
    /// Nested declarations (methods, typedefs, nested records).
    #[serde(default)]
    pub decls: Vec<DeclKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    /// Empty for anonymous fields.
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub type_: QualType,
    /// `None` maps to the record's default access.
    #[serde(default)]
    pub access: Option<AccessSpecifier>,
    #[serde(default)]
    pub raw_comment: Option<CommentId>,
}

/// Record layout as computed by the frontend: size and alignment in bytes,
/// field offsets in bits, in field declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordLayout {
    pub size: u64,
    pub alignment: u64,
    #[serde(default)]
    pub field_offsets: Vec<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialMembers {
    pub copy_constructor: SpecialMemberFunc,
    pub move_constructor: SpecialMemberFunc,
    pub destructor: SpecialMemberFunc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedefDecl {
    pub name: String,
    /// How the typedef's own type prints, qualified (e.g. `std::size_t`).
    pub spelling: String,
    pub underlying: QualType,
}

/// A qualified type as the frontend spelled it. Sugar is preserved: a
/// typedef use is a `Typedef` node, not its desugared form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualType {
    #[serde(default)]
    pub is_const: bool,
    #[serde(default)]
    pub is_volatile: bool,
    /// Unqualified spelling, e.g. `int *` or `size_t`.
    pub spelling: String,
    pub node: TypeNode,
}

impl QualType {
    /// Spelling including qualifiers, for diagnostics.
    pub fn qualified_spelling(&self) -> String {
        let mut out = String::new();
        if self.is_const {
            out.push_str("const ");
        }
        if self.is_volatile {
            out.push_str("volatile ");
        }
        out.push_str(&self.spelling);
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeNode {
    Pointer { pointee: Box<QualType> },
    LValueReference { pointee: Box<QualType> },
    RValueReference { pointee: Box<QualType> },
    Builtin(BuiltinKind),
    /// Reference to a tag (record or enum) declaration.
    Tag { decl: DeclKey },
    Typedef { decl: DeclKey },
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuiltinKind {
    Bool,
    Void,
    Float,
    Double,
    SignedInt { width: u64 },
    UnsignedInt { width: u64 },
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TranslationUnit {
    #[serde(default)]
    pub schema_version: String,
    #[serde(default)]
    pub files: Vec<SourceFile>,
    #[serde(default)]
    pub comments: Vec<RawComment>,
    #[serde(default)]
    pub decls: Vec<Decl>,
    /// Declarations directly in the translation-unit context, in source order.
    #[serde(default)]
    pub top_level: Vec<DeclKey>,
    /// Symbolic names for lifetime ids, filled by the inference engine.
    #[serde(default)]
    pub lifetime_symbols: Vec<lifetimes::LifetimeSymbol>,
}

/// Lookup surface over one translation unit.
///
/// All indices are validated on construction, so accessors take plain keys
/// and panic only on importer bugs, never on malformed frontend output.
#[derive(Debug)]
pub struct AstContext {
    tu: TranslationUnit,
    /// Records whose implicit members have been forced. Mutation of frontend
    /// state is confined to this one set.
    forced_implicit_members: RefCell<BTreeSet<DeclKey>>,
}

impl AstContext {
    pub fn new(tu: TranslationUnit) -> Result<Self> {
        validate_indices(&tu)?;
        Ok(AstContext { tu, forced_implicit_members: RefCell::new(BTreeSet::new()) })
    }

    pub fn decl(&self, key: DeclKey) -> &Decl {
        &self.tu.decls[key.0]
    }

    pub fn canonical(&self, key: DeclKey) -> DeclKey {
        self.tu.decls[key.0].canonical.unwrap_or(key)
    }

    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.tu.files[id.0]
    }

    pub fn comment(&self, id: CommentId) -> &RawComment {
        &self.tu.comments[id.0]
    }

    pub fn top_level(&self) -> &[DeclKey] {
        &self.tu.top_level
    }

    pub fn lifetime_symbols(&self) -> &[lifetimes::LifetimeSymbol] {
        &self.tu.lifetime_symbols
    }

    /// All raw comments whose begin location lies in the named file, in
    /// source order.
    pub fn comments_in_file<'a>(
        &'a self,
        name: &str,
    ) -> impl Iterator<Item = (CommentId, &'a RawComment)> {
        let file_id = self
            .tu
            .files
            .iter()
            .position(|f| f.name.as_deref() == Some(name))
            .map(FileId);
        self.tu
            .comments
            .iter()
            .enumerate()
            .filter(move |(_, c)| Some(c.begin.file) == file_id)
            .map(|(i, c)| (CommentId(i), c))
    }

    /// Asks the frontend's semantic analyzer to declare the record's implicit
    /// special members. Must precede any [`Self::special_members`] query.
    pub fn force_declaration_of_implicit_members(&self, record: DeclKey) {
        self.forced_implicit_members.borrow_mut().insert(self.canonical(record));
    }

    pub fn special_members(&self, record: DeclKey) -> SpecialMembers {
        assert!(
            self.forced_implicit_members.borrow().contains(&self.canonical(record)),
            "special members queried before implicit members were forced"
        );
        let DeclKind::Record(record_decl) = &self.decl(record).kind else {
            panic!("special members queried on a non-record decl");
        };
        record_decl
            .special_members
            .expect("frontend dump lacks special-member summaries for a complete record")
    }

    pub fn record_layout(&self, record: DeclKey) -> &RecordLayout {
        let DeclKind::Record(record_decl) = &self.decl(record).kind else {
            panic!("layout queried on a non-record decl");
        };
        record_decl
            .layout
            .as_ref()
            .expect("frontend dump lacks a layout for a complete record")
    }

    /// Name of the declaration itself, without qualification.
    pub fn decl_name(&self, key: DeclKey) -> Option<String> {
        match &self.decl(key).kind {
            DeclKind::Namespace(ns) => Some(ns.name.clone()),
            DeclKind::Function(f) => match &f.name {
                DeclName::Identifier(name) if !name.is_empty() => Some(name.clone()),
                DeclName::Constructor => self
                    .method_parent_name(f)
                    .map(|parent| parent.clone()),
                DeclName::Destructor => {
                    self.method_parent_name(f).map(|parent| format!("~{parent}"))
                }
                DeclName::Special(spelling) => Some(spelling.clone()),
                DeclName::Identifier(_) => None,
            },
            DeclKind::FunctionTemplate { templated } => self.decl_name(*templated),
            DeclKind::Record(r) => r.name.clone(),
            DeclKind::ClassTemplate { name } => Some(name.clone()),
            DeclKind::Typedef(t) => Some(t.name.clone()),
            DeclKind::Other { name } => name.clone(),
        }
    }

    /// Namespace/record-qualified name, e.g. `ns::S::get`.
    pub fn qualified_name(&self, key: DeclKey) -> Option<String> {
        let leaf = self.decl_name(key)?;
        let mut segments = vec![leaf];
        let mut parent = self.decl(key).parent;
        while let Some(p) = parent {
            if let Some(name) = self.decl_name(p) {
                segments.push(name);
            }
            parent = self.decl(p).parent;
        }
        segments.reverse();
        Some(segments.join("::"))
    }

    fn method_parent_name(&self, f: &FunctionDecl) -> Option<&String> {
        let method = f.method.as_ref()?;
        match &self.decl(method.parent).kind {
            DeclKind::Record(r) => r.name.as_ref(),
            _ => None,
        }
    }
}

fn validate_indices(tu: &TranslationUnit) -> Result<()> {
    let n_decls = tu.decls.len();
    let n_files = tu.files.len();
    let n_comments = tu.comments.len();

    let check_decl = |key: DeclKey| -> Result<()> {
        ensure!(key.0 < n_decls, "decl key {} out of bounds ({n_decls} decls)", key.0);
        Ok(())
    };
    let check_loc = |loc: &Option<SourceLocation>| -> Result<()> {
        if let Some(l) = loc {
            ensure!(l.file.0 < n_files, "file id {} out of bounds ({n_files} files)", l.file.0);
        }
        Ok(())
    };
    let check_comment = |id: &Option<CommentId>| -> Result<()> {
        if let Some(c) = id {
            ensure!(c.0 < n_comments, "comment id {} out of bounds ({n_comments} comments)", c.0);
        }
        Ok(())
    };

    for key in &tu.top_level {
        check_decl(*key)?;
    }
    for file in &tu.files {
        check_loc(&file.included_from)?;
    }
    for decl in &tu.decls {
        if let Some(c) = decl.canonical {
            check_decl(c)?;
        }
        if let Some(p) = decl.parent {
            check_decl(p)?;
        }
        check_loc(&decl.loc)?;
        check_loc(&decl.range.begin)?;
        check_loc(&decl.range.end)?;
        check_comment(&decl.raw_comment)?;
        match &decl.kind {
            DeclKind::Namespace(ns) => {
                for k in &ns.decls {
                    check_decl(*k)?;
                }
            }
            DeclKind::FunctionTemplate { templated } => check_decl(*templated)?,
            DeclKind::Function(f) => {
                if let Some(m) = &f.method {
                    check_decl(m.parent)?;
                }
            }
            DeclKind::Record(r) => {
                if let Some(d) = r.definition {
                    check_decl(d)?;
                }
                for k in &r.decls {
                    check_decl(*k)?;
                }
                for field in &r.fields {
                    check_comment(&field.raw_comment)?;
                }
                if let Some(layout) = &r.layout {
                    ensure!(
                        layout.field_offsets.len() == r.fields.len(),
                        "layout has {} field offsets for {} fields",
                        layout.field_offsets.len(),
                        r.fields.len()
                    );
                }
            }
            DeclKind::ClassTemplate { .. } | DeclKind::Typedef(_) | DeclKind::Other { .. } => {}
        }
    }
    Ok(())
}

/// Everything the importer needs to know about the current run besides the
/// translation unit itself.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub current_target: Label,
    pub entry_headers: Vec<HeaderName>,
    header_targets: BTreeMap<HeaderName, Label>,
}

impl Invocation {
    pub fn new(
        current_target: Label,
        entry_headers: Vec<HeaderName>,
        header_targets: BTreeMap<HeaderName, Label>,
    ) -> Result<Self> {
        for header in &entry_headers {
            match header_targets.get(header) {
                Some(target) if *target == current_target => {}
                Some(target) => bail!(
                    "expected all public headers to belong to the current target \
                     '{}', but header '{}' belongs to '{}'",
                    current_target.0,
                    header.0,
                    target.0
                ),
                None => bail!(
                    "couldn't find header '{}' in the headers-to-target map",
                    header.0
                ),
            }
        }
        Ok(Invocation { current_target, entry_headers, header_targets })
    }

    pub fn header_target(&self, header: &HeaderName) -> Option<&Label> {
        self.header_targets.get(header)
    }
}
