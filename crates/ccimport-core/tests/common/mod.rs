//! Fixture builder for importer tests: constructs semantics dumps in memory
//! the way the frontend would emit them.
#![allow(dead_code)]

use std::collections::BTreeMap;

use ccimport_core::ast::lifetimes::AnnotationOracle;
use ccimport_core::ast::{
    AstContext, BuiltinKind, CommentId, Decl, DeclKey, DeclKind, FieldDecl, FileId, FunctionDecl,
    Invocation, QualType, RawComment, RecordDecl, RecordLayout, SourceFile, SourceLocation,
    SourceRange, SpecialMembers, TagKind, TranslationUnit, TypeNode,
};
use ccimport_core::importer::import_ir;
use ccimport_core::ir::{
    AccessSpecifier, HeaderName, Label, SpecialMemberDefinition, SpecialMemberFunc, IR,
};

pub const TARGET: &str = "//test:lib";
pub const HEADER: &str = "test/lib.h";

pub struct Fixture {
    pub tu: TranslationUnit,
    pub header_targets: BTreeMap<HeaderName, Label>,
}

#[allow(dead_code)]
impl Fixture {
    pub fn new() -> Self {
        let mut tu = TranslationUnit::default();
        tu.files.push(SourceFile {
            name: Some(HEADER.to_string()),
            included_from: None,
            is_system_header: false,
        });
        let mut header_targets = BTreeMap::new();
        header_targets.insert(HeaderName(HEADER.to_string()), Label(TARGET.to_string()));
        Fixture { tu, header_targets }
    }

    pub fn add_file(
        &mut self,
        name: &str,
        is_system_header: bool,
        included_from: Option<SourceLocation>,
    ) -> FileId {
        self.tu.files.push(SourceFile {
            name: Some(name.to_string()),
            included_from,
            is_system_header,
        });
        FileId(self.tu.files.len() - 1)
    }

    pub fn map_header(&mut self, header: &str, target: &str) {
        self.header_targets
            .insert(HeaderName(header.to_string()), Label(target.to_string()));
    }

    pub fn loc(&self, offset: u64) -> SourceLocation {
        self.loc_in(FileId(0), offset)
    }

    pub fn loc_in(&self, file: FileId, offset: u64) -> SourceLocation {
        SourceLocation { file, line: offset, column: 1, offset }
    }

    pub fn range(&self, begin: u64, end: u64) -> SourceRange {
        SourceRange { begin: Some(self.loc(begin)), end: Some(self.loc(end)) }
    }

    pub fn decl(&self, begin: u64, end: u64, kind: DeclKind) -> Decl {
        Decl {
            canonical: None,
            parent: None,
            loc: Some(self.loc(begin)),
            range: self.range(begin, end),
            raw_comment: None,
            kind,
        }
    }

    /// Adds a declaration without putting it in any context.
    pub fn add_decl(&mut self, decl: Decl) -> DeclKey {
        self.tu.decls.push(decl);
        DeclKey(self.tu.decls.len() - 1)
    }

    /// Adds a top-level declaration.
    pub fn add_top(&mut self, decl: Decl) -> DeclKey {
        let key = self.add_decl(decl);
        self.tu.top_level.push(key);
        key
    }

    /// Adds a top-level record, defaulting `definition` to the new key.
    pub fn add_record(&mut self, begin: u64, end: u64, mut record: RecordDecl) -> DeclKey {
        let key = DeclKey(self.tu.decls.len());
        if record.definition.is_none() {
            record.definition = Some(key);
        }
        self.add_top(self.decl(begin, end, DeclKind::Record(record)))
    }

    /// Adds a declaration nested inside a record's context.
    pub fn add_member(&mut self, record: DeclKey, mut decl: Decl) -> DeclKey {
        decl.parent = Some(record);
        let key = self.add_decl(decl);
        let DeclKind::Record(r) = &mut self.tu.decls[record.0].kind else {
            panic!("add_member on a non-record decl");
        };
        r.decls.push(key);
        key
    }

    pub fn add_comment(&mut self, begin: u64, end: u64, text: &str) -> CommentId {
        self.tu.comments.push(RawComment {
            begin: self.loc(begin),
            end: self.loc(end),
            text: text.to_string(),
        });
        CommentId(self.tu.comments.len() - 1)
    }

    pub fn import(self) -> IR {
        let ctx = AstContext::new(self.tu).expect("fixture dump validates");
        let invocation = Invocation::new(
            Label(TARGET.to_string()),
            vec![HeaderName(HEADER.to_string())],
            self.header_targets,
        )
        .expect("fixture invocation validates");
        let oracle = AnnotationOracle::new(&ctx);
        import_ir(&ctx, &invocation, &oracle)
    }
}

pub fn builtin(spelling: &str, kind: BuiltinKind) -> QualType {
    QualType {
        is_const: false,
        is_volatile: false,
        spelling: spelling.to_string(),
        node: TypeNode::Builtin(kind),
    }
}

pub fn int_ty() -> QualType {
    builtin("int", BuiltinKind::SignedInt { width: 32 })
}

#[allow(dead_code)]
pub fn double_ty() -> QualType {
    builtin("double", BuiltinKind::Double)
}

#[allow(dead_code)]
pub fn void_ty() -> QualType {
    builtin("void", BuiltinKind::Void)
}

#[allow(dead_code)]
pub fn const_(mut ty: QualType) -> QualType {
    ty.is_const = true;
    ty
}

pub fn ptr_to(pointee: QualType) -> QualType {
    QualType {
        is_const: false,
        is_volatile: false,
        spelling: format!("{} *", pointee.spelling),
        node: TypeNode::Pointer { pointee: Box::new(pointee) },
    }
}

#[allow(dead_code)]
pub fn lvalue_ref_to(pointee: QualType) -> QualType {
    QualType {
        is_const: false,
        is_volatile: false,
        spelling: format!("{} &", pointee.spelling),
        node: TypeNode::LValueReference { pointee: Box::new(pointee) },
    }
}

#[allow(dead_code)]
pub fn tag_ty(spelling: &str, decl: DeclKey) -> QualType {
    QualType {
        is_const: false,
        is_volatile: false,
        spelling: spelling.to_string(),
        node: TypeNode::Tag { decl },
    }
}

#[allow(dead_code)]
pub fn typedef_ty(spelling: &str, decl: DeclKey) -> QualType {
    QualType {
        is_const: false,
        is_volatile: false,
        spelling: spelling.to_string(),
        node: TypeNode::Typedef { decl },
    }
}

pub fn function(name: &str, mangled: &str, return_type: QualType) -> FunctionDecl {
    FunctionDecl {
        name: ccimport_core::ast::DeclName::Identifier(name.to_string()),
        mangled_name: mangled.to_string(),
        complete_object_mangled_name: None,
        return_type,
        params: vec![],
        is_deleted: false,
        is_templated: false,
        is_inline: false,
        method: None,
        lifetimes: None,
    }
}

pub fn param(name: &str, type_: QualType) -> ccimport_core::ast::ParamDecl {
    ccimport_core::ast::ParamDecl { name: name.to_string(), type_ }
}

pub fn trivial_special_members() -> SpecialMembers {
    let trivial = SpecialMemberFunc {
        definition: SpecialMemberDefinition::Trivial,
        access: AccessSpecifier::Public,
    };
    SpecialMembers {
        copy_constructor: trivial,
        move_constructor: trivial,
        destructor: trivial,
    }
}

pub fn record(name: &str) -> RecordDecl {
    RecordDecl {
        name: Some(name.to_string()),
        tag_kind: TagKind::Struct,
        is_injected_class_name: false,
        is_invalid: false,
        is_complete_definition: true,
        definition: None,
        is_template: false,
        is_effectively_final: false,
        can_pass_in_registers: true,
        fields: vec![],
        layout: Some(RecordLayout { size: 1, alignment: 1, field_offsets: vec![] }),
        special_members: Some(trivial_special_members()),
        decls: vec![],
    }
}

pub fn field(name: &str, type_: QualType) -> FieldDecl {
    FieldDecl { name: name.to_string(), type_, access: None, raw_comment: None }
}
