//! ccimport-core: imports C++ declarations into a bindings IR.
//!
//! The pipeline has three stages. An external frontend (a clang-based dumper,
//! see [`ast::invoke`]) parses the public headers of one build target and
//! prints a JSON *semantics dump*. The [`importer`] walks the typed form of
//! that dump and produces the [`ir`] item sequence, recording a structured
//! "unsupported" diagnostic for every construct it cannot model instead of
//! aborting. The [`gen`] emitters then render the IR into a target-language
//! API source file and a C++ thunk source file.

pub mod ast;
pub mod gen;
pub mod importer;
pub mod ir;
