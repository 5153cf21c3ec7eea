//! Name translation, doc-comment cleaning, and owning-target resolution.

use once_cell::sync::Lazy;
use regex_automata::meta::Regex;

use crate::ast::{AstContext, CommentId, DeclKey, DeclName, SourceLocation};
use crate::ir::{HeaderName, Identifier, Label, SourceLoc, UnqualifiedIdentifier};

use super::Importer;

// Lint-suppression directives carry no documentation value; based on the
// clang-tidy comment syntax.
static LINT_DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\s/]*(NOLINT|NOLINTNEXTLINE|NOLINTBEGIN|NOLINTEND)(\([^)\s]*\)?)?\s*$")
        .expect("lint-directive regex compiles")
});

fn should_keep_comment_line(line: &str) -> bool {
    !LINT_DIRECTIVE.is_match(line)
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first == '_' || first.is_ascii_alphabetic()) {
        return false;
    }
    for c in chars {
        if !(c == '_' || c.is_ascii_alphanumeric()) {
            return false;
        }
    }
    true
}

/// Valid C++ identifiers pass through unchanged; anything else (including
/// the empty string) is untranslatable.
pub(super) fn translate_identifier(name: &str) -> Option<Identifier> {
    if !is_ident(name) {
        return None;
    }
    Some(Identifier::new(name))
}

/// Parameters with no name get a synthesized, position-based one.
pub(super) fn translate_param_identifier(name: &str, index: usize) -> Identifier {
    match translate_identifier(name) {
        Some(identifier) => identifier,
        None => Identifier::new(format!("__param_{index}")),
    }
}

/// Constructors and destructors map to sentinels; operators, conversion
/// functions and the other special names are not supported.
pub(super) fn translate_name(name: &DeclName) -> Option<UnqualifiedIdentifier> {
    match name {
        DeclName::Identifier(n) => {
            translate_identifier(n).map(UnqualifiedIdentifier::Identifier)
        }
        DeclName::Constructor => Some(UnqualifiedIdentifier::Constructor),
        DeclName::Destructor => Some(UnqualifiedIdentifier::Destructor),
        DeclName::Special(_) => None,
    }
}

pub(super) fn convert_source_loc(ctx: &AstContext, loc: Option<SourceLocation>) -> SourceLoc {
    let Some(loc) = loc else {
        return SourceLoc::default();
    };
    let filename = ctx.file(loc.file).name.clone().unwrap_or_default();
    let filename = match filename.strip_prefix("./") {
        Some(stripped) => stripped.to_string(),
        None => filename,
    };
    SourceLoc { filename, line: loc.line, column: loc.column }
}

impl Importer<'_> {
    /// The build label owning a declaration's defining header. Headers not
    /// in the map are treated as textual: the include stack is walked up
    /// until a mapped header is found.
    pub(crate) fn owning_target(&self, key: DeclKey) -> Label {
        let mut loc = self.ctx.decl(key).loc;
        loop {
            let Some(l) = loc else {
                return super::BUILTIN_TARGET.into();
            };
            let file = self.ctx.file(l.file);
            if file.is_system_header {
                return super::RESOURCE_DIR_TARGET.into();
            }
            let Some(name) = &file.name else {
                return super::BUILTIN_TARGET.into();
            };
            let name = name.strip_prefix("./").unwrap_or(name);
            if let Some(target) = self.invocation.header_target(&HeaderName(name.to_string())) {
                return target.clone();
            }
            loc = file.included_from;
        }
    }

    pub(crate) fn is_from_current_target(&self, key: DeclKey) -> bool {
        self.owning_target(key) == self.invocation.current_target
    }

    pub(super) fn doc_comment(&self, key: DeclKey) -> Option<String> {
        self.clean_comment(self.ctx.decl(key).raw_comment)
    }

    /// Formatted comment text with lint-suppression lines removed; `None`
    /// when nothing is left.
    pub(super) fn clean_comment(&self, id: Option<CommentId>) -> Option<String> {
        let raw = self.ctx.comment(id?);
        let cleaned = raw
            .text
            .lines()
            .filter(|line| should_keep_comment_line(line))
            .collect::<Vec<_>>()
            .join("\n");
        if cleaned.is_empty() {
            None
        } else {
            Some(cleaned)
        }
    }
}
