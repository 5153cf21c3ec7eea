//! Result format of the external lifetime-inference engine.
//!
//! The engine annotates each pointer/reference level of a type with a
//! lifetime. A `TypeLifetimes` vector stores them inner-to-outer, so the
//! *outermost* lifetime sits at the back and is consumed first — the type
//! mapper pops one per pointer/reference level it unwraps.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::DeclKey;

/// A lifetime as the inference engine numbers it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Lifetime(pub u32);

pub type TypeLifetimes = Vec<Lifetime>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionLifetimes {
    #[serde(default)]
    pub this_lifetimes: TypeLifetimes,
    /// One entry per formal parameter, in declaration order.
    #[serde(default)]
    pub param_lifetimes: Vec<TypeLifetimes>,
    #[serde(default)]
    pub return_lifetimes: TypeLifetimes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifetimeSymbol {
    pub id: Lifetime,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct LifetimeSymbolTable {
    names: BTreeMap<Lifetime, String>,
}

impl LifetimeSymbolTable {
    pub fn from_symbols(symbols: &[LifetimeSymbol]) -> Self {
        let names =
            symbols.iter().map(|s| (s.id, s.name.clone())).collect::<BTreeMap<_, _>>();
        LifetimeSymbolTable { names }
    }

    pub fn lookup_lifetime(&self, lifetime: Lifetime) -> Option<&str> {
        self.names.get(&lifetime).map(String::as_str)
    }
}

/// Seam to the lifetime-inference engine. `function_lifetimes` returns `None`
/// when inference failed or was not run for the function; the importer then
/// emits the signature without lifetimes.
pub trait LifetimeOracle {
    fn function_lifetimes(&self, func: DeclKey) -> Option<&FunctionLifetimes>;
    fn symbol_table(&self) -> &LifetimeSymbolTable;
}

/// Default oracle: reads the annotations the frontend embedded in the dump.
pub struct AnnotationOracle<'tu> {
    ctx: &'tu super::AstContext,
    symbols: LifetimeSymbolTable,
}

impl<'tu> AnnotationOracle<'tu> {
    pub fn new(ctx: &'tu super::AstContext) -> Self {
        let symbols = LifetimeSymbolTable::from_symbols(ctx.lifetime_symbols());
        AnnotationOracle { ctx, symbols }
    }
}

impl LifetimeOracle for AnnotationOracle<'_> {
    fn function_lifetimes(&self, func: DeclKey) -> Option<&FunctionLifetimes> {
        match &self.ctx.decl(func).kind {
            super::DeclKind::Function(f) => f.lifetimes.as_ref(),
            _ => None,
        }
    }

    fn symbol_table(&self) -> &LifetimeSymbolTable {
        &self.symbols
    }
}
