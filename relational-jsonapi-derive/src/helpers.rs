//! Helper functions for implementing procedural macros.

use itertools::Itertools;
use proc_macro2::TokenStream;
use std::borrow::Borrow;
use syn::{
    parenthesized,
    parse::{Parse, Parser},
    Attribute, Error, Expr, Ident, Lit, Meta, Result,
};

/// Convenient parsing interface for helper attributes.
///
/// Attributes in scope take the form `#[scope(name)]` (flags) or `#[scope(name(arg))]` (argument
/// attributes). Several of them may share one attribute, as in `#[scope(a, b(arg))]`.
pub struct AttrParser(String);

impl AttrParser {
    /// Create a new parser for attributes in `scope`, the top-level identifier of attributes parsed
    /// by this parser.
    pub fn new(scope: impl Into<String>) -> Self {
        Self(scope.into())
    }

    /// Fail if any attribute in scope is not one of `known`.
    pub fn check<I>(&self, attrs: I, known: &[&str]) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Borrow<Attribute>,
    {
        for a in attrs {
            for (name, _) in self.parse_attr(a.borrow())? {
                if !known.iter().any(|known| name == known) {
                    return Err(Error::new(
                        name.span(),
                        format!(
                            "unknown {} attribute {}, expected one of: {}",
                            self.0,
                            name,
                            known.join(", ")
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Check if a list of attributes has a certain flag.
    pub fn has_flag<I>(&self, attrs: I, name: &str) -> Result<bool>
    where
        I: IntoIterator,
        I::Item: Borrow<Attribute>,
    {
        for a in attrs {
            for (attr_name, param) in self.parse_attr(a.borrow())? {
                if attr_name != name {
                    continue;
                }
                if param.is_some() {
                    return Err(Error::new(
                        attr_name.span(),
                        format!("{} does not take an argument", name),
                    ));
                }
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Check if a list of attributes has a certain attribute and return its argument.
    pub fn get_arg<T: Parse, I>(&self, attrs: I, name: &str) -> Result<Option<T>>
    where
        I: IntoIterator,
        I::Item: Borrow<Attribute>,
    {
        for a in attrs {
            for (attr_name, param) in self.parse_attr(a.borrow())? {
                if attr_name != name {
                    continue;
                }
                let Some(param) = param else {
                    return Err(Error::new(
                        attr_name.span(),
                        format!("{} requires an argument", name),
                    ));
                };
                return T::parse.parse2(param).map(Some).map_err(|err| {
                    Error::new(
                        err.span(),
                        format!(
                            "argument to {} must be a {}",
                            name,
                            std::any::type_name::<T>()
                        ),
                    )
                });
            }
        }
        Ok(None)
    }

    /// Parse an attribute in this scope, returning the names and parameters it contains.
    ///
    /// For example, parsing the attribute `#[scope(foo(bar), baz)]` results in
    /// `[("foo", Some("bar")), ("baz", None)]`. An attribute which is not in scope results in an
    /// empty list.
    pub fn parse_attr(&self, a: &Attribute) -> Result<Vec<(Ident, Option<TokenStream>)>> {
        let mut parsed = vec![];
        if a.path().is_ident(&self.0) {
            a.parse_nested_meta(|meta| {
                let name = meta.path.get_ident().ok_or_else(|| {
                    meta.error(format!("{} attribute must start with an identifier", self.0))
                })?;
                let content = if meta.input.peek(syn::token::Paren) {
                    let content;
                    parenthesized!(content in meta.input);
                    Some(content.parse()?)
                } else {
                    None
                };
                parsed.push((name.clone(), content));
                Ok(())
            })?;
        }
        Ok(parsed)
    }
}

/// Extract documentation from the attributes on an item.
///
/// The documentation is constructed by taking all the `#[doc = "..."]` attributes and concatenating
/// their arguments, separated by newlines.
pub fn parse_docs(attrs: &[Attribute]) -> String {
    attrs
        .iter()
        .filter_map(|attr| {
            let Meta::NameValue(nv) = &attr.meta else { return None; };
            if !nv.path.is_ident("doc") {
                return None;
            }
            let Expr::Lit(lit) = &nv.value else { return None; };
            let Lit::Str(s) = &lit.lit else { return None; };
            Some(s.value().trim().to_string())
        })
        .join("\n")
}
