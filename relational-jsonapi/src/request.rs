//! Parsing of JSON:API query parameters.
//!
//! The parser is independent of any resource: it recognizes the parameters defined by JSON:API
//! (`sort`, `fields`, `include`, `page` and `filter`), and treats every other parameter as a
//! filter. Checking the parsed names against a [`ResourceDescriptor`](crate::resource::ResourceDescriptor)
//! is left to the caller.
//!
//! `sort` and `fields` come in a plain form, which applies to the primary resource, and a typed
//! form (`sort[post]=title`) which applies to the named resource. A request uses one form or the
//! other for each parameter, never both.

use derive_more::{Deref, From, Into};
use itertools::Itertools;
use snafu::{OptionExt, ResultExt, Snafu};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::num::ParseIntError;
use url::form_urlencoded;

#[derive(Clone, Debug, PartialEq, Eq, Snafu)]
pub enum ParseError {
    #[snafu(display("parameter {} is given both with and without a resource type", param))]
    MixedScopes { param: String },
    #[snafu(display("invalid value {} for {}: {}", value, key, source))]
    InvalidPage {
        key: String,
        value: String,
        source: ParseIntError,
    },
    #[snafu(display("unknown page parameter {}", key))]
    UnknownPageParameter { key: String },
    #[snafu(display("malformed parameter {}", key))]
    MalformedKey { key: String },
}

/// A parameter value which applies either to the primary resource or to named resources.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Scoped<T> {
    Global(Vec<T>),
    Typed(BTreeMap<String, Vec<T>>),
}

impl<T> Scoped<T> {
    /// The values which apply to `resource`.
    ///
    /// Global values apply to the primary resource only.
    pub fn for_resource(&self, resource: &str, primary: bool) -> Option<&[T]> {
        match self {
            Self::Global(values) if primary => Some(values),
            Self::Global(_) => None,
            Self::Typed(values) => values.get(resource).map(Vec::as_slice),
        }
    }

    fn extend(
        slot: &mut Option<Self>,
        param: &str,
        scope: Option<&str>,
        values: impl IntoIterator<Item = T>,
    ) -> Result<(), ParseError> {
        let scoped = slot.get_or_insert_with(|| match scope {
            None => Self::Global(vec![]),
            Some(_) => Self::Typed(BTreeMap::new()),
        });
        match (scoped, scope) {
            (Self::Global(existing), None) => existing.extend(values),
            (Self::Typed(existing), Some(scope)) => {
                existing.entry(scope.into()).or_default().extend(values)
            }
            _ => return MixedScopesSnafu { param }.fail(),
        }
        Ok(())
    }
}

/// A field to sort by.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SortField {
    pub field: String,
    pub descending: bool,
}

impl SortField {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }

    fn parse(s: &str) -> Option<Self> {
        let sort = match s.strip_prefix('-') {
            Some(field) => Self::desc(field),
            None => Self::asc(s),
        };
        (!sort.field.is_empty()).then_some(sort)
    }
}

impl Display for SortField {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if self.descending {
            write!(f, "-")?;
        }
        write!(f, "{}", self.field)
    }
}

/// A chain of relations to include, like `post.author`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deref, From, Into)]
pub struct IncludePath(Vec<String>);

impl IncludePath {
    /// Parse a dotted path. Every segment must be non-empty.
    fn parse(s: &str) -> Option<Self> {
        let path = s.split('.').map(str::trim).collect::<Vec<_>>();
        if path.iter().any(|segment| segment.is_empty()) {
            return None;
        }
        Some(Self(path.into_iter().map(String::from).collect()))
    }
}

impl Display for IncludePath {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.0.iter().join("."))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Page {
    pub number: Option<usize>,
    pub size: Option<usize>,
}

/// Parsed query parameters of a request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryParams {
    /// Filters by name, with every value given for each.
    pub filters: BTreeMap<String, Vec<String>>,
    pub sort: Option<Scoped<SortField>>,
    /// Sparse fieldsets.
    pub fields: Option<Scoped<String>>,
    pub include: Vec<IncludePath>,
    pub page: Page,
}

/// Parser for the query parameters of a `GET` request.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestParser;

impl RequestParser {
    /// Parse an encoded query string, with or without the leading `?`.
    pub fn parse_query(query: &str) -> Result<QueryParams, ParseError> {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self::parse(form_urlencoded::parse(query.as_bytes()))
    }

    /// Parse decoded parameters.
    ///
    /// A parameter may appear several times; for list-valued parameters the values of every
    /// occurrence are concatenated in order.
    pub fn parse<I, K, V>(pairs: I) -> Result<QueryParams, ParseError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params = QueryParams::default();
        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            let (param, scope) = split_key(key)?;
            match param {
                "sort" => {
                    let sort = list(value)
                        .map(SortField::parse)
                        .collect::<Option<Vec<_>>>()
                        .context(MalformedKeySnafu { key })?;
                    Scoped::extend(&mut params.sort, param, scope, sort)?
                }
                "fields" => Scoped::extend(
                    &mut params.fields,
                    param,
                    scope,
                    list(value).map(String::from),
                )?,
                "include" => {
                    if scope.is_some() {
                        return MalformedKeySnafu { key }.fail();
                    }
                    let paths = list(value)
                        .map(IncludePath::parse)
                        .collect::<Option<Vec<_>>>()
                        .context(MalformedKeySnafu { key })?;
                    params.include.extend(paths);
                }
                "page" => {
                    let slot = match scope {
                        None | Some("number") => &mut params.page.number,
                        Some("size") => &mut params.page.size,
                        Some(_) => return UnknownPageParameterSnafu { key }.fail(),
                    };
                    *slot = Some(value.parse().context(InvalidPageSnafu { key, value })?);
                }
                "filter" => {
                    let Some(field) = scope else {
                        return MalformedKeySnafu { key }.fail();
                    };
                    params
                        .filters
                        .entry(field.into())
                        .or_default()
                        .push(value.into());
                }
                _ => params
                    .filters
                    .entry(key.into())
                    .or_default()
                    .push(value.into()),
            }
        }
        tracing::debug!(?params, "parsed query parameters");
        Ok(params)
    }
}

/// Split `param[scope]` into its parts.
fn split_key(key: &str) -> Result<(&str, Option<&str>), ParseError> {
    let Some(open) = key.find('[') else {
        if key.contains(']') {
            return MalformedKeySnafu { key }.fail();
        }
        return Ok((key, None));
    };
    let (param, rest) = key.split_at(open);
    let scope = rest
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .filter(|scope| !scope.is_empty() && !scope.contains(['[', ']']));
    match scope {
        Some(scope) if !param.is_empty() => Ok((param, Some(scope))),
        _ => MalformedKeySnafu { key }.fail(),
    }
}

fn list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}
