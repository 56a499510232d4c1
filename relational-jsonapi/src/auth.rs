//! Authentication and row-level authorization.
//!
//! Authentication is left to the application, which plugs into the request handling layer by
//! implementing [`Authenticator`]. Authorization is derived from the relationship graph: a row of
//! an authenticated resource is visible to a principal if at least one of the entity's auth paths
//! leads from the row to the principal. [`AuthFilter`] is that predicate, in a form the persistence
//! layer can translate into a query (a disjunction of joins) or evaluate directly with
//! [`AuthFilter::allows`].

/// Identify the principal making a request.
pub trait Authenticator<R: ?Sized> {
    /// The identity of an authenticated principal, usually its primary key.
    type Principal;

    /// The principal making `request`, or [`None`] if this authenticator cannot identify one.
    fn authenticate(&self, request: &R) -> Option<Self::Principal>;
}

/// An [`Authenticator`] backed by a closure.
#[derive(Clone, Copy, Debug)]
pub struct FnAuthenticator<F>(pub F);

impl<R: ?Sized, P, F: Fn(&R) -> Option<P>> Authenticator<R> for FnAuthenticator<F> {
    type Principal = P;

    fn authenticate(&self, request: &R) -> Option<P> {
        (self.0)(request)
    }
}

/// Try each authenticator in turn, returning the first principal found.
pub fn authenticate_any<R: ?Sized, P>(
    authenticators: &[&dyn Authenticator<R, Principal = P>],
    request: &R,
) -> Option<P> {
    authenticators
        .iter()
        .find_map(|authenticator| authenticator.authenticate(request))
}

/// The rows of a resource a principal may see.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AuthFilter<T> {
    /// Every row. The resource does not require authentication.
    All,
    /// No rows, because there is no principal or no way of relating a row to one.
    Nothing,
    /// The row whose identity is the principal.
    Identity(T),
    /// Rows from which following the relation fields in `path` leads to `principal`.
    Path { path: Vec<String>, principal: T },
    /// Rows which satisfy any of the sub-filters.
    Any(Vec<AuthFilter<T>>),
}

impl<T> AuthFilter<T> {
    /// A filter which holds on any row where any of the sub-filters hold.
    pub fn any<I>(filters: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let mut filters = filters.into_iter().collect::<Vec<_>>();
        match filters.len() {
            0 => Self::Nothing,
            1 => filters.remove(0),
            _ => Self::Any(filters),
        }
    }
}

impl<T: Clone> AuthFilter<T> {
    /// The filter for an entity with the given auth paths.
    ///
    /// Each path is a list of relation fields joined by `separator`. The empty path identifies the
    /// principal itself.
    pub fn for_paths(paths: &[String], separator: &str, principal: T) -> Self {
        Self::any(paths.iter().map(|path| {
            if path.is_empty() {
                Self::Identity(principal.clone())
            } else {
                Self::Path {
                    path: path.split(separator).map(String::from).collect(),
                    principal: principal.clone(),
                }
            }
        }))
    }
}

impl<T: PartialEq> AuthFilter<T> {
    /// Evaluate the filter on the row with identity `row`.
    ///
    /// `follow` resolves a relation path starting at `row` to the identities of the rows at the end
    /// of it.
    pub fn allows<F>(&self, row: &T, follow: &F) -> bool
    where
        F: Fn(&[String]) -> Vec<T>,
    {
        match self {
            Self::All => true,
            Self::Nothing => false,
            Self::Identity(principal) => row == principal,
            Self::Path { path, principal } => follow(path).contains(principal),
            Self::Any(filters) => filters.iter().any(|filter| filter.allows(row, follow)),
        }
    }
}
