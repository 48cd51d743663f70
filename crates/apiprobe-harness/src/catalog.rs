//! ---
//! probe_section: "02-harness-core"
//! probe_subsection: "module"
//! probe_type: "source"
//! probe_scope: "code"
//! probe_description: "Static endpoint registry and positional path substitution."
//! probe_version: "v0.1.0"
//! probe_owner: "tbd"
//! ---
//! Symbolic endpoint identifiers mapped to URL templates.
//!
//! Templates carry `{name}` placeholders. Substitution is positional: each
//! supplied parameter replaces the first placeholder that is still
//! unresolved, so callers pass parameters in template order. Placeholder
//! names are documentation only.

use std::fmt;
use std::ops::Range;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};
use thiserror::Error;

/// Caller errors raised while resolving endpoint paths.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("endpoint {endpoint} takes {expected} path parameter(s) but {supplied} were supplied")]
    TooManyParameters {
        endpoint: &'static str,
        expected: usize,
        supplied: usize,
    },
    #[error("endpoint {endpoint} still has {remaining} unresolved placeholder(s)")]
    UnresolvedPlaceholders {
        endpoint: &'static str,
        remaining: usize,
    },
    #[error("unknown endpoint identifier: {0}")]
    UnknownEndpoint(String),
    #[error("endpoint identifier registered twice: {0}")]
    DuplicateEndpoint(&'static str),
}

/// Routes exposed by the store API under test.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Endpoint {
    // products
    CreateProduct,
    GetAllProducts,
    GetProductById,
    GetProductBySlug,
    UpdateProduct,
    DeleteProduct,
    GetProductsPaginated,
    GetRelatedById,
    GetRelatedBySlug,
    // categories
    GetAllCategories,
    GetCategoryById,
    GetCategoryBySlug,
    GetProductsByCategory,
    CreateCategory,
    UpdateCategory,
    DeleteCategory,
    // users
    GetAllUsers,
    GetUserById,
    CreateUser,
    UpdateUser,
    DeleteUser,
    IsUserAvailable,
    // auth
    Login,
    RefreshToken,
    Profile,
    // files
    UploadFile,
    GetFile,
}

impl Endpoint {
    /// Raw template as published by the API.
    pub const fn template(self) -> &'static str {
        match self {
            Endpoint::CreateProduct | Endpoint::GetAllProducts => "/products",
            Endpoint::GetProductById | Endpoint::UpdateProduct | Endpoint::DeleteProduct => {
                "/products/{id}"
            }
            Endpoint::GetProductBySlug => "/products/slug/{slug}",
            Endpoint::GetProductsPaginated => "/products?offset={offset}&limit={limit}",
            Endpoint::GetRelatedById => "/products/{id}/related",
            Endpoint::GetRelatedBySlug => "/products/slug/{slug}/related",
            Endpoint::GetAllCategories | Endpoint::CreateCategory => "/categories",
            Endpoint::GetCategoryById | Endpoint::UpdateCategory | Endpoint::DeleteCategory => {
                "/categories/{id}"
            }
            Endpoint::GetCategoryBySlug => "/categories/slug/{slug}",
            Endpoint::GetProductsByCategory => "/categories/{id}/products",
            Endpoint::GetAllUsers | Endpoint::CreateUser => "/users",
            Endpoint::GetUserById | Endpoint::UpdateUser | Endpoint::DeleteUser => "/users/{id}",
            Endpoint::IsUserAvailable => "/users/is-available",
            Endpoint::Login => "/auth/login",
            Endpoint::RefreshToken => "/auth/refresh-token",
            Endpoint::Profile => "/auth/profile",
            Endpoint::UploadFile => "/files/upload",
            Endpoint::GetFile => "/files/{id}",
        }
    }

    /// Symbolic identifier, e.g. `GET_PRODUCT_BY_ID`.
    pub fn id(self) -> &'static str {
        self.into()
    }

    /// Descriptor from the process-wide catalog.
    pub fn descriptor(self) -> &'static EndpointDescriptor {
        &STANDARD.ordered[self as usize]
    }

    /// Resolve with exactly as many parameters as placeholders.
    pub fn resolve(self, params: &[&str]) -> Result<ResolvedPath, CatalogError> {
        self.descriptor().resolve(params)
    }

    /// Substitute up to the number of placeholders, leaving the rest in place.
    pub fn substitute(self, params: &[&str]) -> Result<ResolvedPath, CatalogError> {
        self.descriptor().substitute(params)
    }

    /// Raw template with query pairs appended.
    pub fn with_query<I, S>(self, pairs: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        append_query(self.template().to_owned(), pairs)
    }
}

/// Symbolic name plus URL template for one route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    id: &'static str,
    template: &'static str,
    placeholders: Vec<Range<usize>>,
}

impl EndpointDescriptor {
    /// Register a template; placeholder positions are fixed from here on.
    pub fn new(id: &'static str, template: &'static str) -> Self {
        Self {
            id,
            template,
            placeholders: placeholder_spans(template),
        }
    }

    pub fn id(&self) -> &'static str {
        self.id
    }

    pub fn template(&self) -> &'static str {
        self.template
    }

    pub fn placeholder_count(&self) -> usize {
        self.placeholders.len()
    }

    /// Strict resolution: the parameter count must match the placeholder count.
    pub fn resolve(&self, params: &[&str]) -> Result<ResolvedPath, CatalogError> {
        let resolved = self.substitute(params)?;
        if !resolved.is_complete() {
            return Err(CatalogError::UnresolvedPlaceholders {
                endpoint: self.id,
                remaining: resolved.remaining,
            });
        }
        Ok(resolved)
    }

    /// Lenient resolution: with `k < N` parameters, `N - k` placeholders remain.
    pub fn substitute(&self, params: &[&str]) -> Result<ResolvedPath, CatalogError> {
        if params.len() > self.placeholders.len() {
            return Err(CatalogError::TooManyParameters {
                endpoint: self.id,
                expected: self.placeholders.len(),
                supplied: params.len(),
            });
        }

        let mut path = String::with_capacity(self.template.len());
        let mut cursor = 0;
        for (span, value) in self.placeholders.iter().zip(params) {
            path.push_str(&self.template[cursor..span.start]);
            path.push_str(value);
            cursor = span.end;
        }
        path.push_str(&self.template[cursor..]);

        Ok(ResolvedPath {
            endpoint: self.id,
            path,
            remaining: self.placeholders.len() - params.len(),
        })
    }
}

/// Template with placeholders substituted and an optional query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    endpoint: &'static str,
    path: String,
    remaining: usize,
}

impl ResolvedPath {
    pub fn endpoint(&self) -> &'static str {
        self.endpoint
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }

    pub fn into_string(self) -> String {
        self.path
    }

    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }

    pub fn remaining_placeholders(&self) -> usize {
        self.remaining
    }

    /// Append `key=value` pairs joined by `&`; zero pairs leave the path untouched.
    pub fn with_query<I, S>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.path = append_query(self.path, pairs);
        self
    }
}

impl fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl AsRef<str> for ResolvedPath {
    fn as_ref(&self) -> &str {
        &self.path
    }
}

/// Immutable table of endpoint descriptors.
#[derive(Debug, Clone)]
pub struct EndpointCatalog {
    descriptors: IndexMap<&'static str, EndpointDescriptor>,
}

struct StandardCatalog {
    catalog: EndpointCatalog,
    ordered: Vec<EndpointDescriptor>,
}

static STANDARD: Lazy<StandardCatalog> = Lazy::new(|| {
    let ordered: Vec<EndpointDescriptor> = Endpoint::iter()
        .map(|endpoint| EndpointDescriptor::new(endpoint.id(), endpoint.template()))
        .collect();
    let catalog = EndpointCatalog {
        descriptors: ordered
            .iter()
            .map(|descriptor| (descriptor.id, descriptor.clone()))
            .collect(),
    };
    StandardCatalog { catalog, ordered }
});

impl EndpointCatalog {
    /// The catalog of every [`Endpoint`], built once per process.
    pub fn standard() -> &'static EndpointCatalog {
        &STANDARD.catalog
    }

    /// Build a custom table; identifiers must be unique.
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = EndpointDescriptor>,
    ) -> Result<Self, CatalogError> {
        let mut table = IndexMap::new();
        for descriptor in descriptors {
            if table.contains_key(descriptor.id) {
                return Err(CatalogError::DuplicateEndpoint(descriptor.id));
            }
            table.insert(descriptor.id, descriptor);
        }
        Ok(Self { descriptors: table })
    }

    pub fn get(&self, id: &str) -> Result<&EndpointDescriptor, CatalogError> {
        self.descriptors
            .get(id)
            .ok_or_else(|| CatalogError::UnknownEndpoint(id.to_owned()))
    }

    pub fn resolve(&self, id: &str, params: &[&str]) -> Result<ResolvedPath, CatalogError> {
        self.get(id)?.resolve(params)
    }

    /// Resolve a parameterless endpoint and append query pairs.
    pub fn with_query<I, S>(&self, id: &str, pairs: I) -> Result<ResolvedPath, CatalogError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(self.get(id)?.resolve(&[])?.with_query(pairs))
    }

    pub fn iter(&self) -> impl Iterator<Item = &EndpointDescriptor> {
        self.descriptors.values()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

fn placeholder_spans(template: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut search_from = 0;
    while let Some(offset) = template[search_from..].find('{') {
        let start = search_from + offset;
        let Some(len) = template[start + 1..].find(['}', '{', '/']) else {
            break;
        };
        let end = start + 1 + len;
        if template[end..].starts_with('}') && len > 0 {
            spans.push(start..end + 1);
            search_from = end + 1;
        } else {
            search_from = end;
        }
    }
    spans
}

fn append_query<I, S>(mut path: String, pairs: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut pairs = pairs.into_iter().peekable();
    if pairs.peek().is_none() {
        return path;
    }
    if !path.contains('?') {
        path.push('?');
    } else if !path.ends_with(['?', '&']) {
        path.push('&');
    }
    for (index, pair) in pairs.enumerate() {
        if index > 0 {
            path.push('&');
        }
        path.push_str(pair.as_ref());
    }
    path
}
