//! ---
//! probe_section: "03-resource-clients"
//! probe_subsection: "module"
//! probe_type: "source"
//! probe_scope: "code"
//! probe_description: "Typed clients and data models for the store API under test."
//! probe_version: "v0.1.0"
//! probe_owner: "tbd"
//! ---
//! Resource clients over the harness.
//!
//! Every call returns the [`ObservedResponse`](apiprobe_harness::ObservedResponse)
//! as received; callers pick the expectation they want to check it against.

pub mod auth;
pub mod categories;
pub mod models;
pub mod products;
mod transport;
pub mod users;

pub use auth::AuthClient;
pub use categories::CategoriesClient;
pub use models::{
    Category, CreateCategoryRequest, CreateProductRequest, CreateUserRequest, LoginRequest,
    Product, UpdateCategoryRequest, UpdateProductRequest, UpdateUserRequest, User,
};
pub use products::ProductsClient;
pub use users::UsersClient;
