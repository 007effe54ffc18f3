//! Hardware Component Catalog core
//!
//! Components (CPUs, cases, GPUs, ...) and sub-components (ports, slots,
//! onboard controllers, ...) each belong to exactly one concrete kind. The
//! kind decides which typed attributes an entity carries, which fields can be
//! filtered or sorted on, and which payload values clear a stored field.
//!
//! Key pieces:
//! - `taxonomy` - kind registry, per-kind field structs, patches and filters
//! - `mutation` - create/update validation with sentinel clear and change log
//! - `query` - filter, search, sort and paging over one family
//! - `projection` - public vs privileged views
//! - `service` - the operations, wired to storage, audit and event ports
//!
//! Storage is behind the traits in `ports`; `MemoryStore` implements them
//! in-process and catalog_postgres implements them with sqlx.

pub mod changes;
pub mod config;
pub mod context;
pub mod error;
pub mod model;
pub mod mutation;
pub mod ports;
pub mod projection;
pub mod query;
pub mod relations;
pub mod service;
pub mod sinks;
pub mod store_memory;
pub mod taxonomy;
pub mod variants;

pub use changes::{ChangeSummary, FieldChange};
pub use config::CatalogConfig;
pub use context::CallerContext;
pub use error::{CatalogError, Result};
pub use model::{
    Color, ColorCascade, Component, ComponentColor, ComponentCompatibility, ComponentPart,
    ComponentVariant, Header, Record, StoredEntity, SubComponent, SubComponentPart,
};
pub use mutation::{CreateRequest, NewEntity, UpdateRequest};
pub use projection::{ColorView, EntityView, VariantView};
pub use query::{BaseFilter, BaseSortKey, EntityQuery, Paging, QueryRequest, SortDirection, SortKey};
pub use relations::ColorPatch;
pub use service::CatalogService;
pub use store_memory::MemoryStore;
pub use taxonomy::{ComponentAttributes, ComponentKind, SubComponentAttributes, SubComponentKind};
pub use variants::{NewVariant, VariantPatch};
