pub mod error;
pub mod model;
mod schema;
pub mod store;

pub use error::StoreError;
pub use model::{Fact, FactLink, FactStatus, Semantics, Source};
pub use store::Store;
