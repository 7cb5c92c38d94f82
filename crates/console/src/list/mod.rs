//! Resource list pages: query state, debounced search, fetch coordination.

mod controller;
mod debounce;
mod query;
mod range;

pub use controller::{ListController, ListResult, ListState};
pub use debounce::Debouncer;
pub use query::{ListQuery, ListRequest, SEARCH_KEY};
pub use range::ShowingRange;
