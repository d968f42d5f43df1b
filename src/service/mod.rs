//! CrudDispatcher: create/read/update/delete over the native store or REST endpoints.

mod crud;
pub mod form;
mod outcome;
mod validation;
pub use crud::{CrudDispatcher, RequestContext, Target, MAX_DELETES_IN_FLIGHT};
pub use outcome::{item_url, list_url, DeleteReport, Flash, FlashLevel, Outcome};
pub use validation::{FieldValidator, WriteMode};
