//! What a dispatched operation reports back: the redirect target plus a flash message.

use crate::config::{ListDescriptor, Operation};
use crate::error::AppError;
use crate::item::Item;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Flash {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Flash {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }
}

/// Result of bulk delete. Partial failures are not errors: only the ids actually removed are listed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub success: bool,
    pub ids: Vec<String>,
    pub count: usize,
}

impl DeleteReport {
    pub fn new(ids: Vec<String>) -> Self {
        DeleteReport {
            success: true,
            count: ids.len(),
            ids,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Outcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<Item>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<DeleteReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<u64>,
    pub redirect: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flash: Option<Flash>,
}

/// `<prefix>/<list path>`
pub fn list_url(prefix: &str, list: &ListDescriptor) -> String {
    format!("{}/{}", prefix, list.path)
}

/// `<prefix>/<list path>/<id>`
pub fn item_url(prefix: &str, list: &ListDescriptor, id: &str) -> String {
    format!("{}/{}/{}", prefix, list.path, id)
}

impl Outcome {
    pub fn new(redirect: String) -> Self {
        Outcome {
            item: None,
            deleted: None,
            updated: None,
            redirect,
            flash: None,
        }
    }

    pub fn with_item(mut self, item: Item) -> Self {
        self.item = Some(item);
        self
    }

    pub fn with_flash(mut self, flash: Flash) -> Self {
        self.flash = Some(flash);
        self
    }

    /// Where the admin UI goes after `op` failed, with the message it shows.
    pub fn failure(prefix: &str, list: &ListDescriptor, op: Operation, err: &AppError) -> Self {
        let message = match (op, err) {
            (_, AppError::Csrf) => "There was a problem with your request, please try again.".to_string(),
            (_, AppError::Policy(msg)) | (_, AppError::Validation(msg)) => msg.clone(),
            (Operation::Create, e) => format!("Failed create new {} | {}", list.singular, e),
            (Operation::Read, e) => format!("Error, item not found {}", e),
            (Operation::Update, e) => format!("Failed update {} | {}", list.singular, e),
            (Operation::Delete, e) => format!("Error deleting the {}: {}", list.singular, e),
        };
        Outcome::new(list_url(prefix, list)).with_flash(Flash::error(message))
    }
}
