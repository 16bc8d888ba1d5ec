use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::OrderStatus;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusPolicy {
    /// Any status string, from any status.
    #[default]
    Permissive,
    /// Known statuses only, following the fulfillment graph.
    Strict,
}

impl StatusPolicy {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "permissive" => Some(Self::Permissive),
            "strict" => Some(Self::Strict),
            _ => None,
        }
    }

    pub fn check(self, from: &OrderStatus, to: &OrderStatus) -> Result<(), TransitionError> {
        if self == Self::Permissive {
            return Ok(());
        }

        if !to.is_known() {
            return Err(TransitionError::UnknownStatus(to.to_string()));
        }

        if from == to || is_successor(from, to) {
            return Ok(());
        }

        Err(TransitionError::Illegal {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("unknown order status `{0}`")]
    UnknownStatus(String),
    #[error("order cannot move from `{from}` to `{to}`")]
    Illegal { from: String, to: String },
}

fn is_successor(from: &OrderStatus, to: &OrderStatus) -> bool {
    matches!(
        (from, to),
        (OrderStatus::Pending, OrderStatus::Confirmed | OrderStatus::Cancelled)
            | (OrderStatus::Confirmed, OrderStatus::Shipped | OrderStatus::Cancelled)
            | (OrderStatus::Shipped, OrderStatus::Delivered)
    )
}
