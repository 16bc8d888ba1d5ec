use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order fulfillment stage. Values outside the known set are kept verbatim in
/// `Other` so that nothing stored is ever coerced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
    Other(String),
}

impl OrderStatus {
    pub fn parse(value: &str) -> Self {
        match value {
            "pending" => Self::Pending,
            "confirmed" => Self::Confirmed,
            "shipped" => Self::Shipped,
            "delivered" => Self::Delivered,
            "cancelled" => Self::Cancelled,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Other(value) => value,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<OrderStatus> for String {
    fn from(value: OrderStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Telegram chat id of a customer or admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Ru,
    Uz,
    En,
}

impl Language {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "ru" => Some(Self::Ru),
            "uz" => Some(Self::Uz),
            "en" => Some(Self::En),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Ru => "ru",
            Self::Uz => "uz",
            Self::En => "en",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub delivery_address: Option<String>,
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub telegram_id: Option<ChatId>,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub language: Option<Language>,
    pub is_admin: bool,
}

/// An order joined with whatever could be resolved about its owner. All owner
/// fields are empty when the customer row is missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWithOwner {
    pub order: Order,
    pub recipient: Option<ChatId>,
    pub customer_name: Option<String>,
    pub customer_language: Option<Language>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusTransitionEvent {
    pub order_id: i64,
    pub previous_status: Option<OrderStatus>,
    pub new_status: OrderStatus,
    pub recipient: Option<ChatId>,
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub search: Option<String>,
    pub page: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderListItem {
    pub id: i64,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub customer_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub delivery_address: Option<String>,
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPage {
    pub items: Vec<OrderListItem>,
    pub page: u32,
    pub total_pages: u32,
    pub total_orders: u64,
}

pub fn total_pages(total: u64, per_page: u32) -> u32 {
    if per_page == 0 {
        return 0;
    }
    total.div_ceil(u64::from(per_page)) as u32
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailyTotals {
    pub orders: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub today: DailyTotals,
    pub yesterday: DailyTotals,
    pub total_customers: i64,
    pub total_orders: i64,
    pub total_revenue: Decimal,
    pub recent_orders: Vec<OrderListItem>,
}

/// One order line; `price` is the unit price at the time of sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub price: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerListQuery {
    pub search: Option<String>,
    pub page: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerListItem {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub orders: i64,
    pub spent: Decimal,
    pub last_order_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerPage {
    pub items: Vec<CustomerListItem>,
    pub page: u32,
    pub total_pages: u32,
    pub total_customers: u64,
}

/// Row offset of a 1-based page, saturating instead of overflowing.
pub fn page_offset(page: u32, per_page: u32) -> u64 {
    u64::from(page.max(1) - 1).saturating_mul(u64::from(per_page))
}

/// Per-customer purchase history over non-cancelled orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerActivity {
    pub customer_id: i64,
    pub name: String,
    pub orders: i64,
    pub spent: Decimal,
    pub last_order_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_is_kept_verbatim() {
        let status = OrderStatus::parse("awaiting_pickup");
        assert_eq!(status, OrderStatus::Other("awaiting_pickup".to_string()));
        assert_eq!(status.as_str(), "awaiting_pickup");
        assert!(!status.is_known());
    }

    #[test]
    fn status_serializes_as_plain_string() {
        let json = serde_json::to_string(&OrderStatus::Shipped).unwrap();
        assert_eq!(json, "\"shipped\"");

        let parsed: OrderStatus = serde_json::from_str("\"on_hold\"").unwrap();
        assert_eq!(parsed.as_str(), "on_hold");
    }

    #[test]
    fn language_codes_are_case_insensitive() {
        assert_eq!(Language::from_code(" UZ "), Some(Language::Uz));
        assert_eq!(Language::from_code("de"), None);
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(total_pages(0, 20), 0);
        assert_eq!(total_pages(20, 20), 1);
        assert_eq!(total_pages(41, 20), 3);
    }

    #[test]
    fn page_offset_does_not_overflow() {
        assert_eq!(page_offset(0, 20), 0);
        assert_eq!(page_offset(3, 20), 40);
        assert_eq!(
            page_offset(u32::MAX, u32::MAX),
            u64::from(u32::MAX - 1) * u64::from(u32::MAX)
        );
    }
}
