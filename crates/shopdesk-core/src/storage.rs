use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::catalog::{CategoryDraft, CategoryListItem, NewProduct, Product};
use crate::models::{
    ChatId, CustomerActivity, CustomerListQuery, CustomerPage, DashboardSummary, OrderListQuery,
    OrderPage, OrderStatus, OrderWithOwner,
};
use crate::posts::{Audience, PostDraft, ScheduledPost};
use crate::reports::{FinanceReport, InventoryReport, ProfitReport};

/// Sole writer of the order status field.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Returns the number of rows changed, 0 when the order does not exist.
    async fn update_status(&self, order_id: i64, status: &OrderStatus) -> anyhow::Result<u64>;

    /// Compare-and-set: changes the row only while it still holds `expected`.
    async fn update_status_from(
        &self,
        order_id: i64,
        expected: &OrderStatus,
        status: &OrderStatus,
    ) -> anyhow::Result<u64>;

    async fn get_order_with_owner(&self, order_id: i64) -> anyhow::Result<Option<OrderWithOwner>>;
    async fn list_orders(&self, query: &OrderListQuery, per_page: u32) -> anyhow::Result<OrderPage>;
}

/// Catalog writes. Toggles return the new active flag, `None` when no row matched.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn add_product(&self, product: &NewProduct) -> anyhow::Result<i64>;
    async fn get_product(&self, product_id: i64) -> anyhow::Result<Option<Product>>;
    async fn toggle_product(&self, product_id: i64) -> anyhow::Result<Option<bool>>;
    async fn delete_product(&self, product_id: i64) -> anyhow::Result<u64>;
    async fn list_categories(&self) -> anyhow::Result<Vec<CategoryListItem>>;
    async fn add_category(&self, category: &CategoryDraft) -> anyhow::Result<i64>;
    async fn toggle_category(&self, category_id: i64) -> anyhow::Result<Option<bool>>;
    async fn edit_category(&self, category_id: i64, category: &CategoryDraft) -> anyhow::Result<u64>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    /// Newest first.
    async fn list_posts(&self) -> anyhow::Result<Vec<ScheduledPost>>;
    async fn get_post(&self, post_id: i64) -> anyhow::Result<Option<ScheduledPost>>;
    async fn create_post(&self, post: &PostDraft, now: DateTime<Utc>) -> anyhow::Result<i64>;
    async fn update_post(
        &self,
        post_id: i64,
        post: &PostDraft,
        now: DateTime<Utc>,
    ) -> anyhow::Result<u64>;
    async fn toggle_post(&self, post_id: i64) -> anyhow::Result<Option<bool>>;
    async fn delete_post(&self, post_id: i64) -> anyhow::Result<u64>;
}

#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn list_customers(
        &self,
        query: &CustomerListQuery,
        per_page: u32,
    ) -> anyhow::Result<CustomerPage>;

    /// Chat ids for a customer audience. `Audience::Channel` has no customer
    /// recipients and resolves to an empty list.
    async fn audience_chat_ids(
        &self,
        audience: Audience,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Vec<ChatId>>;
}

#[async_trait]
pub trait InsightStore: Send + Sync {
    async fn dashboard(&self, today: NaiveDate) -> anyhow::Result<DashboardSummary>;
    async fn customer_activity(&self) -> anyhow::Result<Vec<CustomerActivity>>;
    async fn finance_report(&self) -> anyhow::Result<FinanceReport>;
    async fn profit_report(&self) -> anyhow::Result<ProfitReport>;
    async fn inventory_report(&self) -> anyhow::Result<InventoryReport>;
}
