use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use shopdesk_core::{
    ACTIVE_WINDOW_DAYS, Audience, CatalogStore, Category, CategoryDraft, CategoryListItem,
    CategoryRevenue, ChatId, Customer, CustomerActivity, CustomerListItem, CustomerListQuery,
    CustomerPage, CustomerStore, DailyTotals, DashboardSummary, FinanceReport, InsightStore,
    InventoryReport, NewProduct, Order, OrderItem, OrderListItem, OrderListQuery, OrderPage,
    OrderStatus, OrderStore, OrderWithOwner, PostDraft, PostStore, Product, ProductSales,
    ProfitReport, ProfitRow, ScheduledPost, StockLevel, VIP_SPEND_THRESHOLD, page_offset,
    rank_by_profit, reports, total_pages,
};
use tokio::sync::RwLock;

const RECENT_ORDERS_LIMIT: usize = 10;

/// Store backed by process memory. Rows are keyed by id; no operation holds a
/// lock across calls.
#[derive(Default)]
pub struct InMemoryStore {
    orders: RwLock<BTreeMap<i64, Order>>,
    order_items: RwLock<Vec<OrderItem>>,
    customers: RwLock<BTreeMap<i64, Customer>>,
    products: RwLock<BTreeMap<i64, Product>>,
    categories: RwLock<BTreeMap<i64, Category>>,
    posts: RwLock<BTreeMap<i64, ScheduledPost>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_order(&self, order: Order) {
        self.orders.write().await.insert(order.id, order);
    }

    pub async fn insert_order_item(&self, item: OrderItem) {
        self.order_items.write().await.push(item);
    }

    pub async fn insert_customer(&self, customer: Customer) {
        self.customers.write().await.insert(customer.id, customer);
    }

    pub async fn insert_product(&self, product: Product) {
        self.products.write().await.insert(product.id, product);
    }

    pub async fn insert_category(&self, category: Category) {
        self.categories.write().await.insert(category.id, category);
    }

    pub async fn category(&self, id: i64) -> Option<Category> {
        self.categories.read().await.get(&id).cloned()
    }

    /// Orders joined with their owners, newest first. Orders without an
    /// owner row are left out, as in the SQL listing.
    async fn joined_orders(&self) -> Vec<OrderListItem> {
        let orders = self.orders.read().await;
        let customers = self.customers.read().await;

        let mut items: Vec<OrderListItem> = orders
            .values()
            .filter_map(|order| {
                let customer = customers.get(&order.user_id)?;
                Some(OrderListItem {
                    id: order.id,
                    total_amount: order.total_amount,
                    status: order.status.clone(),
                    created_at: order.created_at,
                    customer_name: Some(customer.name.clone()),
                    phone: customer.phone.clone(),
                    email: customer.email.clone(),
                    delivery_address: order.delivery_address.clone(),
                    payment_method: order.payment_method.clone(),
                })
            })
            .collect();

        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        items
    }

    /// Items belonging to non-cancelled orders.
    async fn billable_items(&self) -> Vec<OrderItem> {
        let orders = self.orders.read().await;
        self.order_items
            .read()
            .await
            .iter()
            .filter(|item| {
                orders
                    .get(&item.order_id)
                    .is_some_and(|order| order.status != OrderStatus::Cancelled)
            })
            .cloned()
            .collect()
    }
}

fn next_id<V>(rows: &BTreeMap<i64, V>) -> i64 {
    rows.keys().next_back().map_or(1, |last| last + 1)
}

fn paginate<T>(rows: Vec<T>, page: u32, per_page: u32) -> Vec<T> {
    let offset = usize::try_from(page_offset(page, per_page)).unwrap_or(usize::MAX);
    rows.into_iter()
        .skip(offset)
        .take(per_page as usize)
        .collect()
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn update_status(&self, order_id: i64, status: &OrderStatus) -> anyhow::Result<u64> {
        let mut orders = self.orders.write().await;
        match orders.get_mut(&order_id) {
            Some(order) => {
                order.status = status.clone();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn update_status_from(
        &self,
        order_id: i64,
        expected: &OrderStatus,
        status: &OrderStatus,
    ) -> anyhow::Result<u64> {
        let mut orders = self.orders.write().await;
        match orders.get_mut(&order_id) {
            Some(order) if &order.status == expected => {
                order.status = status.clone();
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn get_order_with_owner(&self, order_id: i64) -> anyhow::Result<Option<OrderWithOwner>> {
        let Some(order) = self.orders.read().await.get(&order_id).cloned() else {
            return Ok(None);
        };

        let customers = self.customers.read().await;
        let owner = customers.get(&order.user_id);

        Ok(Some(OrderWithOwner {
            recipient: owner.and_then(|customer| customer.telegram_id),
            customer_name: owner.map(|customer| customer.name.clone()),
            customer_language: owner.and_then(|customer| customer.language),
            order,
        }))
    }

    async fn list_orders(&self, query: &OrderListQuery, per_page: u32) -> anyhow::Result<OrderPage> {
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_lowercase);

        let matching: Vec<OrderListItem> = self
            .joined_orders()
            .await
            .into_iter()
            .filter(|item| query.status.as_ref().is_none_or(|status| &item.status == status))
            .filter(|item| {
                search.as_deref().is_none_or(|needle| {
                    item.customer_name
                        .as_deref()
                        .is_some_and(|name| name.to_lowercase().contains(needle))
                        || needle.parse::<i64>().is_ok_and(|id| id == item.id)
                })
            })
            .collect();

        let page = query.page.max(1);
        let total_orders = matching.len() as u64;

        Ok(OrderPage {
            items: paginate(matching, page, per_page),
            page,
            total_pages: total_pages(total_orders, per_page),
            total_orders,
        })
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn add_product(&self, product: &NewProduct) -> anyhow::Result<i64> {
        let mut products = self.products.write().await;
        let id = next_id(&products);
        products.insert(
            id,
            Product {
                id,
                name: product.name.clone(),
                description: product.description.clone(),
                price: product.price,
                cost_price: product.cost_price,
                category_id: Some(product.category_id),
                brand: product.brand.clone(),
                image_url: product.image_url.clone(),
                stock: product.stock,
                is_active: true,
                sales_count: 0,
            },
        );
        Ok(id)
    }

    async fn get_product(&self, product_id: i64) -> anyhow::Result<Option<Product>> {
        Ok(self.products.read().await.get(&product_id).cloned())
    }

    async fn toggle_product(&self, product_id: i64) -> anyhow::Result<Option<bool>> {
        let mut products = self.products.write().await;
        Ok(products.get_mut(&product_id).map(|product| {
            product.is_active = !product.is_active;
            product.is_active
        }))
    }

    async fn delete_product(&self, product_id: i64) -> anyhow::Result<u64> {
        let removed = self.products.write().await.remove(&product_id);
        Ok(u64::from(removed.is_some()))
    }

    async fn list_categories(&self) -> anyhow::Result<Vec<CategoryListItem>> {
        let products = self.products.read().await;
        let mut items: Vec<CategoryListItem> = self
            .categories
            .read()
            .await
            .values()
            .map(|category| CategoryListItem {
                active_products: products
                    .values()
                    .filter(|p| p.is_active && p.category_id == Some(category.id))
                    .count() as i64,
                category: category.clone(),
            })
            .collect();

        items.sort_by(|a, b| a.category.name.cmp(&b.category.name));
        Ok(items)
    }

    async fn add_category(&self, category: &CategoryDraft) -> anyhow::Result<i64> {
        let mut categories = self.categories.write().await;
        let id = next_id(&categories);
        categories.insert(
            id,
            Category {
                id,
                name: category.name.clone(),
                description: category.description.clone(),
                emoji: category.emoji.clone(),
                is_active: true,
            },
        );
        Ok(id)
    }

    async fn toggle_category(&self, category_id: i64) -> anyhow::Result<Option<bool>> {
        let mut categories = self.categories.write().await;
        Ok(categories.get_mut(&category_id).map(|category| {
            category.is_active = !category.is_active;
            category.is_active
        }))
    }

    async fn edit_category(&self, category_id: i64, draft: &CategoryDraft) -> anyhow::Result<u64> {
        let mut categories = self.categories.write().await;
        match categories.get_mut(&category_id) {
            Some(category) => {
                category.name = draft.name.clone();
                category.description = draft.description.clone();
                category.emoji = draft.emoji.clone();
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

#[async_trait]
impl PostStore for InMemoryStore {
    async fn list_posts(&self) -> anyhow::Result<Vec<ScheduledPost>> {
        let mut posts: Vec<ScheduledPost> = self.posts.read().await.values().cloned().collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(posts)
    }

    async fn get_post(&self, post_id: i64) -> anyhow::Result<Option<ScheduledPost>> {
        Ok(self.posts.read().await.get(&post_id).cloned())
    }

    async fn create_post(&self, post: &PostDraft, now: DateTime<Utc>) -> anyhow::Result<i64> {
        let mut posts = self.posts.write().await;
        let id = next_id(&posts);
        posts.insert(
            id,
            ScheduledPost {
                id,
                title: post.title.clone(),
                content: post.content.clone(),
                schedule: post.schedule,
                audience: post.audience,
                image_url: post.image_url.clone(),
                is_active: true,
                created_at: now,
                updated_at: None,
            },
        );
        Ok(id)
    }

    async fn update_post(
        &self,
        post_id: i64,
        draft: &PostDraft,
        now: DateTime<Utc>,
    ) -> anyhow::Result<u64> {
        let mut posts = self.posts.write().await;
        let Some(post) = posts.get_mut(&post_id) else {
            return Ok(0);
        };

        post.title = draft.title.clone();
        post.content = draft.content.clone();
        post.schedule = draft.schedule;
        post.audience = draft.audience;
        post.image_url = draft.image_url.clone();
        post.updated_at = Some(now);
        Ok(1)
    }

    async fn toggle_post(&self, post_id: i64) -> anyhow::Result<Option<bool>> {
        let mut posts = self.posts.write().await;
        Ok(posts.get_mut(&post_id).map(|post| {
            post.is_active = !post.is_active;
            post.is_active
        }))
    }

    async fn delete_post(&self, post_id: i64) -> anyhow::Result<u64> {
        let removed = self.posts.write().await.remove(&post_id);
        Ok(u64::from(removed.is_some()))
    }
}

#[async_trait]
impl CustomerStore for InMemoryStore {
    async fn list_customers(
        &self,
        query: &CustomerListQuery,
        per_page: u32,
    ) -> anyhow::Result<CustomerPage> {
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_lowercase);
        let contains = |field: Option<&str>, needle: &str| {
            field.is_some_and(|value| value.to_lowercase().contains(needle))
        };

        let activity: HashMap<i64, CustomerActivity> = self
            .customer_activity()
            .await?
            .into_iter()
            .map(|row| (row.customer_id, row))
            .collect();

        let mut matching: Vec<CustomerListItem> = self
            .customers
            .read()
            .await
            .values()
            .filter(|customer| !customer.is_admin)
            .filter(|customer| {
                search.as_deref().is_none_or(|needle| {
                    contains(Some(customer.name.as_str()), needle)
                        || contains(customer.phone.as_deref(), needle)
                        || contains(customer.email.as_deref(), needle)
                })
            })
            .map(|customer| {
                let row = activity.get(&customer.id);
                CustomerListItem {
                    id: customer.id,
                    name: customer.name.clone(),
                    phone: customer.phone.clone(),
                    email: customer.email.clone(),
                    orders: row.map_or(0, |row| row.orders),
                    spent: row.map_or(Decimal::ZERO, |row| row.spent),
                    last_order_at: row.and_then(|row| row.last_order_at),
                }
            })
            .collect();

        matching.sort_by(|a, b| b.spent.cmp(&a.spent).then(a.id.cmp(&b.id)));

        let page = query.page.max(1);
        let total_customers = matching.len() as u64;

        Ok(CustomerPage {
            items: paginate(matching, page, per_page),
            page,
            total_pages: total_pages(total_customers, per_page),
            total_customers,
        })
    }

    async fn audience_chat_ids(
        &self,
        audience: Audience,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Vec<ChatId>> {
        let orders = self.orders.read().await;
        let customers = self.customers.read().await;
        let active_since = now - Duration::days(ACTIVE_WINDOW_DAYS);

        let selected = customers
            .values()
            .filter(|customer| !customer.is_admin)
            .filter(|customer| {
                let mut owned = orders.values().filter(|order| order.user_id == customer.id);
                match audience {
                    Audience::All => true,
                    Audience::Active => owned.any(|order| order.created_at >= active_since),
                    Audience::Vip => {
                        owned.map(|order| order.total_amount).sum::<Decimal>()
                            >= Decimal::from(VIP_SPEND_THRESHOLD)
                    }
                    Audience::Channel => false,
                }
            })
            .filter_map(|customer| customer.telegram_id)
            .collect();

        Ok(selected)
    }
}

#[async_trait]
impl InsightStore for InMemoryStore {
    async fn dashboard(&self, today: NaiveDate) -> anyhow::Result<DashboardSummary> {
        let yesterday = today - Duration::days(1);
        let mut today_totals = DailyTotals::default();
        let mut yesterday_totals = DailyTotals::default();
        let mut total_orders = 0;
        let mut total_revenue = Decimal::ZERO;

        for order in self.orders.read().await.values() {
            let day = order.created_at.date_naive();
            if day == today {
                today_totals.orders += 1;
                today_totals.revenue += order.total_amount;
            } else if day == yesterday {
                yesterday_totals.orders += 1;
                yesterday_totals.revenue += order.total_amount;
            }

            if order.status != OrderStatus::Cancelled {
                total_orders += 1;
                total_revenue += order.total_amount;
            }
        }

        let total_customers = self
            .customers
            .read()
            .await
            .values()
            .filter(|customer| !customer.is_admin)
            .count() as i64;

        let mut recent_orders = self.joined_orders().await;
        recent_orders.truncate(RECENT_ORDERS_LIMIT);

        Ok(DashboardSummary {
            today: today_totals,
            yesterday: yesterday_totals,
            total_customers,
            total_orders,
            total_revenue,
            recent_orders,
        })
    }

    async fn customer_activity(&self) -> anyhow::Result<Vec<CustomerActivity>> {
        let orders = self.orders.read().await;
        let customers = self.customers.read().await;

        Ok(customers
            .values()
            .map(|customer| {
                let owned = orders.values().filter(|order| {
                    order.user_id == customer.id && order.status != OrderStatus::Cancelled
                });

                let mut activity = CustomerActivity {
                    customer_id: customer.id,
                    name: customer.name.clone(),
                    orders: 0,
                    spent: Decimal::ZERO,
                    last_order_at: None,
                };
                for order in owned {
                    activity.orders += 1;
                    activity.spent += order.total_amount;
                    activity.last_order_at = activity.last_order_at.max(Some(order.created_at));
                }
                activity
            })
            .collect())
    }

    async fn finance_report(&self) -> anyhow::Result<FinanceReport> {
        let (revenue, orders) = self
            .orders
            .read()
            .await
            .values()
            .filter(|order| order.status != OrderStatus::Cancelled)
            .fold((Decimal::ZERO, 0), |(revenue, count), order| {
                (revenue + order.total_amount, count + 1)
            });

        let items = self.billable_items().await;
        let products = self.products.read().await;
        let categories = self.categories.read().await;

        let mut cost = Decimal::ZERO;
        let mut by_category: BTreeMap<i64, Decimal> =
            categories.keys().map(|id| (*id, Decimal::ZERO)).collect();
        for item in &items {
            let Some(product) = products.get(&item.product_id) else {
                continue;
            };
            let quantity = Decimal::from(item.quantity);
            cost += quantity * product.cost_price;
            let Some(category_id) = product.category_id else {
                continue;
            };
            if let Some(total) = by_category.get_mut(&category_id) {
                *total += quantity * item.price;
            }
        }

        let mut top_categories: Vec<CategoryRevenue> = by_category
            .into_iter()
            .filter_map(|(id, revenue)| {
                categories.get(&id).map(|category| CategoryRevenue {
                    name: category.name.clone(),
                    revenue,
                })
            })
            .collect();
        top_categories.sort_by(|a, b| b.revenue.cmp(&a.revenue));
        top_categories.truncate(reports::TOP_CATEGORIES_LIMIT);

        Ok(FinanceReport::new(revenue, cost, orders, top_categories))
    }

    async fn profit_report(&self) -> anyhow::Result<ProfitReport> {
        let items = self.billable_items().await;
        let products = self.products.read().await;
        let categories = self.categories.read().await;

        let mut per_product: BTreeMap<i64, (Decimal, Decimal)> = products
            .keys()
            .map(|id| (*id, (Decimal::ZERO, Decimal::ZERO)))
            .collect();
        for item in &items {
            let Some(product) = products.get(&item.product_id) else {
                continue;
            };
            let quantity = Decimal::from(item.quantity);
            if let Some((revenue, cost)) = per_product.get_mut(&product.id) {
                *revenue += quantity * item.price;
                *cost += quantity * product.cost_price;
            }
        }

        let mut per_category: BTreeMap<i64, (Decimal, Decimal)> = categories
            .keys()
            .map(|id| (*id, (Decimal::ZERO, Decimal::ZERO)))
            .collect();
        for (product_id, (revenue, cost)) in &per_product {
            let Some(category_id) = products.get(product_id).and_then(|p| p.category_id) else {
                continue;
            };
            if let Some(total) = per_category.get_mut(&category_id) {
                total.0 += *revenue;
                total.1 += *cost;
            }
        }

        let product_rows = per_product
            .into_iter()
            .filter_map(|(id, (revenue, cost))| {
                let name = products.get(&id)?.name.clone();
                Some(ProfitRow::new(id, name, revenue, cost))
            })
            .collect();
        let category_rows = per_category
            .into_iter()
            .filter_map(|(id, (revenue, cost))| {
                let name = categories.get(&id)?.name.clone();
                Some(ProfitRow::new(id, name, revenue, cost))
            })
            .collect();

        Ok(ProfitReport {
            products: rank_by_profit(product_rows, reports::PRODUCT_PROFIT_LIMIT),
            categories: rank_by_profit(category_rows, reports::CATEGORY_PROFIT_LIMIT),
        })
    }

    async fn inventory_report(&self) -> anyhow::Result<InventoryReport> {
        let products = self.products.read().await;
        let active: Vec<&Product> = products.values().filter(|p| p.is_active).collect();

        let mut low_stock: Vec<StockLevel> = active
            .iter()
            .filter(|p| p.stock <= reports::LOW_STOCK_THRESHOLD)
            .map(|p| StockLevel {
                id: p.id,
                name: p.name.clone(),
                stock: p.stock,
            })
            .collect();
        low_stock.sort_by(|a, b| a.stock.cmp(&b.stock).then(a.id.cmp(&b.id)));
        low_stock.truncate(reports::LOW_STOCK_LIMIT);

        let mut best_sellers: Vec<ProductSales> = active
            .iter()
            .map(|p| ProductSales {
                id: p.id,
                name: p.name.clone(),
                sales: p.sales_count,
            })
            .collect();
        best_sellers.sort_by(|a, b| b.sales.cmp(&a.sales).then(a.id.cmp(&b.id)));
        best_sellers.truncate(reports::BEST_SELLERS_LIMIT);

        Ok(InventoryReport {
            product_count: active.len() as i64,
            total_stock: active.iter().map(|p| i64::from(p.stock)).sum(),
            stock_cost: active
                .iter()
                .map(|p| Decimal::from(p.stock) * p.cost_price)
                .sum(),
            low_stock,
            best_sellers,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveTime, TimeZone};
    use shopdesk_core::{Language, PostSchedule};

    use super::*;

    fn customer(id: i64, name: &str, telegram_id: Option<i64>) -> Customer {
        Customer {
            id,
            telegram_id: telegram_id.map(ChatId),
            name: name.to_string(),
            phone: None,
            email: None,
            language: Some(Language::En),
            is_admin: false,
        }
    }

    fn order(id: i64, user_id: i64, status: &str, day: u32) -> Order {
        Order {
            id,
            user_id,
            total_amount: Decimal::new(1250, 2),
            status: OrderStatus::parse(status),
            created_at: Utc.with_ymd_and_hms(2026, 5, day, 10, 0, 0).unwrap(),
            delivery_address: None,
            payment_method: Some("cash".to_string()),
        }
    }

    fn product(id: i64, category_id: i64, cost: i64, stock: i32, sales: i64) -> Product {
        Product {
            id,
            name: format!("product-{id}"),
            description: None,
            price: Decimal::from(cost * 2),
            cost_price: Decimal::from(cost),
            category_id: Some(category_id),
            brand: None,
            image_url: None,
            stock,
            is_active: true,
            sales_count: sales,
        }
    }

    fn category(id: i64, name: &str) -> Category {
        Category {
            id,
            name: name.to_string(),
            description: None,
            emoji: None,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn update_then_read_returns_status_verbatim() {
        let store = InMemoryStore::new();
        store.insert_customer(customer(1, "Dilnoza", Some(555))).await;
        store.insert_order(order(42, 1, "pending", 1)).await;

        let affected = store
            .update_status(42, &OrderStatus::parse("ready_for_pickup"))
            .await
            .unwrap();
        assert_eq!(affected, 1);

        let found = store.get_order_with_owner(42).await.unwrap().unwrap();
        assert_eq!(found.order.status.as_str(), "ready_for_pickup");
        assert_eq!(found.recipient, Some(ChatId(555)));
    }

    #[tokio::test]
    async fn conditional_update_requires_expected_status() {
        let store = InMemoryStore::new();
        store.insert_order(order(9, 1, "pending", 1)).await;

        let stale = store
            .update_status_from(9, &OrderStatus::Confirmed, &OrderStatus::Shipped)
            .await
            .unwrap();
        assert_eq!(stale, 0);

        let applied = store
            .update_status_from(9, &OrderStatus::Pending, &OrderStatus::Confirmed)
            .await
            .unwrap();
        assert_eq!(applied, 1);

        let found = store.get_order_with_owner(9).await.unwrap().unwrap();
        assert_eq!(found.order.status, OrderStatus::Confirmed);
    }

    #[tokio::test]
    async fn missing_order_reports_zero_rows() {
        let store = InMemoryStore::new();
        let affected = store
            .update_status(999, &OrderStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(affected, 0);
        assert!(store.get_order_with_owner(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn orphaned_order_has_no_owner() {
        let store = InMemoryStore::new();
        store.insert_order(order(7, 404, "pending", 1)).await;

        let found = store.get_order_with_owner(7).await.unwrap().unwrap();
        assert!(found.recipient.is_none());
        assert!(found.customer_name.is_none());
    }

    #[tokio::test]
    async fn listing_filters_and_paginates_newest_first() {
        let store = InMemoryStore::new();
        store.insert_customer(customer(1, "Aziz", None)).await;
        store.insert_customer(customer(2, "Bella", None)).await;
        for id in 1..=5 {
            store.insert_order(order(id, 1, "pending", id as u32)).await;
        }
        store.insert_order(order(6, 2, "shipped", 6)).await;

        let query = OrderListQuery {
            status: Some(OrderStatus::Pending),
            search: None,
            page: 2,
        };
        let page = store.list_orders(&query, 2).await.unwrap();
        assert_eq!(page.total_orders, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![3, 2]);

        let query = OrderListQuery {
            status: None,
            search: Some("bel".to_string()),
            page: 1,
        };
        let page = store.list_orders(&query, 20).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, 6);
    }

    #[tokio::test]
    async fn huge_page_number_yields_empty_page() {
        let store = InMemoryStore::new();
        store.insert_customer(customer(1, "Aziz", None)).await;
        store.insert_order(order(1, 1, "pending", 1)).await;

        let query = OrderListQuery {
            status: None,
            search: None,
            page: u32::MAX,
        };
        let page = store.list_orders(&query, 20).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total_orders, 1);
    }

    #[tokio::test]
    async fn catalog_writes_assign_ids_and_flip_flags() {
        let store = InMemoryStore::new();
        store.insert_product(product(3, 1, 2, 10, 0)).await;

        let id = store
            .add_product(&NewProduct {
                name: "Black tea".to_string(),
                description: None,
                price: Decimal::new(500, 2),
                cost_price: Decimal::new(250, 2),
                category_id: 1,
                brand: None,
                image_url: None,
                stock: 4,
            })
            .await
            .unwrap();
        assert_eq!(id, 4);
        assert!(store.get_product(4).await.unwrap().unwrap().is_active);

        assert_eq!(store.toggle_product(3).await.unwrap(), Some(false));
        assert_eq!(store.toggle_product(3).await.unwrap(), Some(true));
        assert_eq!(store.toggle_product(99).await.unwrap(), None);
        assert_eq!(store.delete_product(3).await.unwrap(), 1);
        assert_eq!(store.delete_product(3).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn category_edit_replaces_every_field() {
        let store = InMemoryStore::new();
        let id = store
            .add_category(&CategoryDraft {
                name: "Drinks".to_string(),
                description: None,
                emoji: None,
            })
            .await
            .unwrap();
        store.insert_product(product(1, id, 2, 3, 0)).await;

        let draft = CategoryDraft {
            name: "Hot drinks".to_string(),
            description: Some("tea and coffee".to_string()),
            emoji: Some("☕".to_string()),
        };
        assert_eq!(store.edit_category(id, &draft).await.unwrap(), 1);
        assert_eq!(store.edit_category(id + 1, &draft).await.unwrap(), 0);

        let listed = store.list_categories().await.unwrap();
        assert_eq!(listed[0].category.name, "Hot drinks");
        assert_eq!(listed[0].category.emoji.as_deref(), Some("☕"));
        assert_eq!(listed[0].active_products, 1);
    }

    #[tokio::test]
    async fn posts_are_created_edited_toggled_and_deleted() {
        let store = InMemoryStore::new();
        let created_at = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();
        let mut draft = PostDraft {
            title: "Morning tea".to_string(),
            content: "Fresh harvest".to_string(),
            schedule: PostSchedule {
                morning: NaiveTime::from_hms_opt(9, 0, 0),
                ..Default::default()
            },
            audience: Audience::All,
            image_url: None,
        };

        let id = store.create_post(&draft, created_at).await.unwrap();
        draft.audience = Audience::Vip;
        let edited_at = created_at + Duration::hours(1);
        assert_eq!(store.update_post(id, &draft, edited_at).await.unwrap(), 1);

        let post = store.get_post(id).await.unwrap().unwrap();
        assert_eq!(post.audience, Audience::Vip);
        assert_eq!(post.updated_at, Some(edited_at));
        assert!(post.is_active);

        assert_eq!(store.toggle_post(id).await.unwrap(), Some(false));
        assert_eq!(store.delete_post(id).await.unwrap(), 1);
        assert!(store.list_posts().await.unwrap().is_empty());
        assert_eq!(store.update_post(id, &draft, edited_at).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn audiences_select_by_recency_and_spend() {
        let store = InMemoryStore::new();
        let now = Utc.with_ymd_and_hms(2026, 5, 31, 12, 0, 0).unwrap();
        store.insert_customer(customer(1, "Recent", Some(101))).await;
        store.insert_customer(customer(2, "Big spender", Some(102))).await;
        store.insert_customer(customer(3, "No chat", None)).await;
        let mut admin = customer(4, "Admin", Some(104));
        admin.is_admin = true;
        store.insert_customer(admin).await;

        store.insert_order(order(1, 1, "delivered", 20)).await;
        let mut big = order(2, 2, "delivered", 1);
        big.created_at = now - Duration::days(90);
        big.total_amount = Decimal::from(600);
        store.insert_order(big).await;

        let all = store.audience_chat_ids(Audience::All, now).await.unwrap();
        assert_eq!(all, vec![ChatId(101), ChatId(102)]);
        let active = store.audience_chat_ids(Audience::Active, now).await.unwrap();
        assert_eq!(active, vec![ChatId(101)]);
        let vip = store.audience_chat_ids(Audience::Vip, now).await.unwrap();
        assert_eq!(vip, vec![ChatId(102)]);
        assert!(store.audience_chat_ids(Audience::Channel, now).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn customer_listing_sorts_by_spend_and_searches_contacts() {
        let store = InMemoryStore::new();
        let mut first = customer(1, "Aziz", None);
        first.phone = Some("+998901112233".to_string());
        store.insert_customer(first).await;
        store.insert_customer(customer(2, "Bella", None)).await;
        store.insert_order(order(1, 2, "delivered", 3)).await;
        store.insert_order(order(2, 1, "cancelled", 3)).await;

        let page = store
            .list_customers(&CustomerListQuery::default(), 20)
            .await
            .unwrap();
        assert_eq!(page.items.iter().map(|c| c.id).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(page.items[1].orders, 0);

        let query = CustomerListQuery {
            search: Some("11122".to_string()),
            page: 1,
        };
        let page = store.list_customers(&query, 20).await.unwrap();
        assert_eq!(page.total_customers, 1);
        assert_eq!(page.items[0].name, "Aziz");
    }

    #[tokio::test]
    async fn dashboard_excludes_cancelled_from_totals() {
        let store = InMemoryStore::new();
        store.insert_customer(customer(1, "Aziz", None)).await;
        store.insert_order(order(1, 1, "delivered", 10)).await;
        store.insert_order(order(2, 1, "cancelled", 10)).await;
        store.insert_order(order(3, 1, "pending", 9)).await;

        let today = NaiveDate::from_ymd_opt(2026, 5, 10).unwrap();
        let summary = store.dashboard(today).await.unwrap();
        assert_eq!(summary.today.orders, 2);
        assert_eq!(summary.yesterday.orders, 1);
        assert_eq!(summary.total_orders, 2);
        assert_eq!(summary.total_revenue, Decimal::new(2500, 2));
        assert_eq!(summary.total_customers, 1);

        let activity = store.customer_activity().await.unwrap();
        assert_eq!(activity[0].orders, 2);
    }

    #[tokio::test]
    async fn reports_ignore_cancelled_orders() {
        let store = InMemoryStore::new();
        store.insert_category(category(1, "Tea")).await;
        store.insert_category(category(2, "Cups")).await;
        store.insert_product(product(10, 1, 3, 2, 40)).await;
        store.insert_product(product(11, 2, 5, 30, 7)).await;
        store.insert_order(order(1, 1, "delivered", 2)).await;
        store.insert_order(order(2, 1, "cancelled", 2)).await;
        for (order_id, product_id, quantity, price) in [(1, 10, 2, 6), (2, 11, 9, 10)] {
            store
                .insert_order_item(OrderItem {
                    order_id,
                    product_id,
                    quantity,
                    price: Decimal::from(price),
                })
                .await;
        }

        let finance = store.finance_report().await.unwrap();
        assert_eq!(finance.orders, 1);
        assert_eq!(finance.revenue, Decimal::new(1250, 2));
        assert_eq!(finance.cost, Decimal::from(6));
        assert_eq!(finance.top_categories[0].name, "Tea");
        assert_eq!(finance.top_categories[0].revenue, Decimal::from(12));

        let profit = store.profit_report().await.unwrap();
        assert_eq!(profit.products[0].id, 10);
        assert_eq!(profit.products[0].profit, Decimal::from(6));
        assert_eq!(profit.categories[1].profit, Decimal::ZERO);

        let inventory = store.inventory_report().await.unwrap();
        assert_eq!(inventory.product_count, 2);
        assert_eq!(inventory.total_stock, 32);
        assert_eq!(inventory.stock_cost, Decimal::from(156));
        assert_eq!(inventory.low_stock.len(), 1);
        assert_eq!(inventory.low_stock[0].id, 10);
        assert_eq!(inventory.best_sellers[0].id, 10);
    }
}
