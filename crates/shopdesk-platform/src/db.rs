use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use shopdesk_core::{
    ACTIVE_WINDOW_DAYS, Audience, CatalogStore, Category, CategoryDraft, CategoryListItem,
    CategoryRevenue, ChatId, CustomerActivity, CustomerListItem, CustomerListQuery, CustomerPage,
    CustomerStore, DailyTotals, DashboardSummary, FinanceReport, InsightStore, InventoryReport,
    Language, NewProduct, Order, OrderListItem, OrderListQuery, OrderPage, OrderStatus,
    OrderStore, OrderWithOwner, PostDraft, PostSchedule, PostStore, Product, ProductSales,
    ProfitReport, ProfitRow, ScheduledPost, StockLevel, VIP_SPEND_THRESHOLD, page_offset, reports,
    total_pages,
};
use sqlx::{PgPool, Row, postgres::PgPoolOptions, postgres::PgRow};
use tracing::info;

const RECENT_ORDERS_LIMIT: i64 = 10;
const ACQUIRE_TIMEOUT: StdDuration = StdDuration::from_secs(5);

/// Postgres-backed implementation of every store trait. Each write is a
/// single statement on the shared pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(database_url)
            .await
            .context("failed to connect to postgres")?;

        info!("postgres pool ready ({max_connections} connections)");
        Ok(Self { pool })
    }
}

fn optional_text(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Offset for a LIMIT/OFFSET query, clamped to Postgres' BIGINT range.
fn sql_offset(page: u32, per_page: u32) -> i64 {
    i64::try_from(page_offset(page, per_page)).unwrap_or(i64::MAX)
}

#[async_trait]
impl OrderStore for PgStore {
    async fn update_status(&self, order_id: i64, status: &OrderStatus) -> Result<u64> {
        let result = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(order_id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn update_status_from(
        &self,
        order_id: i64,
        expected: &OrderStatus,
        status: &OrderStatus,
    ) -> Result<u64> {
        let result = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1 AND status = $3")
            .bind(order_id)
            .bind(status.as_str())
            .bind(expected.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn get_order_with_owner(&self, order_id: i64) -> Result<Option<OrderWithOwner>> {
        let row = sqlx::query(
            r#"
            SELECT
                o.id,
                o.user_id,
                o.total_amount,
                o.status,
                o.created_at,
                o.delivery_address,
                o.payment_method,
                u.telegram_id,
                u.name AS customer_name,
                u.language
            FROM orders o
            LEFT JOIN users u ON u.id = o.user_id
            WHERE o.id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let order = Order {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            total_amount: row.try_get("total_amount")?,
            status: OrderStatus::from(row.try_get::<String, _>("status")?),
            created_at: row.try_get("created_at")?,
            delivery_address: row.try_get("delivery_address")?,
            payment_method: row.try_get("payment_method")?,
        };

        Ok(Some(OrderWithOwner {
            order,
            recipient: row.try_get::<Option<i64>, _>("telegram_id")?.map(ChatId),
            customer_name: row.try_get("customer_name")?,
            customer_language: row
                .try_get::<Option<String>, _>("language")?
                .as_deref()
                .and_then(Language::from_code),
        }))
    }

    async fn list_orders(&self, query: &OrderListQuery, per_page: u32) -> Result<OrderPage> {
        let status = query.status.as_ref().map(|status| status.as_str().to_string());
        let search = optional_text(query.search.as_deref());
        let page = query.page.max(1);

        let total_orders = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)::BIGINT
            FROM orders o
            JOIN users u ON o.user_id = u.id
            WHERE ($1::text IS NULL OR o.status = $1)
              AND ($2::text IS NULL OR u.name ILIKE '%' || $2 || '%' OR o.id::text = $2)
            "#,
        )
        .bind(&status)
        .bind(search)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(
            r#"
            SELECT
                o.id,
                o.total_amount,
                o.status,
                o.created_at,
                u.name AS customer_name,
                u.phone,
                u.email,
                o.delivery_address,
                o.payment_method
            FROM orders o
            JOIN users u ON o.user_id = u.id
            WHERE ($1::text IS NULL OR o.status = $1)
              AND ($2::text IS NULL OR u.name ILIKE '%' || $2 || '%' OR o.id::text = $2)
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(&status)
        .bind(search)
        .bind(i64::from(per_page))
        .bind(sql_offset(page, per_page))
        .fetch_all(&self.pool)
        .await?;

        let items = rows.iter().map(order_list_item).collect::<Result<Vec<_>>>()?;
        let total_orders = total_orders.max(0) as u64;

        Ok(OrderPage {
            items,
            page,
            total_pages: total_pages(total_orders, per_page),
            total_orders,
        })
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn add_product(&self, product: &NewProduct) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO products (
                name, description, price, cost_price, category_id, brand, image_url, stock,
                is_active, sales_count
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE, 0)
            RETURNING id
            "#,
        )
        .bind(product.name.trim())
        .bind(optional_text(product.description.as_deref()))
        .bind(product.price)
        .bind(product.cost_price)
        .bind(product.category_id)
        .bind(optional_text(product.brand.as_deref()))
        .bind(optional_text(product.image_url.as_deref()))
        .bind(product.stock)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn get_product(&self, product_id: i64) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, description, price, cost_price, category_id, brand, image_url,
                   stock, is_active, sales_count
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(Product {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: row.try_get("price")?,
            cost_price: row.try_get("cost_price")?,
            category_id: row.try_get("category_id")?,
            brand: row.try_get("brand")?,
            image_url: row.try_get("image_url")?,
            stock: row.try_get("stock")?,
            is_active: row.try_get("is_active")?,
            sales_count: row.try_get("sales_count")?,
        }))
    }

    async fn toggle_product(&self, product_id: i64) -> Result<Option<bool>> {
        let active = sqlx::query_scalar::<_, bool>(
            "UPDATE products SET is_active = NOT is_active WHERE id = $1 RETURNING is_active",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(active)
    }

    async fn delete_product(&self, product_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn list_categories(&self) -> Result<Vec<CategoryListItem>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.name, c.description, c.emoji, c.is_active,
                   COUNT(p.id)::BIGINT AS active_products
            FROM categories c
            LEFT JOIN products p ON p.category_id = c.id AND p.is_active = TRUE
            GROUP BY c.id, c.name, c.description, c.emoji, c.is_active
            ORDER BY c.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut categories = Vec::with_capacity(rows.len());
        for row in rows {
            categories.push(CategoryListItem {
                category: Category {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    description: row.try_get("description")?,
                    emoji: row.try_get("emoji")?,
                    is_active: row.try_get("is_active")?,
                },
                active_products: row.try_get("active_products")?,
            });
        }

        Ok(categories)
    }

    async fn add_category(&self, category: &CategoryDraft) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO categories (name, description, emoji, is_active)
            VALUES ($1, $2, $3, TRUE)
            RETURNING id
            "#,
        )
        .bind(category.name.trim())
        .bind(optional_text(category.description.as_deref()))
        .bind(optional_text(category.emoji.as_deref()))
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn toggle_category(&self, category_id: i64) -> Result<Option<bool>> {
        let active = sqlx::query_scalar::<_, bool>(
            "UPDATE categories SET is_active = NOT is_active WHERE id = $1 RETURNING is_active",
        )
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(active)
    }

    async fn edit_category(&self, category_id: i64, category: &CategoryDraft) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE categories SET name = $2, description = $3, emoji = $4 WHERE id = $1",
        )
        .bind(category_id)
        .bind(category.name.trim())
        .bind(optional_text(category.description.as_deref()))
        .bind(optional_text(category.emoji.as_deref()))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl PostStore for PgStore {
    async fn list_posts(&self) -> Result<Vec<ScheduledPost>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, content, time_morning, time_afternoon, time_evening,
                   target_audience, image_url, is_active, created_at, updated_at
            FROM scheduled_posts
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(scheduled_post).collect()
    }

    async fn get_post(&self, post_id: i64) -> Result<Option<ScheduledPost>> {
        let row = sqlx::query(
            r#"
            SELECT id, title, content, time_morning, time_afternoon, time_evening,
                   target_audience, image_url, is_active, created_at, updated_at
            FROM scheduled_posts
            WHERE id = $1
            "#,
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(scheduled_post).transpose()
    }

    async fn create_post(&self, post: &PostDraft, now: DateTime<Utc>) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO scheduled_posts (
                title, content, time_morning, time_afternoon, time_evening,
                target_audience, image_url, is_active, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE, $8)
            RETURNING id
            "#,
        )
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.schedule.morning)
        .bind(post.schedule.afternoon)
        .bind(post.schedule.evening)
        .bind(post.audience.as_str())
        .bind(optional_text(post.image_url.as_deref()))
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn update_post(&self, post_id: i64, post: &PostDraft, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE scheduled_posts
            SET title = $2, content = $3, time_morning = $4, time_afternoon = $5,
                time_evening = $6, target_audience = $7, image_url = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(post_id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.schedule.morning)
        .bind(post.schedule.afternoon)
        .bind(post.schedule.evening)
        .bind(post.audience.as_str())
        .bind(optional_text(post.image_url.as_deref()))
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn toggle_post(&self, post_id: i64) -> Result<Option<bool>> {
        let active = sqlx::query_scalar::<_, bool>(
            "UPDATE scheduled_posts SET is_active = NOT is_active WHERE id = $1 RETURNING is_active",
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(active)
    }

    async fn delete_post(&self, post_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM scheduled_posts WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl CustomerStore for PgStore {
    async fn list_customers(&self, query: &CustomerListQuery, per_page: u32) -> Result<CustomerPage> {
        let search = optional_text(query.search.as_deref());
        let page = query.page.max(1);

        let total_customers = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)::BIGINT
            FROM users u
            WHERE u.is_admin = FALSE
              AND ($1::text IS NULL
                   OR u.name ILIKE '%' || $1 || '%'
                   OR u.phone ILIKE '%' || $1 || '%'
                   OR u.email ILIKE '%' || $1 || '%')
            "#,
        )
        .bind(search)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(
            r#"
            SELECT
                u.id,
                u.name,
                u.phone,
                u.email,
                COUNT(o.id)::BIGINT AS orders,
                COALESCE(SUM(o.total_amount), 0) AS spent,
                MAX(o.created_at) AS last_order_at
            FROM users u
            LEFT JOIN orders o ON o.user_id = u.id AND o.status <> 'cancelled'
            WHERE u.is_admin = FALSE
              AND ($1::text IS NULL
                   OR u.name ILIKE '%' || $1 || '%'
                   OR u.phone ILIKE '%' || $1 || '%'
                   OR u.email ILIKE '%' || $1 || '%')
            GROUP BY u.id, u.name, u.phone, u.email
            ORDER BY spent DESC, u.id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(search)
        .bind(i64::from(per_page))
        .bind(sql_offset(page, per_page))
        .fetch_all(&self.pool)
        .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(CustomerListItem {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                phone: row.try_get("phone")?,
                email: row.try_get("email")?,
                orders: row.try_get("orders")?,
                spent: row.try_get("spent")?,
                last_order_at: row.try_get("last_order_at")?,
            });
        }
        let total_customers = total_customers.max(0) as u64;

        Ok(CustomerPage {
            items,
            page,
            total_pages: total_pages(total_customers, per_page),
            total_customers,
        })
    }

    async fn audience_chat_ids(&self, audience: Audience, now: DateTime<Utc>) -> Result<Vec<ChatId>> {
        let ids = match audience {
            Audience::All => {
                sqlx::query_scalar::<_, i64>(
                    r#"
                    SELECT telegram_id FROM users
                    WHERE is_admin = FALSE AND telegram_id IS NOT NULL
                    ORDER BY id
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
            Audience::Active => {
                sqlx::query_scalar::<_, i64>(
                    r#"
                    SELECT u.telegram_id FROM users u
                    WHERE u.is_admin = FALSE AND u.telegram_id IS NOT NULL
                      AND EXISTS (
                          SELECT 1 FROM orders o
                          WHERE o.user_id = u.id AND o.created_at >= $1
                      )
                    ORDER BY u.id
                    "#,
                )
                .bind(now - Duration::days(ACTIVE_WINDOW_DAYS))
                .fetch_all(&self.pool)
                .await?
            }
            Audience::Vip => {
                sqlx::query_scalar::<_, i64>(
                    r#"
                    SELECT u.telegram_id FROM users u
                    JOIN orders o ON o.user_id = u.id
                    WHERE u.is_admin = FALSE AND u.telegram_id IS NOT NULL
                    GROUP BY u.id, u.telegram_id
                    HAVING SUM(o.total_amount) >= $1
                    ORDER BY u.id
                    "#,
                )
                .bind(Decimal::from(VIP_SPEND_THRESHOLD))
                .fetch_all(&self.pool)
                .await?
            }
            Audience::Channel => Vec::new(),
        };

        Ok(ids.into_iter().map(ChatId).collect())
    }
}

#[async_trait]
impl InsightStore for PgStore {
    async fn dashboard(&self, today: NaiveDate) -> Result<DashboardSummary> {
        let yesterday = today - Duration::days(1);

        let totals = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE created_at::date = $1)::BIGINT AS orders_today,
                COALESCE(SUM(total_amount) FILTER (WHERE created_at::date = $1), 0) AS revenue_today,
                COUNT(*) FILTER (WHERE created_at::date = $2)::BIGINT AS orders_yesterday,
                COALESCE(SUM(total_amount) FILTER (WHERE created_at::date = $2), 0) AS revenue_yesterday,
                COUNT(*) FILTER (WHERE status <> 'cancelled')::BIGINT AS total_orders,
                COALESCE(SUM(total_amount) FILTER (WHERE status <> 'cancelled'), 0) AS total_revenue
            FROM orders
            "#,
        )
        .bind(today)
        .bind(yesterday)
        .fetch_one(&self.pool)
        .await?;

        let total_customers =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*)::BIGINT FROM users WHERE is_admin = FALSE")
                .fetch_one(&self.pool)
                .await?;

        let recent = sqlx::query(
            r#"
            SELECT
                o.id,
                o.total_amount,
                o.status,
                o.created_at,
                u.name AS customer_name,
                u.phone,
                u.email,
                o.delivery_address,
                o.payment_method
            FROM orders o
            JOIN users u ON o.user_id = u.id
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT $1
            "#,
        )
        .bind(RECENT_ORDERS_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(DashboardSummary {
            today: DailyTotals {
                orders: totals.try_get("orders_today")?,
                revenue: totals.try_get::<Decimal, _>("revenue_today")?,
            },
            yesterday: DailyTotals {
                orders: totals.try_get("orders_yesterday")?,
                revenue: totals.try_get::<Decimal, _>("revenue_yesterday")?,
            },
            total_customers,
            total_orders: totals.try_get("total_orders")?,
            total_revenue: totals.try_get("total_revenue")?,
            recent_orders: recent.iter().map(order_list_item).collect::<Result<Vec<_>>>()?,
        })
    }

    async fn customer_activity(&self) -> Result<Vec<CustomerActivity>> {
        let rows = sqlx::query(
            r#"
            SELECT
                u.id,
                u.name,
                COUNT(o.id)::BIGINT AS orders,
                COALESCE(SUM(o.total_amount), 0) AS spent,
                MAX(o.created_at) AS last_order_at
            FROM users u
            LEFT JOIN orders o ON o.user_id = u.id AND o.status <> 'cancelled'
            GROUP BY u.id, u.name
            ORDER BY u.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut activity = Vec::with_capacity(rows.len());
        for row in rows {
            activity.push(CustomerActivity {
                customer_id: row.try_get("id")?,
                name: row.try_get("name")?,
                orders: row.try_get("orders")?,
                spent: row.try_get("spent")?,
                last_order_at: row.try_get("last_order_at")?,
            });
        }

        Ok(activity)
    }

    async fn finance_report(&self) -> Result<FinanceReport> {
        let sales = sqlx::query(
            r#"
            SELECT COALESCE(SUM(total_amount), 0) AS revenue, COUNT(*)::BIGINT AS orders
            FROM orders
            WHERE status <> 'cancelled'
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let cost = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(oi.quantity * p.cost_price), 0)
            FROM order_items oi
            JOIN products p ON p.id = oi.product_id
            JOIN orders o ON o.id = oi.order_id
            WHERE o.status <> 'cancelled'
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(
            r#"
            SELECT c.name, COALESCE(SUM(oi.quantity * oi.price), 0) AS revenue
            FROM categories c
            LEFT JOIN products p ON p.category_id = c.id
            LEFT JOIN order_items oi ON oi.product_id = p.id
                AND EXISTS (
                    SELECT 1 FROM orders o WHERE o.id = oi.order_id AND o.status <> 'cancelled'
                )
            GROUP BY c.id, c.name
            ORDER BY revenue DESC
            LIMIT $1
            "#,
        )
        .bind(reports::TOP_CATEGORIES_LIMIT as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut top_categories = Vec::with_capacity(rows.len());
        for row in rows {
            top_categories.push(CategoryRevenue {
                name: row.try_get("name")?,
                revenue: row.try_get("revenue")?,
            });
        }

        Ok(FinanceReport::new(
            sales.try_get("revenue")?,
            cost,
            sales.try_get("orders")?,
            top_categories,
        ))
    }

    async fn profit_report(&self) -> Result<ProfitReport> {
        let products = sqlx::query(
            r#"
            SELECT p.id, p.name,
                   COALESCE(SUM(oi.quantity * oi.price), 0) AS revenue,
                   COALESCE(SUM(oi.quantity * p.cost_price), 0) AS cost,
                   COALESCE(SUM(oi.quantity * (oi.price - p.cost_price)), 0) AS profit
            FROM products p
            LEFT JOIN order_items oi ON oi.product_id = p.id
                AND EXISTS (
                    SELECT 1 FROM orders o WHERE o.id = oi.order_id AND o.status <> 'cancelled'
                )
            GROUP BY p.id, p.name
            ORDER BY profit DESC, p.id
            LIMIT $1
            "#,
        )
        .bind(reports::PRODUCT_PROFIT_LIMIT as i64)
        .fetch_all(&self.pool)
        .await?;

        let categories = sqlx::query(
            r#"
            SELECT c.id, c.name,
                   COALESCE(SUM(oi.quantity * oi.price), 0) AS revenue,
                   COALESCE(SUM(oi.quantity * p.cost_price), 0) AS cost,
                   COALESCE(SUM(oi.quantity * (oi.price - p.cost_price)), 0) AS profit
            FROM categories c
            LEFT JOIN products p ON p.category_id = c.id
            LEFT JOIN order_items oi ON oi.product_id = p.id
                AND EXISTS (
                    SELECT 1 FROM orders o WHERE o.id = oi.order_id AND o.status <> 'cancelled'
                )
            GROUP BY c.id, c.name
            ORDER BY profit DESC, c.id
            LIMIT $1
            "#,
        )
        .bind(reports::CATEGORY_PROFIT_LIMIT as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(ProfitReport {
            products: products.iter().map(profit_row).collect::<Result<Vec<_>>>()?,
            categories: categories.iter().map(profit_row).collect::<Result<Vec<_>>>()?,
        })
    }

    async fn inventory_report(&self) -> Result<InventoryReport> {
        let summary = sqlx::query(
            r#"
            SELECT COUNT(*)::BIGINT AS product_count,
                   COALESCE(SUM(stock), 0)::BIGINT AS total_stock,
                   COALESCE(SUM(stock * cost_price), 0) AS stock_cost
            FROM products
            WHERE is_active = TRUE
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let low_rows = sqlx::query(
            r#"
            SELECT id, name, stock FROM products
            WHERE is_active = TRUE AND stock <= $1
            ORDER BY stock ASC, id
            LIMIT $2
            "#,
        )
        .bind(reports::LOW_STOCK_THRESHOLD)
        .bind(reports::LOW_STOCK_LIMIT as i64)
        .fetch_all(&self.pool)
        .await?;

        let seller_rows = sqlx::query(
            r#"
            SELECT id, name, sales_count FROM products
            WHERE is_active = TRUE
            ORDER BY sales_count DESC, id
            LIMIT $1
            "#,
        )
        .bind(reports::BEST_SELLERS_LIMIT as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut low_stock = Vec::with_capacity(low_rows.len());
        for row in low_rows {
            low_stock.push(StockLevel {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                stock: row.try_get("stock")?,
            });
        }

        let mut best_sellers = Vec::with_capacity(seller_rows.len());
        for row in seller_rows {
            best_sellers.push(ProductSales {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                sales: row.try_get("sales_count")?,
            });
        }

        Ok(InventoryReport {
            product_count: summary.try_get("product_count")?,
            total_stock: summary.try_get("total_stock")?,
            stock_cost: summary.try_get("stock_cost")?,
            low_stock,
            best_sellers,
        })
    }
}

fn order_list_item(row: &PgRow) -> Result<OrderListItem> {
    Ok(OrderListItem {
        id: row.try_get("id")?,
        total_amount: row.try_get("total_amount")?,
        status: OrderStatus::from(row.try_get::<String, _>("status")?),
        created_at: row.try_get("created_at")?,
        customer_name: row.try_get("customer_name")?,
        phone: row.try_get("phone")?,
        email: row.try_get("email")?,
        delivery_address: row.try_get("delivery_address")?,
        payment_method: row.try_get("payment_method")?,
    })
}

fn profit_row(row: &PgRow) -> Result<ProfitRow> {
    Ok(ProfitRow::new(
        row.try_get("id")?,
        row.try_get("name")?,
        row.try_get("revenue")?,
        row.try_get("cost")?,
    ))
}

/// Rows with an audience value this build does not know are treated as
/// addressed to everyone.
fn scheduled_post(row: &PgRow) -> Result<ScheduledPost> {
    let audience: String = row.try_get("target_audience")?;
    Ok(ScheduledPost {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        schedule: PostSchedule {
            morning: row.try_get("time_morning")?,
            afternoon: row.try_get("time_afternoon")?,
            evening: row.try_get("time_evening")?,
        },
        audience: Audience::parse(&audience).unwrap_or(Audience::All),
        image_url: row.try_get("image_url")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
