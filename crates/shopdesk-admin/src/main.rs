mod marketing;
mod session;
#[cfg(test)]
mod test_support;

use std::{str::FromStr, sync::Arc};

use anyhow::Result as AnyResult;
use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderName, StatusCode, header},
    middleware,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shopdesk_core::{
    BotGateway, CatalogStore, CategoryDraft, CategoryListItem, ChatId, CustomerSegments,
    CustomerStore, DashboardSummary, FinanceReport, InsightStore, InventoryReport, NewProduct,
    OrderListQuery, OrderPage, OrderStatus, OrderStore, OrderWithOwner, PostStore, ProfitReport,
    StatusPolicy, TransitionError, segment_customers,
};
use shopdesk_notify::{Broadcaster, CatalogReloader, StatusNotifier, category_added_text};
use shopdesk_platform::{AdminConfig, BotConfig, PgStore, RedisBus, ServiceConfig, TelegramGateway};
use tracing::{error, info, warn};

use crate::session::{
    SessionStore, expired_session_cookie, require_session, session_cookie, session_token,
};

const ORDERS_PER_PAGE: u32 = 20;

pub(crate) type HandlerError = (StatusCode, String);

#[derive(Clone)]
pub(crate) struct AppState {
    orders: Arc<dyn OrderStore>,
    catalog: Arc<dyn CatalogStore>,
    posts: Arc<dyn PostStore>,
    customers: Arc<dyn CustomerStore>,
    insights: Arc<dyn InsightStore>,
    gateway: Arc<dyn BotGateway>,
    notifier: StatusNotifier,
    reloader: CatalogReloader,
    broadcaster: Broadcaster,
    sessions: SessionStore,
    admin_name: String,
    status_policy: StatusPolicy,
    channel_chat_id: Option<ChatId>,
}

/// One backing store serving every storage trait.
pub(crate) trait Storage:
    OrderStore + CatalogStore + PostStore + CustomerStore + InsightStore + 'static
{
}

impl<T> Storage for T where
    T: OrderStore + CatalogStore + PostStore + CustomerStore + InsightStore + 'static
{
}

impl AppState {
    fn new<S: Storage>(store: Arc<S>, gateway: Arc<dyn BotGateway>, config: &AdminConfig) -> Self {
        let orders: Arc<dyn OrderStore> = store.clone();
        Self {
            notifier: StatusNotifier::new(orders.clone(), gateway.clone(), config.default_language),
            reloader: CatalogReloader::new(gateway.clone()),
            broadcaster: Broadcaster::new(gateway.clone()),
            sessions: SessionStore::new(config.session_ttl),
            admin_name: config.admin_name.clone(),
            status_policy: config.status_policy,
            channel_chat_id: config.channel_chat_id,
            orders,
            catalog: store.clone(),
            posts: store.clone(),
            customers: store.clone(),
            insights: store,
            gateway,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct LoginForm {
    username: String,
}

#[derive(Debug, Clone, Serialize)]
struct LoginResponse {
    username: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
struct ListOrdersQuery {
    status: Option<String>,
    search: Option<String>,
    page: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
struct UpdateStatusForm {
    order_id: i64,
    status: String,
}

#[derive(Debug, Clone, Serialize)]
struct UpdateStatusResponse {
    order_id: i64,
    previous_status: Option<OrderStatus>,
    status: OrderStatus,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ToggleResponse {
    id: i64,
    is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct WriteResponse {
    id: i64,
    affected: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct ProductForm {
    name: String,
    description: Option<String>,
    price: String,
    cost_price: Option<String>,
    category_id: i64,
    brand: Option<String>,
    image_url: Option<String>,
    stock: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CategoryForm {
    name: String,
    description: Option<String>,
    emoji: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct ReloadResponse {
    accepted: bool,
    admins_notified: Option<usize>,
}

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| {
                "shopdesk_admin=info,shopdesk_notify=info,shopdesk_platform=info".to_string()
            }),
        )
        .init();

    let config = ServiceConfig::from_env()?;
    let bot_config = BotConfig::from_env()?;
    let admin_config = AdminConfig::from_env()?;

    let store = Arc::new(PgStore::connect(&config.database_url, config.db_max_connections).await?);
    let redis = RedisBus::open(&config.redis_url)?;
    let gateway = Arc::new(TelegramGateway::new(bot_config, redis)?);

    let router = build_router(AppState::new(store, gateway, &admin_config));

    info!(
        "admin console listening on {} (status policy: {:?})",
        config.http_addr, admin_config.status_policy
    );
    let listener = tokio::net::TcpListener::bind(config.http_addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/status", post(update_order_status))
        .route("/orders/{order_id}", get(order_detail))
        .route("/products", post(add_product))
        .route("/products/{product_id}/toggle", post(toggle_product))
        .route("/products/{product_id}/delete", post(delete_product))
        .route("/products/{product_id}/announce", post(marketing::announce_product))
        .route("/categories", get(list_categories).post(add_category))
        .route("/categories/{category_id}/toggle", post(toggle_category))
        .route("/categories/{category_id}/edit", post(edit_category))
        .route("/posts", get(marketing::list_posts).post(marketing::create_post))
        .route("/posts/{post_id}", get(marketing::post_detail))
        .route("/posts/{post_id}/edit", post(marketing::edit_post))
        .route("/posts/{post_id}/toggle", post(marketing::toggle_post))
        .route("/posts/{post_id}/delete", post(marketing::delete_post))
        .route("/posts/{post_id}/send", post(marketing::send_post))
        .route("/customers", get(marketing::list_customers))
        .route("/broadcast", post(marketing::broadcast))
        .route("/reports/finance", get(finance_report))
        .route("/reports/profit", get(profit_report))
        .route("/reports/inventory", get(inventory_report))
        .route("/bot/reload", post(reload_bot))
        .route("/bot/force-reload", post(force_reload_bot))
        .route("/dashboard", get(dashboard))
        .route("/crm/segments", get(crm_segments))
        .route_layer(middleware::from_fn_with_state(
            state.sessions.clone(),
            require_session,
        ));

    Router::new()
        .route("/healthz", get(healthz))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .merge(protected)
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn login(
    State(state): State<AppState>,
    Form(payload): Form<LoginForm>,
) -> Result<([(HeaderName, String); 1], Json<LoginResponse>), HandlerError> {
    let username = payload.username.trim();
    if username != state.admin_name {
        warn!("rejected admin login for `{username}`");
        return Err((StatusCode::UNAUTHORIZED, "unknown admin user".to_string()));
    }

    let (token, session) = state.sessions.create(username).await;
    let ttl = session.expires_at - session.created_at;
    info!("admin `{username}` logged in");

    Ok((
        [(header::SET_COOKIE, session_cookie(token, ttl))],
        Json(LoginResponse {
            username: session.username,
            expires_at: session.expires_at,
        }),
    ))
}

async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> (StatusCode, [(HeaderName, String); 1]) {
    if let Some(token) = session_token(&headers) {
        state.sessions.revoke(token).await;
    }

    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, expired_session_cookie())],
    )
}

async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<OrderPage>, HandlerError> {
    let query = OrderListQuery {
        status: query
            .status
            .as_deref()
            .filter(|value| !value.is_empty())
            .map(OrderStatus::parse),
        search: query.search,
        page: query.page.unwrap_or(1).max(1),
    };

    let page = state
        .orders
        .list_orders(&query, ORDERS_PER_PAGE)
        .await
        .map_err(internal_error)?;

    Ok(Json(page))
}

async fn order_detail(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> Result<Json<OrderWithOwner>, HandlerError> {
    state
        .orders
        .get_order_with_owner(order_id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| order_not_found(order_id))
}

async fn update_order_status(
    State(state): State<AppState>,
    Form(payload): Form<UpdateStatusForm>,
) -> Result<Json<UpdateStatusResponse>, HandlerError> {
    if payload.status.is_empty() {
        return Err(bad_request("status is required"));
    }

    let order_id = payload.order_id;
    let status = OrderStatus::parse(&payload.status);

    let previous_status = state
        .orders
        .get_order_with_owner(order_id)
        .await
        .map_err(internal_error)?
        .map(|found| found.order.status);

    if let Some(previous) = &previous_status {
        state
            .status_policy
            .check(previous, &status)
            .map_err(transition_conflict)?;
    }

    // Under the strict policy the write only lands on the status that was checked.
    let write = match (state.status_policy, &previous_status) {
        (StatusPolicy::Strict, Some(previous)) => {
            state.orders.update_status_from(order_id, previous, &status).await
        }
        _ => state.orders.update_status(order_id, &status).await,
    };
    let affected = write.map_err(|err| {
        error!("failed to update status of order {order_id}: {err:#}");
        internal_error(err)
    })?;

    if affected == 0 {
        return Err(lost_update(&state, order_id).await);
    }

    info!("order {order_id} status set to {status}");
    state
        .notifier
        .notify(order_id, &status, previous_status.clone())
        .await;

    Ok(Json(UpdateStatusResponse {
        order_id,
        previous_status,
        status,
    }))
}

/// Classifies a write that changed no row: the order is gone, or another
/// writer moved it after the policy check.
async fn lost_update(state: &AppState, order_id: i64) -> HandlerError {
    match state.orders.get_order_with_owner(order_id).await {
        Ok(Some(current)) => {
            warn!(
                "order {order_id} changed concurrently, now `{}`",
                current.order.status
            );
            (
                StatusCode::CONFLICT,
                format!(
                    "order #{order_id} was changed concurrently, its status is now `{}`",
                    current.order.status
                ),
            )
        }
        Ok(None) => order_not_found(order_id),
        Err(err) => internal_error(err),
    }
}

async fn add_product(
    State(state): State<AppState>,
    Form(payload): Form<ProductForm>,
) -> Result<Json<WriteResponse>, HandlerError> {
    let product = NewProduct {
        name: payload.name.trim().to_string(),
        description: optional_field(payload.description),
        price: parse_field("price", &payload.price)?,
        cost_price: match optional_field(payload.cost_price) {
            Some(raw) => parse_field("cost_price", &raw)?,
            None => Decimal::ZERO,
        },
        category_id: payload.category_id,
        brand: optional_field(payload.brand),
        image_url: optional_field(payload.image_url),
        stock: match optional_field(payload.stock) {
            Some(raw) => parse_field("stock", &raw)?,
            None => 0,
        },
    };
    product.validate().map_err(bad_request)?;

    let id = state
        .catalog
        .add_product(&product)
        .await
        .map_err(internal_error)?;

    info!("product {id} `{}` added", product.name);
    state.reloader.signal("product add");

    Ok(Json(WriteResponse { id, affected: 1 }))
}

async fn toggle_product(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
) -> Result<Json<ToggleResponse>, HandlerError> {
    let is_active = state
        .catalog
        .toggle_product(product_id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| not_found("product"))?;

    state.reloader.signal("product toggle");

    Ok(Json(ToggleResponse {
        id: product_id,
        is_active,
    }))
}

async fn delete_product(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
) -> Result<Json<WriteResponse>, HandlerError> {
    let affected = state
        .catalog
        .delete_product(product_id)
        .await
        .map_err(internal_error)?;

    if affected == 0 {
        return Err(not_found("product"));
    }

    info!("product {product_id} deleted");
    state.reloader.signal("product delete");

    Ok(Json(WriteResponse {
        id: product_id,
        affected,
    }))
}

async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryListItem>>, HandlerError> {
    let categories = state.catalog.list_categories().await.map_err(internal_error)?;
    Ok(Json(categories))
}

async fn add_category(
    State(state): State<AppState>,
    Form(payload): Form<CategoryForm>,
) -> Result<Json<WriteResponse>, HandlerError> {
    let category = category_draft(payload)?;

    let id = state
        .catalog
        .add_category(&category)
        .await
        .map_err(internal_error)?;

    info!("category {id} `{}` added", category.name);
    state.reloader.signal("category add");

    if let Err(err) = state
        .gateway
        .notify_admins(&category_added_text(&category))
        .await
    {
        warn!("failed to tell admins about category {id}: {err}");
    }

    Ok(Json(WriteResponse { id, affected: 1 }))
}

async fn toggle_category(
    State(state): State<AppState>,
    Path(category_id): Path<i64>,
) -> Result<Json<ToggleResponse>, HandlerError> {
    let is_active = state
        .catalog
        .toggle_category(category_id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| not_found("category"))?;

    state.reloader.signal("category toggle");

    Ok(Json(ToggleResponse {
        id: category_id,
        is_active,
    }))
}

async fn edit_category(
    State(state): State<AppState>,
    Path(category_id): Path<i64>,
    Form(payload): Form<CategoryForm>,
) -> Result<Json<WriteResponse>, HandlerError> {
    let category = category_draft(payload)?;

    let affected = state
        .catalog
        .edit_category(category_id, &category)
        .await
        .map_err(internal_error)?;

    if affected == 0 {
        return Err(not_found("category"));
    }

    state.reloader.signal("category edit");

    Ok(Json(WriteResponse {
        id: category_id,
        affected,
    }))
}

fn category_draft(payload: CategoryForm) -> Result<CategoryDraft, HandlerError> {
    let category = CategoryDraft {
        name: payload.name.trim().to_string(),
        description: optional_field(payload.description),
        emoji: optional_field(payload.emoji),
    };
    category.validate().map_err(bad_request)?;
    Ok(category)
}

async fn reload_bot(State(state): State<AppState>) -> Json<ReloadResponse> {
    let accepted = state.reloader.reload_now("manual reload").await;

    Json(ReloadResponse {
        accepted,
        admins_notified: None,
    })
}

async fn force_reload_bot(State(state): State<AppState>) -> Json<ReloadResponse> {
    let accepted = state.reloader.reload_now("forced reload").await;

    let text = format!(
        "🔄 <b>Catalog reload forced</b>\n\n⏰ {}",
        Utc::now().format("%H:%M:%S")
    );
    let admins_notified = match state.gateway.notify_admins(&text).await {
        Ok(count) => Some(count),
        Err(err) => {
            warn!("failed to notify admins about forced reload: {err}");
            None
        }
    };

    Json(ReloadResponse {
        accepted,
        admins_notified,
    })
}

async fn dashboard(State(state): State<AppState>) -> Result<Json<DashboardSummary>, HandlerError> {
    let summary = state
        .insights
        .dashboard(Utc::now().date_naive())
        .await
        .map_err(internal_error)?;

    Ok(Json(summary))
}

async fn crm_segments(State(state): State<AppState>) -> Result<Json<CustomerSegments>, HandlerError> {
    let activity = state
        .insights
        .customer_activity()
        .await
        .map_err(internal_error)?;

    Ok(Json(segment_customers(&activity, Utc::now())))
}

async fn finance_report(State(state): State<AppState>) -> Result<Json<FinanceReport>, HandlerError> {
    Ok(Json(state.insights.finance_report().await.map_err(internal_error)?))
}

async fn profit_report(State(state): State<AppState>) -> Result<Json<ProfitReport>, HandlerError> {
    Ok(Json(state.insights.profit_report().await.map_err(internal_error)?))
}

async fn inventory_report(
    State(state): State<AppState>,
) -> Result<Json<InventoryReport>, HandlerError> {
    Ok(Json(state.insights.inventory_report().await.map_err(internal_error)?))
}

/// Trims a form field; blank counts as absent.
pub(crate) fn optional_field(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_field<T: FromStr>(field: &str, raw: &str) -> Result<T, HandlerError> {
    raw.trim()
        .parse()
        .map_err(|_| bad_request(format!("{field} has an invalid value `{raw}`")))
}

fn order_not_found(order_id: i64) -> HandlerError {
    (StatusCode::NOT_FOUND, format!("order #{order_id} not found"))
}

pub(crate) fn not_found(what: &str) -> HandlerError {
    (StatusCode::NOT_FOUND, format!("{what} not found"))
}

pub(crate) fn bad_request<E: ToString>(err: E) -> HandlerError {
    (StatusCode::BAD_REQUEST, err.to_string())
}

fn transition_conflict(err: TransitionError) -> HandlerError {
    (StatusCode::CONFLICT, err.to_string())
}

pub(crate) fn internal_error<E: std::fmt::Display>(err: E) -> HandlerError {
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}
