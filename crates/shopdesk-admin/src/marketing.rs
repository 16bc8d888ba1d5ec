//! Customer-facing outreach: scheduled posts, the customer list, broadcasts
//! and product announcements.

use axum::{
    Form, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use shopdesk_core::{
    Audience, ChatId, CustomerListQuery, CustomerPage, PostDraft, PostError, PostSchedule,
    ScheduledPost, parse_send_time,
};
use shopdesk_notify::{BroadcastReport, new_product_text, post_text};
use tracing::{info, warn};

use crate::{
    AppState, HandlerError, ToggleResponse, WriteResponse, bad_request, internal_error, not_found,
    optional_field,
};

const CUSTOMERS_PER_PAGE: u32 = 20;

/// Post editor fields. A send slot is used only when its checkbox is ticked.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct PostForm {
    title: String,
    content: String,
    morning_enabled: Option<String>,
    morning_time: Option<String>,
    afternoon_enabled: Option<String>,
    afternoon_time: Option<String>,
    evening_enabled: Option<String>,
    evening_time: Option<String>,
    target_audience: String,
    image_url: Option<String>,
}

impl PostForm {
    fn into_draft(self) -> Result<PostDraft, PostError> {
        let audience = Audience::parse(&self.target_audience)
            .ok_or_else(|| PostError::UnknownAudience(self.target_audience.clone()))?;

        let draft = PostDraft {
            title: self.title.trim().to_string(),
            content: self.content.trim().to_string(),
            schedule: PostSchedule {
                morning: send_slot(self.morning_enabled.as_deref(), self.morning_time.as_deref())?,
                afternoon: send_slot(
                    self.afternoon_enabled.as_deref(),
                    self.afternoon_time.as_deref(),
                )?,
                evening: send_slot(self.evening_enabled.as_deref(), self.evening_time.as_deref())?,
            },
            audience,
            image_url: optional_field(self.image_url),
        };
        draft.validate()?;
        Ok(draft)
    }
}

fn send_slot(enabled: Option<&str>, time: Option<&str>) -> Result<Option<NaiveTime>, PostError> {
    match enabled {
        Some(_) => parse_send_time(time.unwrap_or_default()),
        None => Ok(None),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ListCustomersQuery {
    search: Option<String>,
    page: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct BroadcastForm {
    message: String,
    target_audience: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AnnounceResponse {
    product_id: i64,
    message_id: Option<i64>,
}

pub(crate) async fn list_posts(
    State(state): State<AppState>,
) -> Result<Json<Vec<ScheduledPost>>, HandlerError> {
    Ok(Json(state.posts.list_posts().await.map_err(internal_error)?))
}

pub(crate) async fn post_detail(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<ScheduledPost>, HandlerError> {
    state
        .posts
        .get_post(post_id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| not_found("post"))
}

pub(crate) async fn create_post(
    State(state): State<AppState>,
    Form(payload): Form<PostForm>,
) -> Result<Json<WriteResponse>, HandlerError> {
    let draft = payload.into_draft().map_err(bad_request)?;

    let id = state
        .posts
        .create_post(&draft, Utc::now())
        .await
        .map_err(internal_error)?;

    info!("scheduled post {id} created for `{}`", draft.audience);
    state.reloader.signal("post create");

    Ok(Json(WriteResponse { id, affected: 1 }))
}

pub(crate) async fn edit_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Form(payload): Form<PostForm>,
) -> Result<Json<WriteResponse>, HandlerError> {
    let draft = payload.into_draft().map_err(bad_request)?;

    let affected = state
        .posts
        .update_post(post_id, &draft, Utc::now())
        .await
        .map_err(internal_error)?;

    if affected == 0 {
        return Err(not_found("post"));
    }

    state.reloader.signal("post edit");

    Ok(Json(WriteResponse {
        id: post_id,
        affected,
    }))
}

pub(crate) async fn toggle_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<ToggleResponse>, HandlerError> {
    let is_active = state
        .posts
        .toggle_post(post_id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| not_found("post"))?;

    state.reloader.signal("post toggle");

    Ok(Json(ToggleResponse {
        id: post_id,
        is_active,
    }))
}

pub(crate) async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<WriteResponse>, HandlerError> {
    let affected = state
        .posts
        .delete_post(post_id)
        .await
        .map_err(internal_error)?;

    if affected == 0 {
        return Err(not_found("post"));
    }

    info!("scheduled post {post_id} deleted");
    state.reloader.signal("post delete");

    Ok(Json(WriteResponse {
        id: post_id,
        affected,
    }))
}

pub(crate) async fn send_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<BroadcastReport>, HandlerError> {
    let post = state
        .posts
        .get_post(post_id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| not_found("post"))?;

    let recipients = match post.audience {
        Audience::Channel => vec![channel(&state)?],
        audience => state
            .customers
            .audience_chat_ids(audience, Utc::now())
            .await
            .map_err(internal_error)?,
    };

    info!(
        "sending post {post_id} to {} recipient(s) in `{}`",
        recipients.len(),
        post.audience
    );
    Ok(Json(state.broadcaster.send(&recipients, &post_text(&post)).await))
}

pub(crate) async fn list_customers(
    State(state): State<AppState>,
    Query(query): Query<ListCustomersQuery>,
) -> Result<Json<CustomerPage>, HandlerError> {
    let query = CustomerListQuery {
        search: optional_field(query.search),
        page: query.page.unwrap_or(1).max(1),
    };

    let page = state
        .customers
        .list_customers(&query, CUSTOMERS_PER_PAGE)
        .await
        .map_err(internal_error)?;

    Ok(Json(page))
}

pub(crate) async fn broadcast(
    State(state): State<AppState>,
    Form(payload): Form<BroadcastForm>,
) -> Result<Json<BroadcastReport>, HandlerError> {
    if payload.message.trim().is_empty() {
        return Err(bad_request("message is required"));
    }

    let audience = match Audience::parse(&payload.target_audience) {
        Some(Audience::Channel) | None => {
            return Err(bad_request(format!(
                "unsupported broadcast audience `{}`",
                payload.target_audience
            )));
        }
        Some(audience) => audience,
    };

    let recipients = state
        .customers
        .audience_chat_ids(audience, Utc::now())
        .await
        .map_err(internal_error)?;

    info!(
        "broadcasting to {} customer(s) in `{audience}`",
        recipients.len()
    );
    Ok(Json(state.broadcaster.send(&recipients, &payload.message).await))
}

pub(crate) async fn announce_product(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
) -> Result<Json<AnnounceResponse>, HandlerError> {
    let product = state
        .catalog
        .get_product(product_id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| not_found("product"))?;
    let channel = channel(&state)?;

    match state
        .gateway
        .send_message(channel, &new_product_text(&product))
        .await
    {
        Ok(result) if result.ok => {
            info!("product {product_id} announced in channel {channel}");
            Ok(Json(AnnounceResponse {
                product_id,
                message_id: result.message_id,
            }))
        }
        Ok(_) => Err((
            StatusCode::BAD_GATEWAY,
            "bot api did not accept the announcement".to_string(),
        )),
        Err(err) => {
            warn!("failed to announce product {product_id}: {err}");
            Err((StatusCode::BAD_GATEWAY, err.to_string()))
        }
    }
}

fn channel(state: &AppState) -> Result<ChatId, HandlerError> {
    state.channel_chat_id.ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "TELEGRAM_CHANNEL_ID is not configured".to_string(),
        )
    })
}

#[cfg(test)]
mod tests {
    use shopdesk_core::{CatalogStore, Customer, Language, PostStore, StatusPolicy};

    use super::*;
    use crate::test_support::{CHANNEL, RecordingGateway, fixture, wait_for_reloads};

    fn post_form(title: &str, audience: &str) -> PostForm {
        PostForm {
            title: title.to_string(),
            content: "Fresh <b>arrivals</b> every morning".to_string(),
            morning_enabled: Some("on".to_string()),
            morning_time: Some("09:00".to_string()),
            evening_time: Some("20:30".to_string()),
            target_audience: audience.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn post_writes_signal_reload() {
        let (state, store, gateway) =
            fixture(RecordingGateway::default(), StatusPolicy::Permissive).await;

        let Json(created) = create_post(State(state.clone()), Form(post_form("Morning", "all")))
            .await
            .unwrap();
        let post = store.get_post(created.id).await.unwrap().unwrap();
        assert_eq!(post.schedule.morning, NaiveTime::from_hms_opt(9, 0, 0));
        assert_eq!(post.schedule.evening, None);
        assert!(post.is_active);

        edit_post(
            State(state.clone()),
            Path(created.id),
            Form(post_form("Morning deals", "vip")),
        )
        .await
        .unwrap();
        let Json(post) = post_detail(State(state.clone()), Path(created.id)).await.unwrap();
        assert_eq!(post.title, "Morning deals");
        assert_eq!(post.audience, Audience::Vip);
        assert!(post.updated_at.is_some());

        let Json(toggled) = toggle_post(State(state.clone()), Path(created.id)).await.unwrap();
        assert!(!toggled.is_active);

        delete_post(State(state.clone()), Path(created.id)).await.unwrap();
        let Json(posts) = list_posts(State(state)).await.unwrap();
        assert!(posts.is_empty());

        wait_for_reloads(&gateway, 4).await;
    }

    #[tokio::test]
    async fn malformed_post_is_rejected() {
        let (state, _store, gateway) =
            fixture(RecordingGateway::default(), StatusPolicy::Permissive).await;

        let err = create_post(State(state.clone()), Form(post_form("Promo", "everyone")))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
        assert!(err.1.contains("everyone"));

        let mut form = post_form("Promo", "all");
        form.morning_time = Some("9am".to_string());
        let err = create_post(State(state.clone()), Form(form)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);

        let err = create_post(State(state.clone()), Form(post_form("  ", "all")))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);

        let err = toggle_post(State(state), Path(404)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);

        tokio::task::yield_now().await;
        assert_eq!(gateway.reloads.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn channel_post_is_sent_to_the_channel_escaped() {
        let (state, _store, gateway) =
            fixture(RecordingGateway::default(), StatusPolicy::Permissive).await;

        let Json(created) = create_post(
            State(state.clone()),
            Form(post_form("Tea & cakes", "channel")),
        )
        .await
        .unwrap();

        let Json(report) = send_post(State(state), Path(created.id)).await.unwrap();
        assert_eq!(report.sent, 1);
        assert_eq!(report.failed, 0);

        let sent = gateway.sent.lock().await;
        assert_eq!(sent[0].0, CHANNEL);
        assert!(sent[0].1.contains("Tea &amp; cakes"));
        assert!(sent[0].1.contains("&lt;b&gt;arrivals"));
    }

    #[tokio::test]
    async fn broadcast_reaches_the_selected_audience_verbatim() {
        let (state, store, gateway) =
            fixture(RecordingGateway::default(), StatusPolicy::Permissive).await;
        store
            .insert_customer(Customer {
                id: 2,
                telegram_id: Some(ChatId(5002)),
                name: "Malika".to_string(),
                phone: None,
                email: None,
                language: Some(Language::Uz),
                is_admin: false,
            })
            .await;

        let Json(report) = broadcast(
            State(state.clone()),
            Form(BroadcastForm {
                message: "<b>Sale</b> today".to_string(),
                target_audience: "all".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(report.recipients, 2);
        assert_eq!(report.sent, 2);
        assert_eq!(gateway.sent.lock().await[0].1, "<b>Sale</b> today");

        let Json(report) = broadcast(
            State(state),
            Form(BroadcastForm {
                message: "VIP only".to_string(),
                target_audience: "vip".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(report, BroadcastReport::default());
    }

    #[tokio::test]
    async fn broadcast_counts_failed_deliveries() {
        let gateway = RecordingGateway {
            fail: true,
            ..Default::default()
        };
        let (state, _store, _gateway) = fixture(gateway, StatusPolicy::Permissive).await;

        let Json(report) = broadcast(
            State(state),
            Form(BroadcastForm {
                message: "hello".to_string(),
                target_audience: "all".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(report.recipients, 1);
        assert_eq!(report.sent, 0);
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn broadcast_rejects_channel_and_unknown_audiences() {
        let (state, _store, gateway) =
            fixture(RecordingGateway::default(), StatusPolicy::Permissive).await;

        for audience in ["channel", "friends"] {
            let err = broadcast(
                State(state.clone()),
                Form(BroadcastForm {
                    message: "hello".to_string(),
                    target_audience: audience.to_string(),
                }),
            )
            .await
            .unwrap_err();
            assert_eq!(err.0, StatusCode::BAD_REQUEST);
        }
        assert!(gateway.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn customers_are_listed_with_spend() {
        let (state, _store, _gateway) =
            fixture(RecordingGateway::default(), StatusPolicy::Permissive).await;

        let Json(page) = list_customers(
            State(state.clone()),
            Query(ListCustomersQuery {
                search: Some("SARDOR@".to_string()),
                page: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(page.total_customers, 1);
        assert_eq!(page.items[0].orders, 1);

        let Json(page) = list_customers(
            State(state),
            Query(ListCustomersQuery {
                search: Some("nobody".to_string()),
                page: Some(3),
            }),
        )
        .await
        .unwrap();
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn announcement_goes_to_the_channel() {
        let (state, _store, gateway) =
            fixture(RecordingGateway::default(), StatusPolicy::Permissive).await;

        let Json(response) = announce_product(State(state), Path(3)).await.unwrap();
        assert_eq!(response.message_id, Some(10));

        let sent = gateway.sent.lock().await;
        assert_eq!(sent[0].0, CHANNEL);
        assert!(sent[0].1.contains("Green tea"));
        assert!(sent[0].1.contains("$4.50"));
    }

    #[tokio::test]
    async fn announcement_errors_map_to_status_codes() {
        let (mut state, store, _gateway) =
            fixture(RecordingGateway::default(), StatusPolicy::Permissive).await;

        let err = announce_product(State(state.clone()), Path(99)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);

        state.channel_chat_id = None;
        let err = announce_product(State(state), Path(3)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::SERVICE_UNAVAILABLE);

        let gateway = RecordingGateway {
            fail: true,
            ..Default::default()
        };
        let (state, _store, _gateway) = fixture(gateway, StatusPolicy::Permissive).await;
        let err = announce_product(State(state), Path(3)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_GATEWAY);
        assert!(store.get_product(3).await.unwrap().is_some());
    }
}
