use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use shopdesk_core::{
    BotGateway, Category, ChatId, Customer, DeliveryResult, GatewayError, Language, Order,
    OrderStatus, Product, StatusPolicy,
};
use shopdesk_memstore::InMemoryStore;
use shopdesk_platform::AdminConfig;
use tokio::sync::Mutex;

use crate::AppState;

pub const CHANNEL: ChatId = ChatId(-100500);

#[derive(Default)]
pub struct RecordingGateway {
    pub fail: bool,
    pub sent: Mutex<Vec<(ChatId, String)>>,
    pub admin: Mutex<Vec<String>>,
    pub reloads: AtomicUsize,
}

#[async_trait]
impl BotGateway for RecordingGateway {
    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<DeliveryResult, GatewayError> {
        self.sent.lock().await.push((chat_id, text.to_string()));
        if self.fail {
            return Err(GatewayError::Rejected("chat not found".to_string()));
        }
        Ok(DeliveryResult {
            ok: true,
            message_id: Some(10),
        })
    }

    async fn notify_admins(&self, text: &str) -> Result<usize, GatewayError> {
        self.admin.lock().await.push(text.to_string());
        Ok(1)
    }

    async fn trigger_catalog_reload(&self) -> bool {
        self.reloads.fetch_add(1, Ordering::SeqCst);
        true
    }
}

pub fn admin_config(status_policy: StatusPolicy) -> AdminConfig {
    AdminConfig {
        admin_name: "AdminUser".to_string(),
        session_ttl: Duration::hours(12),
        default_language: Language::En,
        status_policy,
        channel_chat_id: Some(CHANNEL),
    }
}

/// One customer (chat 5001) with pending order #42, product 3 "Green tea" in
/// category 8 "Drinks".
pub async fn fixture(
    gateway: RecordingGateway,
    status_policy: StatusPolicy,
) -> (AppState, Arc<InMemoryStore>, Arc<RecordingGateway>) {
    let store = Arc::new(InMemoryStore::new());
    store
        .insert_customer(Customer {
            id: 1,
            telegram_id: Some(ChatId(5001)),
            name: "Sardor".to_string(),
            phone: None,
            email: Some("sardor@example.com".to_string()),
            language: Some(Language::En),
            is_admin: false,
        })
        .await;
    store
        .insert_order(Order {
            id: 42,
            user_id: 1,
            total_amount: Decimal::new(4500, 2),
            status: OrderStatus::Pending,
            created_at: Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap(),
            delivery_address: None,
            payment_method: Some("cash".to_string()),
        })
        .await;
    store
        .insert_category(Category {
            id: 8,
            name: "Drinks".to_string(),
            description: None,
            emoji: Some("🥤".to_string()),
            is_active: true,
        })
        .await;
    store
        .insert_product(Product {
            id: 3,
            name: "Green tea".to_string(),
            description: Some("Loose leaf sencha".to_string()),
            price: Decimal::new(450, 2),
            cost_price: Decimal::new(200, 2),
            category_id: Some(8),
            brand: None,
            image_url: None,
            stock: 4,
            is_active: true,
            sales_count: 10,
        })
        .await;

    let gateway = Arc::new(gateway);
    let state = AppState::new(store.clone(), gateway.clone(), &admin_config(status_policy));
    (state, store, gateway)
}

pub async fn wait_for_reloads(gateway: &RecordingGateway, expected: usize) {
    for _ in 0..100 {
        if gateway.reloads.load(Ordering::SeqCst) >= expected {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("expected {expected} catalog reload signal(s)");
}
