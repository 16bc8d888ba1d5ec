use shopdesk_core::{CategoryDraft, Language, OrderStatus, Product, ScheduledPost};

const DESCRIPTION_PREVIEW_CHARS: usize = 100;

struct Phrases {
    order_update: &'static str,
    status_changed_to: &'static str,
    thanks: &'static str,
    admin_status_changed: &'static str,
    confirmed: &'static str,
    shipped: &'static str,
    delivered: &'static str,
    cancelled: &'static str,
}

const RU: Phrases = Phrases {
    order_update: "Обновление заказа",
    status_changed_to: "Статус изменен на",
    thanks: "Спасибо за покупку!",
    admin_status_changed: "Статус заказа изменен",
    confirmed: "подтвержден",
    shipped: "отправлен",
    delivered: "доставлен",
    cancelled: "отменен",
};

const UZ: Phrases = Phrases {
    order_update: "Buyurtma yangilanishi",
    status_changed_to: "Holat o'zgartirildi",
    thanks: "Xaridingiz uchun rahmat!",
    admin_status_changed: "Buyurtma holati o'zgartirildi",
    confirmed: "tasdiqlangan",
    shipped: "jo'natilgan",
    delivered: "yetkazilgan",
    cancelled: "bekor qilingan",
};

const EN: Phrases = Phrases {
    order_update: "Order update",
    status_changed_to: "Status changed to",
    thanks: "Thank you for your purchase!",
    admin_status_changed: "Order status changed",
    confirmed: "confirmed",
    shipped: "shipped",
    delivered: "delivered",
    cancelled: "cancelled",
};

fn phrases(language: Language) -> &'static Phrases {
    match language {
        Language::Ru => &RU,
        Language::Uz => &UZ,
        Language::En => &EN,
    }
}

/// Escapes text for Telegram's HTML parse mode.
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Customer-facing label. Statuses without a table entry (including
/// `pending`) are shown as stored.
pub fn status_label(status: &OrderStatus, language: Language) -> String {
    let phrases = phrases(language);
    match status {
        OrderStatus::Confirmed => phrases.confirmed.to_string(),
        OrderStatus::Shipped => phrases.shipped.to_string(),
        OrderStatus::Delivered => phrases.delivered.to_string(),
        OrderStatus::Cancelled => phrases.cancelled.to_string(),
        other => other.as_str().to_string(),
    }
}

pub fn customer_status_text(order_id: i64, status: &OrderStatus, language: Language) -> String {
    let phrases = phrases(language);
    format!(
        "📦 <b>{} #{order_id}</b>\n\n{}: <b>{}</b>\n\n{}",
        phrases.order_update,
        phrases.status_changed_to,
        escape_html(&status_label(status, language)),
        phrases.thanks,
    )
}

pub fn admin_status_text(
    order_id: i64,
    previous: Option<&OrderStatus>,
    status: &OrderStatus,
    customer_name: Option<&str>,
    language: Language,
) -> String {
    let phrases = phrases(language);
    let transition = match previous {
        Some(previous) => format!(
            "{} → {}",
            escape_html(previous.as_str()),
            escape_html(status.as_str())
        ),
        None => escape_html(status.as_str()),
    };
    let mut text = format!(
        "🔔 <b>{} #{order_id}</b>\n{transition}",
        phrases.admin_status_changed
    );
    if let Some(name) = customer_name {
        text.push_str(&format!("\n👤 {}", escape_html(name)));
    }
    text
}

pub fn new_product_text(product: &Product) -> String {
    let mut text = format!(
        "🆕 <b>New in the catalog!</b>\n\n🛍 <b>{}</b>\n",
        escape_html(&product.name)
    );
    if let Some(description) = product.description.as_deref().filter(|d| !d.is_empty()) {
        let preview: String = description.chars().take(DESCRIPTION_PREVIEW_CHARS).collect();
        let ellipsis = if description.chars().count() > DESCRIPTION_PREVIEW_CHARS {
            "..."
        } else {
            ""
        };
        text.push_str(&format!("📝 {}{ellipsis}\n", escape_html(&preview)));
    }
    text.push_str(&format!(
        "💰 Price: <b>${:.2}</b>\n📦 In stock: {}\n\n🛒 Order: /start",
        product.price, product.stock
    ));
    text
}

pub fn category_added_text(category: &CategoryDraft) -> String {
    let emoji = category.emoji.as_deref().unwrap_or_default();
    let mut text = format!(
        "✅ <b>New category added</b>\n\n📂 <b>{} {}</b>\n",
        escape_html(emoji),
        escape_html(&category.name)
    );
    if let Some(description) = category.description.as_deref().filter(|d| !d.is_empty()) {
        text.push_str(&format!("📝 {}\n", escape_html(description)));
    }
    text.push_str("📅 Added from the admin console");
    text
}

pub fn post_text(post: &ScheduledPost) -> String {
    format!(
        "📢 <b>{}</b>\n\n{}\n\n🛍 Open the catalog: /start",
        escape_html(&post.title),
        escape_html(&post.content)
    )
}
