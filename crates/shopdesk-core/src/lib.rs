pub mod catalog;
pub mod gateway;
pub mod models;
pub mod posts;
pub mod reports;
pub mod segments;
pub mod storage;
pub mod transitions;

pub use catalog::{CatalogError, Category, CategoryDraft, CategoryListItem, NewProduct, Product};
pub use gateway::{BotGateway, DeliveryResult, GatewayError};
pub use models::{
    ChatId, Customer, CustomerActivity, CustomerListItem, CustomerListQuery, CustomerPage,
    DailyTotals, DashboardSummary, Language, Order, OrderItem, OrderListItem, OrderListQuery,
    OrderPage, OrderStatus, OrderWithOwner, StatusTransitionEvent, page_offset, total_pages,
};
pub use posts::{
    ACTIVE_WINDOW_DAYS, Audience, PostDraft, PostError, PostSchedule, ScheduledPost,
    VIP_SPEND_THRESHOLD, parse_send_time,
};
pub use reports::{
    CategoryRevenue, FinanceReport, InventoryReport, ProductSales, ProfitReport, ProfitRow,
    StockLevel, rank_by_profit,
};
pub use segments::{CustomerSegments, SegmentMember, segment_customers};
pub use storage::{CatalogStore, CustomerStore, InsightStore, OrderStore, PostStore};
pub use transitions::{StatusPolicy, TransitionError};
