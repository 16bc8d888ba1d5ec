use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const LOW_STOCK_THRESHOLD: i32 = 5;
pub const LOW_STOCK_LIMIT: usize = 20;
pub const BEST_SELLERS_LIMIT: usize = 100;
pub const PRODUCT_PROFIT_LIMIT: usize = 200;
pub const CATEGORY_PROFIT_LIMIT: usize = 100;
pub const TOP_CATEGORIES_LIMIT: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRevenue {
    pub name: String,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinanceReport {
    pub revenue: Decimal,
    pub cost: Decimal,
    pub profit: Decimal,
    pub orders: i64,
    pub average_order_value: Decimal,
    pub top_categories: Vec<CategoryRevenue>,
}

impl FinanceReport {
    pub fn new(
        revenue: Decimal,
        cost: Decimal,
        orders: i64,
        top_categories: Vec<CategoryRevenue>,
    ) -> Self {
        let average_order_value = if orders > 0 {
            (revenue / Decimal::from(orders)).round_dp(2)
        } else {
            Decimal::ZERO
        };

        Self {
            revenue,
            cost,
            profit: revenue - cost,
            orders,
            average_order_value,
            top_categories,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitRow {
    pub id: i64,
    pub name: String,
    pub revenue: Decimal,
    pub cost: Decimal,
    pub profit: Decimal,
}

impl ProfitRow {
    pub fn new(id: i64, name: String, revenue: Decimal, cost: Decimal) -> Self {
        Self {
            id,
            name,
            revenue,
            cost,
            profit: revenue - cost,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfitReport {
    pub products: Vec<ProfitRow>,
    pub categories: Vec<ProfitRow>,
}

/// Most profitable first, ties by id, cut to `limit`.
pub fn rank_by_profit(mut rows: Vec<ProfitRow>, limit: usize) -> Vec<ProfitRow> {
    rows.sort_by(|a, b| b.profit.cmp(&a.profit).then(a.id.cmp(&b.id)));
    rows.truncate(limit);
    rows
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockLevel {
    pub id: i64,
    pub name: String,
    pub stock: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSales {
    pub id: i64,
    pub name: String,
    pub sales: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryReport {
    pub product_count: i64,
    pub total_stock: i64,
    pub stock_cost: Decimal,
    pub low_stock: Vec<StockLevel>,
    pub best_sellers: Vec<ProductSales>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_order_value_is_zero_without_orders() {
        let report = FinanceReport::new(Decimal::ZERO, Decimal::ZERO, 0, Vec::new());
        assert_eq!(report.average_order_value, Decimal::ZERO);

        let report = FinanceReport::new(Decimal::new(10000, 2), Decimal::new(4000, 2), 3, Vec::new());
        assert_eq!(report.profit, Decimal::new(6000, 2));
        assert_eq!(report.average_order_value, Decimal::new(3333, 2));
    }

    #[test]
    fn profit_ranking_is_descending_and_bounded() {
        let rows = vec![
            ProfitRow::new(1, "tea".to_string(), Decimal::new(10, 0), Decimal::new(8, 0)),
            ProfitRow::new(2, "coffee".to_string(), Decimal::new(30, 0), Decimal::new(5, 0)),
            ProfitRow::new(3, "cups".to_string(), Decimal::ZERO, Decimal::new(4, 0)),
        ];

        let ranked = rank_by_profit(rows, 2);
        assert_eq!(ranked.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(ranked[0].profit, Decimal::new(25, 0));
    }
}
