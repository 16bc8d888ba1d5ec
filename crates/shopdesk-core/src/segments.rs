use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::CustomerActivity;

const FREQUENT_BUYER_ORDERS: i64 = 3;
const RECENT_WINDOW_DAYS: i64 = 30;
const NEVER_ORDERED_DAYS: i64 = 999;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SegmentMember {
    pub customer_id: i64,
    pub name: String,
    pub orders: i64,
    pub spent: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerSegments {
    pub champions: Vec<SegmentMember>,
    pub loyal: Vec<SegmentMember>,
    pub at_risk: Vec<SegmentMember>,
    pub new: Vec<SegmentMember>,
}

/// Recency/frequency bucketing over non-cancelled order history.
pub fn segment_customers(activity: &[CustomerActivity], now: DateTime<Utc>) -> CustomerSegments {
    let mut segments = CustomerSegments::default();

    for customer in activity {
        let days = customer
            .last_order_at
            .map(|last| (now - last).num_days())
            .unwrap_or(NEVER_ORDERED_DAYS);
        let member = SegmentMember {
            customer_id: customer.customer_id,
            name: customer.name.clone(),
            orders: customer.orders,
            spent: customer.spent,
        };

        if customer.orders >= FREQUENT_BUYER_ORDERS && days <= RECENT_WINDOW_DAYS {
            segments.champions.push(member);
        } else if customer.orders >= FREQUENT_BUYER_ORDERS {
            segments.at_risk.push(member);
        } else if customer.orders >= 1 {
            segments.loyal.push(member);
        } else {
            segments.new.push(member);
        }
    }

    segments
}
