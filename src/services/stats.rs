//! Back-office dashboard figures.
use serde::Serialize;
use time::{macros::offset, OffsetDateTime, UtcOffset};

use crate::db::{
    self,
    errors::DatabaseError,
    models::{
        apporder::{AppOrder, OrderSalesRow, OrderStatus},
        car::Car,
        tyre::Tyre,
    },
};

/// Months are bucketed in India Standard Time.
const STORE_OFFSET: UtcOffset = offset!(+5:30);

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct MonthlySales {
    pub month: &'static str,
    /// Paise.
    pub sales: i64,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub total_sales: i64,
    pub pending_orders: u64,
    pub sales_by_month: Vec<MonthlySales>,
}

#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_tyres: i64,
    pub total_orders: i64,
    pub total_cars: i64,
    #[serde(flatten)]
    pub sales: SalesSummary,
}

/// Sum sales over non-cancelled orders. Monthly buckets cover the calendar
/// year `now` falls in.
pub fn summarize(rows: &[OrderSalesRow], now: OffsetDateTime) -> SalesSummary {
    let current_year = now.to_offset(STORE_OFFSET).year();
    let mut monthly = [0_i64; 12];
    let mut total_sales = 0_i64;
    let mut pending_orders = 0_u64;
    for row in rows.iter().filter(|row| row.status != OrderStatus::Cancelled) {
        total_sales = total_sales.saturating_add(row.total_amount);
        if row.status == OrderStatus::Pending {
            pending_orders += 1;
        }
        let placed = row.created_at.to_offset(STORE_OFFSET);
        if placed.year() == current_year {
            let index = usize::from(u8::from(placed.month()) - 1);
            monthly[index] = monthly[index].saturating_add(row.total_amount);
        }
    }
    SalesSummary {
        total_sales,
        pending_orders,
        sales_by_month: MONTH_LABELS
            .iter()
            .zip(monthly)
            .map(|(&month, sales)| MonthlySales { month, sales })
            .collect(),
    }
}

pub async fn dashboard(db_conn: &db::ConnectionPool) -> Result<DashboardStats, DatabaseError> {
    let rows = AppOrder::select_sales_rows(db_conn).await?;
    Ok(DashboardStats {
        total_tyres: Tyre::count(db_conn).await?,
        total_orders: AppOrder::count(db_conn).await?,
        total_cars: Car::count(db_conn).await?,
        sales: summarize(&rows, OffsetDateTime::now_utc()),
    })
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn row(created_at: OffsetDateTime, total_amount: i64, status: OrderStatus) -> OrderSalesRow {
        OrderSalesRow {
            created_at,
            total_amount,
            status,
        }
    }

    #[test]
    fn cancelled_orders_do_not_count() {
        let now = datetime!(2025-06-15 12:00 UTC);
        let summary = summarize(
            &[
                row(datetime!(2025-03-02 10:00 UTC), 500_000, OrderStatus::Delivered),
                row(datetime!(2025-03-20 10:00 UTC), 200_000, OrderStatus::Cancelled),
                row(datetime!(2025-05-01 10:00 UTC), 100_000, OrderStatus::Pending),
            ],
            now,
        );
        assert_eq!(summary.total_sales, 600_000);
        assert_eq!(summary.pending_orders, 1);
        assert_eq!(summary.sales_by_month[2].sales, 500_000);
        assert_eq!(summary.sales_by_month[4].sales, 100_000);
        assert_eq!(summary.sales_by_month.len(), 12);
        assert_eq!(summary.sales_by_month[0].month, "Jan");
        assert_eq!(summary.sales_by_month[11].month, "Dec");
    }

    #[test]
    fn months_are_bucketed_in_ist() {
        let now = datetime!(2025-06-15 12:00 UTC);
        // 20:00 UTC on Jan 31 is already Feb 1 in India.
        let summary = summarize(
            &[row(datetime!(2025-01-31 20:00 UTC), 4_200, OrderStatus::Confirmed)],
            now,
        );
        assert_eq!(summary.sales_by_month[0].sales, 0);
        assert_eq!(summary.sales_by_month[1].sales, 4_200);
    }

    #[test]
    fn other_years_count_towards_total_only() {
        let now = datetime!(2025-06-15 12:00 UTC);
        let summary = summarize(
            &[row(datetime!(2024-06-10 10:00 UTC), 300_000, OrderStatus::Shipped)],
            now,
        );
        assert_eq!(summary.total_sales, 300_000);
        assert!(summary.sales_by_month.iter().all(|month| month.sales == 0));
    }

    #[test]
    fn serializes_for_the_dashboard() {
        let stats = DashboardStats {
            total_tyres: 3,
            total_orders: 2,
            total_cars: 1,
            sales: summarize(&[], datetime!(2025-01-01 00:00 UTC)),
        };
        let value = serde_json::to_value(&stats).expect("serializes");
        assert_eq!(value["totalTyres"], 3);
        assert_eq!(value["pendingOrders"], 0);
        assert_eq!(value["salesByMonth"][0]["month"], "Jan");
    }
}
