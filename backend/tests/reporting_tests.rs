//! Sales reporting tests

mod common;

use chrono::{Local, Timelike};
use common::{kg, money, TestContext, ADMIN_ID};

use butcher_backend::services::auth::CreateUserInput;
use butcher_backend::services::sale::{CreateSaleInput, SaleItemInput};
use butcher_backend::services::ReportingService;
use shared::models::{AccessLevel, PaymentMethod};
use shared::types::{DateRange, ReportPeriod};

fn sale(items: &[(i64, &str)]) -> CreateSaleInput {
    CreateSaleInput {
        shift_label: "morning".to_string(),
        payment_method: Some(PaymentMethod::Cash),
        items: items
            .iter()
            .map(|(product_id, weight)| SaleItemInput {
                product_id: *product_id,
                weight: kg(weight),
            })
            .collect(),
    }
}

fn today() -> DateRange {
    ReportPeriod::Today.resolve(Local::now().date_naive())
}

#[tokio::test]
async fn test_top_products_by_weight_and_revenue() {
    let ctx = TestContext::new().await;
    let cheap = ctx.product("MNC", "Mince", "500", "50").await;
    let dear = ctx.product("TND", "Tenderloin", "5000", "50").await;

    ctx.sales()
        .create_sale(ADMIN_ID, sale(&[(cheap.id, "6"), (dear.id, "1")]))
        .await
        .unwrap();
    ctx.sales()
        .create_sale(ADMIN_ID, sale(&[(cheap.id, "2")]))
        .await
        .unwrap();

    let by_weight = ctx
        .reports()
        .top_products_by_weight(&today(), 10)
        .await
        .unwrap();
    assert_eq!(by_weight.len(), 2);
    assert_eq!(by_weight[0].code, "MNC");
    assert_eq!(by_weight[0].weight_sold, kg("8"));
    assert_eq!(by_weight[0].revenue, money("4000"));

    let by_revenue = ctx
        .reports()
        .top_products_by_revenue(&today(), 1)
        .await
        .unwrap();
    assert_eq!(by_revenue.len(), 1);
    assert_eq!(by_revenue[0].code, "TND");
}

#[tokio::test]
async fn test_reports_exclude_cancelled_sales() {
    let ctx = TestContext::new().await;
    let mince = ctx.product("MNC", "Mince", "1000", "50").await;

    ctx.sales()
        .create_sale(ADMIN_ID, sale(&[(mince.id, "1")]))
        .await
        .unwrap();
    let voided = ctx
        .sales()
        .create_sale(ADMIN_ID, sale(&[(mince.id, "4")]))
        .await
        .unwrap();
    ctx.sales()
        .cancel_sale(voided.ticket_number, ADMIN_ID, "rang up twice")
        .await
        .unwrap();

    let summary = ctx.reports().total_revenue(&today()).await.unwrap();
    assert_eq!(summary.sale_count, 1);
    assert_eq!(summary.total, money("1000"));

    let top = ctx
        .reports()
        .top_products_by_weight(&today(), 10)
        .await
        .unwrap();
    assert_eq!(top[0].weight_sold, kg("1"));

    let hourly = ctx.reports().revenue_by_hour(&today()).await.unwrap();
    let count: i64 = hourly.iter().map(|h| h.sale_count).sum();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_revenue_by_operator() {
    let ctx = TestContext::new().await;
    let mince = ctx.product("MNC", "Mince", "1000", "50").await;
    let clerk = ctx
        .auth()
        .create_user(
            CreateUserInput {
                username: "clerk".to_string(),
                password: "counter1".to_string(),
                access_level: AccessLevel::Employee,
            },
            ADMIN_ID,
        )
        .await
        .unwrap();

    ctx.sales()
        .create_sale(clerk.id, sale(&[(mince.id, "3")]))
        .await
        .unwrap();
    ctx.sales()
        .create_sale(clerk.id, sale(&[(mince.id, "1")]))
        .await
        .unwrap();
    ctx.sales()
        .create_sale(ADMIN_ID, sale(&[(mince.id, "2")]))
        .await
        .unwrap();

    let rows = ctx.reports().revenue_by_operator(&today()).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].username, "clerk");
    assert_eq!(rows[0].sale_count, 2);
    assert_eq!(rows[0].total, money("4000"));
    assert_eq!(rows[1].username, "admin");
}

#[tokio::test]
async fn test_hourly_revenue_lands_in_current_hour() {
    let ctx = TestContext::new().await;
    let mince = ctx.product("MNC", "Mince", "1000", "50").await;
    let before = Local::now().hour();
    ctx.sales()
        .create_sale(ADMIN_ID, sale(&[(mince.id, "2")]))
        .await
        .unwrap();
    let after = Local::now().hour();

    let hourly = ctx.reports().revenue_by_hour(&today()).await.unwrap();
    assert_eq!(hourly.len(), 1);
    assert!(hourly[0].hour == before || hourly[0].hour == after);
    assert_eq!(hourly[0].total, money("2000"));
}

#[tokio::test]
async fn test_empty_period_reports_zero() {
    let ctx = TestContext::new().await;
    let yesterday = ReportPeriod::Yesterday.resolve(Local::now().date_naive());

    let summary = ctx.reports().total_revenue(&yesterday).await.unwrap();
    assert_eq!(summary.sale_count, 0);
    assert_eq!(summary.total, money("0"));
    assert!(ctx
        .reports()
        .top_products_by_weight(&yesterday, 10)
        .await
        .unwrap()
        .is_empty());
    assert!(ctx
        .reports()
        .revenue_by_operator(&yesterday)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_csv_export_of_product_ranking() {
    let ctx = TestContext::new().await;
    let mince = ctx.product("MNC", "Mince", "1000", "50").await;
    ctx.sales()
        .create_sale(ADMIN_ID, sale(&[(mince.id, "1.5")]))
        .await
        .unwrap();

    let rows = ctx
        .reports()
        .top_products_by_weight(&today(), 10)
        .await
        .unwrap();
    let csv = ReportingService::export_to_csv(&rows).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("product_id,code,name,weight_sold,revenue")
    );
    assert_eq!(
        lines.next(),
        Some(format!("{},MNC,Mince,1.500,1500.00", mince.id).as_str())
    );
}
