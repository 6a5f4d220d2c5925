//! Reporting handlers for sales analytics and CSV export

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::reporting::DEFAULT_TOP_LIMIT;
use crate::services::ReportingService;
use crate::AppState;
use shared::types::{DateRange, ReportPeriod};

/// Date selection shared by every report and the sales listing
///
/// An explicit `start_date`/`end_date` wins over `period`; with neither the
/// range is today.
#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub period: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl RangeQuery {
    pub fn resolve(&self, today: NaiveDate) -> AppResult<DateRange> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => return Ok(DateRange::new(start, end)),
            (Some(day), None) | (None, Some(day)) => return Ok(DateRange::single_day(day)),
            (None, None) => {}
        }
        match self.period.as_deref() {
            None => Ok(ReportPeriod::Today.resolve(today)),
            Some(raw) => ReportPeriod::from_str(raw)
                .map(|period| period.resolve(today))
                .ok_or_else(|| {
                    AppError::validation(
                        "period",
                        "Expected today, yesterday, last_7_days or this_month",
                    )
                }),
        }
    }
}

#[derive(Deserialize)]
pub struct ReportQuery {
    pub period: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub format: Option<String>, // "json" or "csv"
}

impl ReportQuery {
    fn range(&self) -> AppResult<DateRange> {
        RangeQuery {
            period: self.period.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
        }
        .resolve(today())
    }
}

#[derive(Deserialize)]
pub struct TopProductsQuery {
    pub period: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub by: Option<String>, // "weight" or "revenue"
    pub limit: Option<i64>,
    pub format: Option<String>,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn respond<T: Serialize>(data: Vec<T>, format: Option<&str>, filename: &str) -> AppResult<Response> {
    if format == Some("csv") {
        let csv = ReportingService::export_to_csv(&data)?;
        let disposition = format!("attachment; filename=\"{}.csv\"", filename);
        Ok((
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            csv,
        )
            .into_response())
    } else {
        Ok(Json(data).into_response())
    }
}

/// Best-selling cuts by weight or revenue
pub async fn top_products(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<TopProductsQuery>,
) -> AppResult<Response> {
    let range = RangeQuery {
        period: query.period.clone(),
        start_date: query.start_date,
        end_date: query.end_date,
    }
    .resolve(today())?;
    let limit = query.limit.unwrap_or(DEFAULT_TOP_LIMIT);
    let service = ReportingService::new(state.store.clone());

    let data = match query.by.as_deref() {
        None | Some("weight") => service.top_products_by_weight(&range, limit).await?,
        Some("revenue") => service.top_products_by_revenue(&range, limit).await?,
        Some(_) => {
            return Err(AppError::validation("by", "Expected weight or revenue"));
        }
    };

    respond(data, query.format.as_deref(), "top_products")
}

/// Revenue per operator
pub async fn operator_revenue(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    let range = query.range()?;
    let data = ReportingService::new(state.store.clone())
        .revenue_by_operator(&range)
        .await?;
    respond(data, query.format.as_deref(), "operator_revenue")
}

pub async fn hourly_revenue(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    let range = query.range()?;
    let data = ReportingService::new(state.store.clone())
        .revenue_by_hour(&range)
        .await?;
    respond(data, query.format.as_deref(), "hourly_revenue")
}

pub async fn total_revenue(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    let range = query.range()?;
    let summary = ReportingService::new(state.store.clone())
        .total_revenue(&range)
        .await?;
    respond(vec![summary], query.format.as_deref(), "revenue")
}
