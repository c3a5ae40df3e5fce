//! Google Sheets destination
//!
//! Appends rows through the Sheets REST `values:append` endpoint. The bearer
//! token is obtained outside chitieu (gcloud, a service-account helper) and
//! passed in through an environment variable. The target sheets are expected
//! to exist with their header rows already in place.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::json;
use tracing::debug;

use super::{now, BalanceRow, SyncDestination, TransactionRow};
use crate::error::{Error, Result};
use crate::models::{Balance, Transaction};

pub const SHEETS_API_URL: &str = "https://sheets.googleapis.com";

/// Sheet receiving balance snapshots
pub const BALANCE_SHEET: &str = "Số dư";

#[derive(Clone)]
pub struct SheetsDestination {
    http_client: Client,
    base_url: String,
    spreadsheet_id: String,
    sheet: String,
    token: String,
}

impl SheetsDestination {
    pub fn new(spreadsheet_id: &str, sheet: &str, token: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: SHEETS_API_URL.to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            sheet: sheet.to_string(),
            token: token.to_string(),
        }
    }

    /// Point at a different API host (tests)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("Invalid Sheets API URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("Invalid Sheets API URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str()])
            .extend(segments);
        Ok(url)
    }

    fn append_url(&self, sheet: &str) -> Result<Url> {
        let range = format!("{}:append", sheet);
        let mut url = self.url(&["values", &range])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED")
            .append_pair("insertDataOption", "INSERT_ROWS");
        Ok(url)
    }

    async fn append(&self, sheet: &str, values: Vec<Vec<serde_json::Value>>) -> Result<()> {
        let url = self.append_url(sheet)?;
        debug!("Appending {} rows to {}", values.len(), url);

        let response = self
            .http_client
            .post(url)
            .bearer_auth(&self.token)
            .json(&json!({ "values": values }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Sync(format!("Sheets API error {}: {}", status, body)));
        }
        Ok(())
    }
}

#[async_trait]
impl SyncDestination for SheetsDestination {
    fn name(&self) -> &str {
        "sheets"
    }

    async fn push_transactions(&self, transactions: &[Transaction]) -> Result<usize> {
        if transactions.is_empty() {
            return Ok(0);
        }
        let synced_at = now();
        let values = transactions
            .iter()
            .map(|tx| TransactionRow::new(tx, synced_at).cells())
            .collect();
        self.append(&self.sheet, values).await?;
        Ok(transactions.len())
    }

    async fn push_balance(&self, balance: &Balance) -> Result<()> {
        let row = BalanceRow::new(balance, now());
        self.append(BALANCE_SHEET, vec![row.cells()]).await
    }

    async fn test_connection(&self) -> Result<()> {
        let mut url = self.url(&[])?;
        url.query_pairs_mut().append_pair("fields", "spreadsheetId");

        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Sync(format!("Sheets API error {}: {}", status, body)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::State,
        http::{HeaderMap, StatusCode, Uri},
        response::{IntoResponse, Response},
        Router,
    };
    use chrono::{NaiveDate, Utc};

    use crate::models::{BalanceAccount, InterpretationSource, MealTime, TransactionKind};

    #[derive(Clone, Default)]
    struct Recorded {
        requests: Arc<Mutex<Vec<(String, serde_json::Value)>>>,
    }

    async fn record(
        State(recorded): State<Recorded>,
        headers: HeaderMap,
        uri: Uri,
        body: String,
    ) -> Response {
        let authorized = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == "Bearer test-token")
            .unwrap_or(false);
        if !authorized {
            return (StatusCode::UNAUTHORIZED, "bad token").into_response();
        }

        let body = serde_json::from_str(&body).unwrap_or(serde_json::Value::Null);
        recorded
            .requests
            .lock()
            .unwrap()
            .push((uri.to_string(), body));
        axum::Json(json!({"spreadsheetId": "sheet-123"})).into_response()
    }

    async fn start_server(recorded: Recorded) -> String {
        let app = Router::new().fallback(record).with_state(recorded);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn transaction() -> Transaction {
        Transaction {
            id: 7,
            user_id: 1,
            food_item: "phở".to_string(),
            price: 35_000,
            meal_time: MealTime::Noon,
            kind: TransactionKind::Expense,
            account: BalanceAccount::Cash,
            date: NaiveDate::from_ymd_opt(2024, 10, 20).unwrap(),
            time: None,
            source: InterpretationSource::Llm,
            synced_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_append_url_encodes_sheet_name() {
        let dest = SheetsDestination::new("abc", "Chi tiêu", "t");
        let url = dest.append_url("Chi tiêu").unwrap();
        assert!(url
            .as_str()
            .starts_with("https://sheets.googleapis.com/v4/spreadsheets/abc/values/Chi%20ti%C3%AAu:append?"));
        assert!(url.as_str().contains("valueInputOption=USER_ENTERED"));
    }

    #[tokio::test]
    async fn test_push_transactions() {
        let recorded = Recorded::default();
        let base = start_server(recorded.clone()).await;
        let dest = SheetsDestination::new("sheet-123", "Chi tiêu", "test-token").with_base_url(&base);

        assert_eq!(dest.push_transactions(&[transaction()]).await.unwrap(), 1);

        let requests = recorded.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let (uri, body) = &requests[0];
        assert!(uri.starts_with("/v4/spreadsheets/sheet-123/values/"));
        assert_eq!(body["values"][0][0], 7);
        assert_eq!(body["values"][0][3], "phở");
        assert_eq!(body["values"][0][4], 35_000);
        assert_eq!(body["values"][0][5], "trưa");
    }

    #[tokio::test]
    async fn test_push_balance_and_connection() {
        let recorded = Recorded::default();
        let base = start_server(recorded.clone()).await;
        let dest = SheetsDestination::new("sheet-123", "Chi tiêu", "test-token").with_base_url(&base);

        dest.test_connection().await.unwrap();
        dest.push_balance(&Balance {
            cash: 200_000,
            bank_account: 1_000_000,
        })
        .await
        .unwrap();

        let requests = recorded.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].1["values"][0][3], 1_200_000);
    }

    #[tokio::test]
    async fn test_bad_token_is_sync_error() {
        let base = start_server(Recorded::default()).await;
        let dest = SheetsDestination::new("sheet-123", "Chi tiêu", "wrong").with_base_url(&base);

        let err = dest.test_connection().await.unwrap_err();
        assert!(matches!(err, Error::Sync(_)));
        assert!(err.to_string().contains("401"));
    }
}
