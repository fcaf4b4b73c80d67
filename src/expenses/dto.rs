use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::Expense;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateExpenseRequest {
    pub title: Option<String>,
    pub amount: Option<f64>,
    /// RFC 3339 timestamp or a plain `YYYY-MM-DD` date; defaults to now.
    pub date: Option<String>,
    pub description: Option<String>,
    pub receipt_url: Option<String>,
}

/// Raw query values; parsed in the service so bad input gets a JSON error.
#[derive(Debug, Default, Deserialize)]
pub struct MonthFilter {
    pub month: Option<String>,
    pub year: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusFilter {
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DecisionRequest {
    pub decision: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Creator {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Manager listing entry: the expense plus who filed it.
#[derive(Debug, Serialize)]
pub struct ExpenseWithCreator {
    #[serde(flatten)]
    pub expense: Expense,
    pub creator: Option<Creator>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTotal {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub total_amount: f64,
    pub count: i64,
}
