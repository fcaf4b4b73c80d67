use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ExpenseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseStatus::Pending => "pending",
            ExpenseStatus::Approved => "approved",
            ExpenseStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpenseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ExpenseStatus::Pending),
            "approved" => Ok(ExpenseStatus::Approved),
            "rejected" => Ok(ExpenseStatus::Rejected),
            other => Err(format!("Unknown status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: Uuid,
    pub title: String,
    pub amount: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub description: Option<String>,
    pub receipt_url: Option<String>,
    pub status: ExpenseStatus,
    pub created_by: Uuid,
    pub approved_by: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub approved_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewExpense {
    pub title: String,
    pub amount: f64,
    pub date: OffsetDateTime,
    pub description: Option<String>,
    pub receipt_url: Option<String>,
    pub created_by: Uuid,
}

/// Sum of one creator's expenses in a given status.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CreatorTotal {
    pub created_by: Uuid,
    pub total_amount: f64,
    pub count: i64,
}

#[derive(Debug, FromRow)]
pub struct ExpenseRow {
    pub id: Uuid,
    pub title: String,
    pub amount: f64,
    pub date: OffsetDateTime,
    pub description: Option<String>,
    pub receipt_url: Option<String>,
    pub status: String,
    pub created_by: Uuid,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl TryFrom<ExpenseRow> for Expense {
    type Error = anyhow::Error;

    fn try_from(r: ExpenseRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            title: r.title,
            amount: r.amount,
            date: r.date,
            description: r.description,
            receipt_url: r.receipt_url,
            status: r.status.parse().map_err(anyhow::Error::msg)?,
            created_by: r.created_by,
            approved_by: r.approved_by,
            approved_at: r.approved_at,
            created_at: r.created_at,
        })
    }
}
