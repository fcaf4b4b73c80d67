use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{CreatorTotal, Expense, ExpenseRow, ExpenseStatus, NewExpense};
use crate::error::AppResult;

/// Half-open `[start, end)` interval on the expense date.
pub type DateRange = (OffsetDateTime, OffsetDateTime);

/// Expense storage. Listings are ordered by `date`, newest first.
#[async_trait]
pub trait ExpenseStore: Send + Sync {
    async fn create(&self, new_expense: NewExpense) -> AppResult<Expense>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Expense>>;

    async fn save(&self, expense: &Expense) -> AppResult<()>;

    async fn list_by_creator(
        &self,
        user_id: Uuid,
        range: Option<DateRange>,
    ) -> AppResult<Vec<Expense>>;

    async fn list_all(&self, status: Option<ExpenseStatus>) -> AppResult<Vec<Expense>>;

    async fn totals_by_creator(&self, status: ExpenseStatus) -> AppResult<Vec<CreatorTotal>>;
}

const EXPENSE_COLUMNS: &str = "id, title, amount, date, description, receipt_url, status, \
     created_by, approved_by, approved_at, created_at";

#[derive(Clone)]
pub struct PgExpenseStore {
    db: PgPool,
}

impl PgExpenseStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn into_expenses(rows: Vec<ExpenseRow>) -> AppResult<Vec<Expense>> {
    Ok(rows
        .into_iter()
        .map(Expense::try_from)
        .collect::<anyhow::Result<Vec<_>>>()?)
}

#[async_trait]
impl ExpenseStore for PgExpenseStore {
    async fn create(&self, e: NewExpense) -> AppResult<Expense> {
        let row = sqlx::query_as::<_, ExpenseRow>(&format!(
            r#"
            INSERT INTO expenses
                (id, title, amount, date, description, receipt_url, status, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {EXPENSE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&e.title)
        .bind(e.amount)
        .bind(e.date)
        .bind(&e.description)
        .bind(&e.receipt_url)
        .bind(ExpenseStatus::Pending.as_str())
        .bind(e.created_by)
        .fetch_one(&self.db)
        .await
        .context("insert expense")?;
        Ok(Expense::try_from(row)?)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Expense>> {
        let row = sqlx::query_as::<_, ExpenseRow>(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find expense")?;
        Ok(row.map(Expense::try_from).transpose()?)
    }

    async fn save(&self, e: &Expense) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE expenses
               SET title = $2, amount = $3, date = $4, description = $5, receipt_url = $6,
                   status = $7, approved_by = $8, approved_at = $9
             WHERE id = $1
            "#,
        )
        .bind(e.id)
        .bind(&e.title)
        .bind(e.amount)
        .bind(e.date)
        .bind(&e.description)
        .bind(&e.receipt_url)
        .bind(e.status.as_str())
        .bind(e.approved_by)
        .bind(e.approved_at)
        .execute(&self.db)
        .await
        .context("update expense")?;
        Ok(())
    }

    async fn list_by_creator(
        &self,
        user_id: Uuid,
        range: Option<DateRange>,
    ) -> AppResult<Vec<Expense>> {
        let (start, end) = range.unzip();
        let rows = sqlx::query_as::<_, ExpenseRow>(&format!(
            r#"
            SELECT {EXPENSE_COLUMNS}
              FROM expenses
             WHERE created_by = $1
               AND ($2::timestamptz IS NULL OR date >= $2)
               AND ($3::timestamptz IS NULL OR date < $3)
             ORDER BY date DESC
            "#
        ))
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await
        .context("list expenses by creator")?;
        into_expenses(rows)
    }

    async fn list_all(&self, status: Option<ExpenseStatus>) -> AppResult<Vec<Expense>> {
        let rows = sqlx::query_as::<_, ExpenseRow>(&format!(
            r#"
            SELECT {EXPENSE_COLUMNS}
              FROM expenses
             WHERE ($1::text IS NULL OR status = $1)
             ORDER BY date DESC
            "#
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.db)
        .await
        .context("list expenses")?;
        into_expenses(rows)
    }

    async fn totals_by_creator(&self, status: ExpenseStatus) -> AppResult<Vec<CreatorTotal>> {
        let rows = sqlx::query_as::<_, CreatorTotal>(
            r#"
            SELECT created_by, SUM(amount) AS total_amount, COUNT(*) AS count
              FROM expenses
             WHERE status = $1
             GROUP BY created_by
            "#,
        )
        .bind(status.as_str())
        .fetch_all(&self.db)
        .await
        .context("expense totals by creator")?;
        Ok(rows)
    }
}
