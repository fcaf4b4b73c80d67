use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::{DateRange, ExpenseStore};
use super::repo_types::{CreatorTotal, Expense, ExpenseStatus, NewExpense};
use crate::error::{AppError, AppResult};

/// In-memory expense store
#[derive(Default)]
pub struct MemoryExpenseStore {
    expenses: RwLock<HashMap<Uuid, Expense>>,
}

impl MemoryExpenseStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn select(&self, keep: impl Fn(&Expense) -> bool) -> AppResult<Vec<Expense>> {
        let expenses = self.expenses.read().map_err(|_| poisoned())?;
        let mut out: Vec<Expense> = expenses.values().filter(|e| keep(e)).cloned().collect();
        out.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(out)
    }
}

fn poisoned() -> AppError {
    AppError::Internal(anyhow::anyhow!("expense store lock poisoned"))
}

#[async_trait]
impl ExpenseStore for MemoryExpenseStore {
    async fn create(&self, e: NewExpense) -> AppResult<Expense> {
        let expense = Expense {
            id: Uuid::new_v4(),
            title: e.title,
            amount: e.amount,
            date: e.date,
            description: e.description,
            receipt_url: e.receipt_url,
            status: ExpenseStatus::Pending,
            created_by: e.created_by,
            approved_by: None,
            approved_at: None,
            created_at: OffsetDateTime::now_utc(),
        };
        self.expenses
            .write()
            .map_err(|_| poisoned())?
            .insert(expense.id, expense.clone());
        Ok(expense)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Expense>> {
        Ok(self.expenses.read().map_err(|_| poisoned())?.get(&id).cloned())
    }

    async fn save(&self, expense: &Expense) -> AppResult<()> {
        self.expenses
            .write()
            .map_err(|_| poisoned())?
            .insert(expense.id, expense.clone());
        Ok(())
    }

    async fn list_by_creator(
        &self,
        user_id: Uuid,
        range: Option<DateRange>,
    ) -> AppResult<Vec<Expense>> {
        self.select(|e| {
            e.created_by == user_id
                && range.map_or(true, |(start, end)| e.date >= start && e.date < end)
        })
    }

    async fn list_all(&self, status: Option<ExpenseStatus>) -> AppResult<Vec<Expense>> {
        self.select(|e| status.map_or(true, |s| e.status == s))
    }

    async fn totals_by_creator(&self, status: ExpenseStatus) -> AppResult<Vec<CreatorTotal>> {
        let expenses = self.expenses.read().map_err(|_| poisoned())?;
        let mut totals: HashMap<Uuid, CreatorTotal> = HashMap::new();
        for e in expenses.values().filter(|e| e.status == status) {
            let t = totals.entry(e.created_by).or_insert(CreatorTotal {
                created_by: e.created_by,
                total_amount: 0.0,
                count: 0,
            });
            t.total_amount += e.amount;
            t.count += 1;
        }
        Ok(totals.into_values().collect())
    }
}
