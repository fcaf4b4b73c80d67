use std::collections::HashMap;

use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, Month,
    OffsetDateTime,
};
use tracing::info;
use uuid::Uuid;

use super::{
    dto::{CreateExpenseRequest, Creator, ExpenseWithCreator, MonthFilter, UserTotal},
    repo::DateRange,
    repo_types::{Expense, ExpenseStatus, NewExpense},
};
use crate::{
    auth::{claims::Identity, dto::present},
    error::{AppError, AppResult},
    state::AppState,
};

fn parse_date(raw: &str) -> AppResult<OffsetDateTime> {
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(ts);
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map(|d| d.midnight().assume_utc())
        .map_err(|_| AppError::validation("Invalid date"))
}

/// `[first day of month, first day of next month)` in UTC.
pub(crate) fn month_range(year: i32, month: u8) -> AppResult<DateRange> {
    let m = Month::try_from(month).map_err(|_| AppError::validation("Invalid month"))?;
    let start = Date::from_calendar_date(year, m, 1)
        .map_err(|_| AppError::validation("Invalid year"))?;
    let next_year = if m == Month::December { year + 1 } else { year };
    let end = Date::from_calendar_date(next_year, m.next(), 1)
        .map_err(|_| AppError::validation("Invalid year"))?;
    Ok((
        start.midnight().assume_utc(),
        end.midnight().assume_utc(),
    ))
}

fn parse_status(raw: &str) -> AppResult<ExpenseStatus> {
    raw.parse().map_err(AppError::Validation)
}

pub async fn create_expense(
    state: &AppState,
    identity: &Identity,
    req: CreateExpenseRequest,
) -> AppResult<Expense> {
    let title = present(req.title);
    let amount = req.amount.filter(|a| *a != 0.0);
    let (Some(title), Some(amount)) = (title, amount) else {
        return Err(AppError::validation("Title and amount required"));
    };
    let date = match present(req.date) {
        Some(raw) => parse_date(&raw)?,
        None => OffsetDateTime::now_utc(),
    };

    let expense = state
        .expenses
        .create(NewExpense {
            title,
            amount,
            date,
            description: req.description,
            receipt_url: req.receipt_url,
            created_by: identity.user_id,
        })
        .await?;
    info!(expense_id = %expense.id, user_id = %identity.user_id, "expense created");
    Ok(expense)
}

/// The caller's own expenses, optionally limited to one calendar month.
pub async fn list_mine(
    state: &AppState,
    identity: &Identity,
    filter: MonthFilter,
) -> AppResult<Vec<Expense>> {
    let range = match (present(filter.month), present(filter.year)) {
        (Some(month), Some(year)) => {
            let month = month
                .trim()
                .parse::<u8>()
                .map_err(|_| AppError::validation("Invalid month"))?;
            let year = year
                .trim()
                .parse::<i32>()
                .map_err(|_| AppError::validation("Invalid year"))?;
            Some(month_range(year, month)?)
        }
        _ => None,
    };
    state.expenses.list_by_creator(identity.user_id, range).await
}

async fn creators(
    state: &AppState,
    ids: Vec<Uuid>,
) -> AppResult<HashMap<Uuid, Creator>> {
    let mut out = HashMap::new();
    for id in ids {
        if out.contains_key(&id) {
            continue;
        }
        if let Some(u) = state.users.find_by_id(id).await? {
            out.insert(
                id,
                Creator {
                    id: u.id,
                    name: u.name,
                    email: u.email,
                },
            );
        }
    }
    Ok(out)
}

pub async fn list_all(
    state: &AppState,
    status: Option<String>,
) -> AppResult<Vec<ExpenseWithCreator>> {
    let status = present(status).map(|s| parse_status(&s)).transpose()?;
    let expenses = state.expenses.list_all(status).await?;
    let ids = expenses.iter().map(|e| e.created_by).collect();
    let people = creators(state, ids).await?;
    Ok(expenses
        .into_iter()
        .map(|expense| ExpenseWithCreator {
            creator: people.get(&expense.created_by).cloned(),
            expense,
        })
        .collect())
}

pub async fn decide(
    state: &AppState,
    manager: &Identity,
    id: Uuid,
    decision: Option<String>,
) -> AppResult<Expense> {
    let status = match present(decision).as_deref() {
        Some("approved") => ExpenseStatus::Approved,
        Some("rejected") => ExpenseStatus::Rejected,
        _ => return Err(AppError::validation("Invalid decision")),
    };

    let mut expense = state
        .expenses
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Expense not found".into()))?;

    expense.status = status;
    expense.approved_by = Some(manager.user_id);
    expense.approved_at = Some(OffsetDateTime::now_utc());
    state.expenses.save(&expense).await?;

    info!(expense_id = %id, manager_id = %manager.user_id, %status, "expense decided");
    Ok(expense)
}

/// Approved totals per creator. Creators that no longer resolve are dropped.
pub async fn totals_by_user(state: &AppState) -> AppResult<Vec<UserTotal>> {
    let totals = state
        .expenses
        .totals_by_creator(ExpenseStatus::Approved)
        .await?;
    let ids = totals.iter().map(|t| t.created_by).collect();
    let people = creators(state, ids).await?;
    Ok(totals
        .into_iter()
        .filter_map(|t| {
            people.get(&t.created_by).map(|c| UserTotal {
                user_id: c.id,
                name: c.name.clone(),
                email: c.email.clone(),
                total_amount: t.total_amount,
                count: t.count,
            })
        })
        .collect())
}
