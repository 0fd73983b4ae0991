//! Employee identifier allocation.
//!
//! The last issued number is kept in the `employee_id` counter. Allocation
//! skips numbers whose formatted id is already taken, so manually entered ids
//! never collide with generated ones.

use crate::{
    config::EmployeeIdScheme,
    entities::{Counter, Employee, counter, employee},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{PaginatorTrait, Set, prelude::*};

const EMPLOYEE_ID_COUNTER: &str = "employee_id";

/// Last issued number, 0 before the first allocation.
async fn last_issued<C>(db: &C) -> Result<u64>
where
    C: ConnectionTrait,
{
    let Some(row) = Counter::find_by_id(EMPLOYEE_ID_COUNTER).one(db).await? else {
        return Ok(0);
    };
    u64::try_from(row.last_value).map_err(|_| Error::Config {
        message: format!("Employee id counter is negative: {}", row.last_value),
    })
}

async fn store_last_issued<C>(db: &C, n: u64) -> Result<()>
where
    C: ConnectionTrait,
{
    let last_value = i64::try_from(n).map_err(|_| Error::Config {
        message: format!("Employee id counter overflow at {n}"),
    })?;
    let row = counter::ActiveModel {
        name: Set(EMPLOYEE_ID_COUNTER.to_string()),
        last_value: Set(last_value),
        updated_at: Set(Utc::now()),
    };
    if Counter::find_by_id(EMPLOYEE_ID_COUNTER).one(db).await?.is_some() {
        row.update(db).await?;
    } else {
        row.insert(db).await?;
    }
    Ok(())
}

/// Finds the first free `(number, id)` after the last issued number.
async fn next_free<C>(db: &C, scheme: &EmployeeIdScheme) -> Result<(u64, String)>
where
    C: ConnectionTrait,
{
    let mut n = last_issued(db).await? + 1;
    loop {
        let id = scheme.format(n);
        let taken = Employee::find()
            .filter(employee::Column::EmployeeId.eq(id.as_str()))
            .count(db)
            .await?;
        if taken == 0 {
            return Ok((n, id));
        }
        n += 1;
    }
}

/// Issues the next employee id. Call inside the transaction that inserts the
/// employee so the counter and the row commit together.
pub async fn allocate_employee_id<C>(db: &C, scheme: &EmployeeIdScheme) -> Result<String>
where
    C: ConnectionTrait,
{
    let (n, id) = next_free(db, scheme).await?;
    store_last_issued(db, n).await?;
    tracing::debug!("Allocated employee id {}", id);
    Ok(id)
}

/// The id the next allocation would return, without consuming it.
pub async fn preview_employee_id<C>(db: &C, scheme: &EmployeeIdScheme) -> Result<String>
where
    C: ConnectionTrait,
{
    Ok(next_free(db, scheme).await?.1)
}
