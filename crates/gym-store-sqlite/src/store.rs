//! [`SqliteStore`]: the SQLite implementation of the gym store traits.

use std::path::Path;

use rusqlite::OptionalExtension as _;

use gym_core::{
  person::{NewPerson, Person},
  plan::{NewPlan, Plan},
  status::Status,
  store::{
    PersonStore, PlanStore, Reference, StoreError, StoreResult, SubscriptionStore,
  },
  subscription::Subscription,
};

use crate::{
  Error, Result,
  encode::{
    RawSubscription, SUBSCRIPTION_COLUMNS, encode_date, encode_status, person_from_row,
    plan_from_row,
  },
  error::is_foreign_key_violation,
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A gym store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a query yielding subscription rows and decode them.
  async fn query_subscriptions(
    &self,
    sql: String,
    param: Option<String>,
  ) -> StoreResult<Vec<Subscription>> {
    let raws: Vec<RawSubscription> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = match param {
          Some(p) => stmt
            .query_map(rusqlite::params![p], RawSubscription::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
          None => stmt
            .query_map([], RawSubscription::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
        };
        Ok(rows)
      })
      .await
      .map_err(Error::from)?;

    Ok(
      raws
        .into_iter()
        .map(RawSubscription::into_subscription)
        .collect::<Result<Vec<_>>>()?,
    )
  }
}

// ─── SubscriptionStore impl ──────────────────────────────────────────────────

impl SubscriptionStore for SqliteStore {
  async fn save_subscription(&self, record: Subscription) -> StoreResult<String> {
    let start_str  = encode_date(record.start_date);
    let end_str    = encode_date(record.end_date);
    let status_str = encode_status(record.status);
    let Subscription { number, owner_id, plan_id, .. } = record;

    // `Err(reference)` inside `Ok` names the parent row a foreign-key
    // failure was caused by.
    let outcome: std::result::Result<String, Reference> = self
      .conn
      .call(move |conn| {
        let inserted = conn.execute(
          "INSERT INTO person_subscriptions
             (number, person_id, plan_id, start_date, end_date, status)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![number, owner_id, plan_id, start_str, end_str, status_str],
        );
        match inserted {
          Ok(_) => Ok(Ok(number)),
          Err(e) if is_foreign_key_violation(&e) => {
            let owner_exists = conn
              .query_row(
                "SELECT 1 FROM people WHERE id = ?1",
                rusqlite::params![owner_id],
                |_| Ok(()),
              )
              .optional()?
              .is_some();
            Ok(Err(if owner_exists { Reference::Plan } else { Reference::Owner }))
          }
          Err(e) => Err(e.into()),
        }
      })
      .await
      .map_err(Error::from)?;

    outcome.map_err(StoreError::MissingReference)
  }

  async fn get_subscription(&self, number: &str) -> StoreResult<Option<Subscription>> {
    let number = number.to_owned();

    let raw: Option<RawSubscription> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {SUBSCRIPTION_COLUMNS} FROM person_subscriptions ps WHERE ps.number = ?1"
              ),
              rusqlite::params![number],
              RawSubscription::from_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(Error::from)?;

    Ok(raw.map(RawSubscription::into_subscription).transpose()?)
  }

  async fn list_subscriptions(&self) -> StoreResult<Vec<Subscription>> {
    self
      .query_subscriptions(
        format!("SELECT {SUBSCRIPTION_COLUMNS} FROM person_subscriptions ps ORDER BY ps.number"),
        None,
      )
      .await
  }

  async fn find_subscriptions_by_owner_name(
    &self,
    name: &str,
  ) -> StoreResult<Vec<Subscription>> {
    self
      .query_subscriptions(
        format!(
          "SELECT {SUBSCRIPTION_COLUMNS}
           FROM person_subscriptions ps
           JOIN people p ON p.id = ps.person_id
           WHERE p.full_name = ?1
           ORDER BY ps.number"
        ),
        Some(name.to_owned()),
      )
      .await
  }

  async fn delete_subscription(&self, number: &str) -> StoreResult<u64> {
    let number = number.to_owned();

    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM person_subscriptions WHERE number = ?1",
          rusqlite::params![number],
        )?)
      })
      .await
      .map_err(Error::from)?;

    Ok(affected as u64)
  }

  async fn update_subscription_status(
    &self,
    number: &str,
    status: Status,
  ) -> StoreResult<u64> {
    let number     = number.to_owned();
    let status_str = encode_status(status);

    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE person_subscriptions SET status = ?1 WHERE number = ?2",
          rusqlite::params![status_str, number],
        )?)
      })
      .await
      .map_err(Error::from)?;

    Ok(affected as u64)
  }
}

// ─── PersonStore impl ────────────────────────────────────────────────────────

impl PersonStore for SqliteStore {
  async fn add_person(&self, input: NewPerson) -> StoreResult<Person> {
    let person = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO people (full_name, phone) VALUES (?1, ?2)",
          rusqlite::params![input.full_name, input.phone],
        )?;
        Ok(Person {
          id:        conn.last_insert_rowid(),
          full_name: input.full_name,
          phone:     input.phone,
        })
      })
      .await
      .map_err(Error::from)?;

    Ok(person)
  }

  async fn list_people(&self) -> StoreResult<Vec<Person>> {
    let people = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT id, full_name, phone FROM people ORDER BY id")?;
        let rows = stmt
          .query_map([], person_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(Error::from)?;

    Ok(people)
  }

  async fn find_person_by_name(&self, name: &str) -> StoreResult<Option<Person>> {
    let name = name.to_owned();

    let person = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT id, full_name, phone FROM people WHERE full_name = ?1 ORDER BY id LIMIT 1",
              rusqlite::params![name],
              person_from_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(Error::from)?;

    Ok(person)
  }

  async fn update_person(&self, id: i64, input: NewPerson) -> StoreResult<Option<Person>> {
    let affected = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE people SET full_name = ?1, phone = ?2 WHERE id = ?3",
          rusqlite::params![input.full_name, input.phone, id],
        )?;
        Ok((n, input))
      })
      .await
      .map_err(Error::from)?;

    Ok(match affected {
      (0, _) => None,
      (_, input) => Some(Person { id, full_name: input.full_name, phone: input.phone }),
    })
  }

  async fn delete_person(&self, id: i64) -> StoreResult<u64> {
    delete_by_id(&self.conn, "DELETE FROM people WHERE id = ?1", id).await
  }
}

// ─── PlanStore impl ──────────────────────────────────────────────────────────

impl PlanStore for SqliteStore {
  async fn add_plan(&self, input: NewPlan) -> StoreResult<Plan> {
    let plan = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO plans (title, price, duration_days, freeze_days)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![input.title, input.price, input.duration_days, input.freeze_days],
        )?;
        Ok(Plan {
          id:            conn.last_insert_rowid(),
          title:         input.title,
          price:         input.price,
          duration_days: input.duration_days,
          freeze_days:   input.freeze_days,
        })
      })
      .await
      .map_err(Error::from)?;

    Ok(plan)
  }

  async fn list_plans(&self) -> StoreResult<Vec<Plan>> {
    let plans = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT id, title, price, duration_days, freeze_days FROM plans ORDER BY id",
        )?;
        let rows = stmt
          .query_map([], plan_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(Error::from)?;

    Ok(plans)
  }

  async fn update_plan(&self, id: i64, input: NewPlan) -> StoreResult<Option<Plan>> {
    let affected = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE plans SET title = ?1, price = ?2, duration_days = ?3, freeze_days = ?4
           WHERE id = ?5",
          rusqlite::params![
            input.title,
            input.price,
            input.duration_days,
            input.freeze_days,
            id,
          ],
        )?;
        Ok((n, input))
      })
      .await
      .map_err(Error::from)?;

    Ok(match affected {
      (0, _) => None,
      (_, input) => Some(Plan {
        id,
        title: input.title,
        price: input.price,
        duration_days: input.duration_days,
        freeze_days: input.freeze_days,
      }),
    })
  }

  async fn delete_plan(&self, id: i64) -> StoreResult<u64> {
    delete_by_id(&self.conn, "DELETE FROM plans WHERE id = ?1", id).await
  }
}

/// Delete one row by integer id. A foreign-key failure means subscriptions
/// still point at the row.
async fn delete_by_id(
  conn: &tokio_rusqlite::Connection,
  sql: &'static str,
  id: i64,
) -> StoreResult<u64> {
  let outcome: Option<usize> = conn
    .call(move |conn| match conn.execute(sql, rusqlite::params![id]) {
      Ok(n) => Ok(Some(n)),
      Err(e) if is_foreign_key_violation(&e) => Ok(None),
      Err(e) => Err(e.into()),
    })
    .await
    .map_err(Error::from)?;

  outcome.map(|n| n as u64).ok_or(StoreError::StillReferenced)
}
