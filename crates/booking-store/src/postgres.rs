use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, postgres::PgRow};

use crate::{
    Booking, BookingId, BookingRecord, Conference, ConferenceId, EmailUniqueness, NewBooking,
    Result, StoreError,
    store::{BookingStore, StoreTransaction},
};

const CONFERENCE_COLUMNS: &str = "id, name, total_tickets, remaining_tickets, created_at";

/// PostgreSQL-backed booking store.
///
/// Bookings for one conference are serialized by `SELECT ... FOR UPDATE` on
/// the conference row; the schema's check constraint keeps
/// `remaining_tickets` within `0..=total_tickets` regardless of the caller.
#[derive(Clone)]
pub struct PostgresBookingStore {
    pool: PgPool,
    uniqueness: EmailUniqueness,
}

impl PostgresBookingStore {
    /// Creates a new PostgreSQL booking store.
    pub fn new(pool: PgPool, uniqueness: EmailUniqueness) -> Self {
        Self { pool, uniqueness }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations and installs the email uniqueness index
    /// matching this store's scope.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        sqlx::raw_sql(uniqueness_ddl(self.uniqueness))
            .execute(&self.pool)
            .await?;
        tracing::info!(uniqueness = %self.uniqueness, "booking schema ready");
        Ok(())
    }

    fn row_to_booking(row: &PgRow) -> Result<Booking> {
        Ok(Booking {
            id: BookingId::new(row.try_get("id")?),
            conference_id: ConferenceId::new(row.try_get("conference_id")?),
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            email: row.try_get("email")?,
            number_of_tickets: ticket_count(row.try_get("number_of_tickets")?)?,
            created_at: row.try_get("created_at")?,
        })
    }
}

fn row_to_conference(row: &PgRow) -> Result<Conference> {
    Ok(Conference {
        id: ConferenceId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        total_tickets: ticket_count(row.try_get("total_tickets")?)?,
        remaining_tickets: ticket_count(row.try_get("remaining_tickets")?)?,
        created_at: row.try_get("created_at")?,
    })
}

fn ticket_count(value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::InvalidRow(format!("ticket count {value}")))
}

/// DDL that leaves exactly the unique index for `scope` in place.
fn uniqueness_ddl(scope: EmailUniqueness) -> &'static str {
    match scope {
        EmailUniqueness::Global => {
            r#"
            DROP INDEX IF EXISTS bookings_conference_email_key;
            CREATE UNIQUE INDEX IF NOT EXISTS bookings_email_key ON bookings (email);
            "#
        }
        EmailUniqueness::PerConference => {
            r#"
            DROP INDEX IF EXISTS bookings_email_key;
            CREATE UNIQUE INDEX IF NOT EXISTS bookings_conference_email_key
                ON bookings (conference_id, email);
            "#
        }
        EmailUniqueness::None => {
            r#"
            DROP INDEX IF EXISTS bookings_email_key;
            DROP INDEX IF EXISTS bookings_conference_email_key;
            "#
        }
    }
}

#[async_trait]
impl BookingStore for PostgresBookingStore {
    type Transaction = PostgresTransaction;

    fn uniqueness(&self) -> EmailUniqueness {
        self.uniqueness
    }

    async fn begin(&self) -> Result<PostgresTransaction> {
        let tx = self.pool.begin().await?;
        Ok(PostgresTransaction { tx })
    }

    async fn get_conference(&self, id: ConferenceId) -> Result<Option<Conference>> {
        let row = sqlx::query(&format!(
            "SELECT {CONFERENCE_COLUMNS} FROM conferences WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_conference).transpose()
    }

    async fn find_conference_by_name(&self, name: &str) -> Result<Option<Conference>> {
        let row = sqlx::query(&format!(
            "SELECT {CONFERENCE_COLUMNS} FROM conferences WHERE name = $1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_conference).transpose()
    }

    async fn find_or_create_conference(
        &self,
        name: &str,
        total_tickets: u32,
    ) -> Result<(Conference, bool)> {
        let inserted = sqlx::query(&format!(
            r#"
            INSERT INTO conferences (name, total_tickets, remaining_tickets)
            VALUES ($1, $2, $2)
            ON CONFLICT (name) DO NOTHING
            RETURNING {CONFERENCE_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(i64::from(total_tickets))
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            return Ok((row_to_conference(&row)?, true));
        }

        let existing = self
            .find_conference_by_name(name)
            .await?
            .ok_or_else(|| StoreError::InvalidRow(format!("conference {name} vanished")))?;
        Ok((existing, false))
    }

    async fn list_bookings(&self) -> Result<Vec<BookingRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT b.id, b.conference_id, b.first_name, b.last_name, b.email,
                   b.number_of_tickets, b.created_at, c.name AS conference_name
            FROM bookings b
            JOIN conferences c ON c.id = b.conference_id
            ORDER BY b.id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(BookingRecord::new(
                    Self::row_to_booking(row)?,
                    row.try_get::<String, _>("conference_name")?,
                ))
            })
            .collect()
    }

    async fn bookings_for_conference(&self, id: ConferenceId) -> Result<Vec<Booking>> {
        let rows = sqlx::query(
            r#"
            SELECT id, conference_id, first_name, last_name, email, number_of_tickets, created_at
            FROM bookings
            WHERE conference_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_booking).collect()
    }
}

/// Transaction over a [`PostgresBookingStore`].
///
/// Rolls back automatically when dropped without committing.
pub struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn lock_conference(&mut self, id: ConferenceId) -> Result<Option<Conference>> {
        let row = sqlx::query(&format!(
            "SELECT {CONFERENCE_COLUMNS} FROM conferences WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_conference).transpose()
    }

    async fn insert_booking(&mut self, booking: NewBooking) -> Result<Booking> {
        let conference_id = booking.conference_id;
        let row = sqlx::query(
            r#"
            INSERT INTO bookings (conference_id, first_name, last_name, email, number_of_tickets)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, created_at
            "#,
        )
        .bind(conference_id.as_i64())
        .bind(&booking.first_name)
        .bind(&booking.last_name)
        .bind(&booking.email)
        .bind(i64::from(booking.number_of_tickets))
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return StoreError::ConferenceNotFound(conference_id);
            }
            StoreError::from(e)
        })?;

        Ok(Booking {
            id: BookingId::new(row.try_get("id")?),
            conference_id,
            first_name: booking.first_name,
            last_name: booking.last_name,
            email: booking.email,
            number_of_tickets: booking.number_of_tickets,
            created_at: row.try_get("created_at")?,
        })
    }

    async fn set_remaining_tickets(&mut self, id: ConferenceId, remaining: u32) -> Result<()> {
        let result = sqlx::query("UPDATE conferences SET remaining_tickets = $2 WHERE id = $1")
            .bind(id.as_i64())
            .bind(i64::from(remaining))
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ConferenceNotFound(id));
        }
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| StoreError::CommitFailed(e.to_string()))
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
