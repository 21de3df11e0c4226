// src/db/calendar_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::calendar::{month_id, CalendarEvent, CreateEventPayload, DaySlotRecord, MAX_SLOTS},
};

#[derive(Clone)]
pub struct CalendarRepository {
    pool: PgPool,
}

impl CalendarRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Lectura
    // ---

    pub async fn list_month_days(&self, month: &str) -> Result<Vec<DaySlotRecord>, AppError> {
        let days = sqlx::query_as::<_, DaySlotRecord>(
            r#"
            SELECT day, month_id, remaining_slots, is_holiday
            FROM day_slots
            WHERE month_id = $1
            ORDER BY day
            "#,
        )
        .bind(month)
        .fetch_all(&self.pool)
        .await?;
        Ok(days)
    }

    pub async fn list_month_events(&self, month: &str) -> Result<Vec<CalendarEvent>, AppError> {
        let events = sqlx::query_as::<_, CalendarEvent>(
            r#"
            SELECT id, day, title, kind, event_time, link, description, created_by, created_at
            FROM calendar_events
            WHERE month_id = $1
            ORDER BY day, event_time NULLS LAST, created_at
            "#,
        )
        .bind(month)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    pub async fn list_day_events(&self, day: NaiveDate) -> Result<Vec<CalendarEvent>, AppError> {
        let events = sqlx::query_as::<_, CalendarEvent>(
            r#"
            SELECT id, day, title, kind, event_time, link, description, created_by, created_at
            FROM calendar_events
            WHERE day = $1
            ORDER BY event_time NULLS LAST, created_at
            "#,
        )
        .bind(day)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    pub async fn find_day<'e, E>(
        &self,
        executor: E,
        day: NaiveDate,
    ) -> Result<Option<DaySlotRecord>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, DaySlotRecord>(
            "SELECT day, month_id, remaining_slots, is_holiday FROM day_slots WHERE day = $1",
        )
        .bind(day)
        .fetch_optional(executor)
        .await?;
        Ok(record)
    }

    // ---
    // Escritura (dentro de transacción)
    // ---

    /// Crea el día con los valores por defecto si aún no existe.
    pub async fn seed_day<'e, E>(&self, executor: E, day: NaiveDate) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO day_slots (day, month_id, remaining_slots, is_holiday)
            VALUES ($1, $2, $3, FALSE)
            ON CONFLICT (day) DO NOTHING
            "#,
        )
        .bind(day)
        .bind(month_id(day))
        .bind(MAX_SLOTS)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Lee el día bloqueando la fila hasta el fin de la transacción.
    pub async fn lock_day<'e, E>(
        &self,
        executor: E,
        day: NaiveDate,
    ) -> Result<Option<DaySlotRecord>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, DaySlotRecord>(
            r#"
            SELECT day, month_id, remaining_slots, is_holiday
            FROM day_slots
            WHERE day = $1
            FOR UPDATE
            "#,
        )
        .bind(day)
        .fetch_optional(executor)
        .await?;
        Ok(record)
    }

    pub async fn save_day<'e, E>(
        &self,
        executor: E,
        record: &DaySlotRecord,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO day_slots (day, month_id, remaining_slots, is_holiday, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (day)
            DO UPDATE SET remaining_slots = EXCLUDED.remaining_slots,
                          is_holiday = EXCLUDED.is_holiday,
                          updated_at = NOW()
            "#,
        )
        .bind(record.day)
        .bind(&record.month_id)
        .bind(record.remaining_slots)
        .bind(record.is_holiday)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn insert_event(
        &self,
        day: NaiveDate,
        payload: &CreateEventPayload,
        created_by: &str,
    ) -> Result<CalendarEvent, AppError> {
        let event = sqlx::query_as::<_, CalendarEvent>(
            r#"
            INSERT INTO calendar_events (day, month_id, title, kind, event_time, link, description, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, day, title, kind, event_time, link, description, created_by, created_at
            "#,
        )
        .bind(day)
        .bind(month_id(day))
        .bind(payload.title.trim())
        .bind(payload.kind)
        .bind(payload.time.as_deref())
        .bind(payload.link.as_deref())
        .bind(payload.description.as_deref())
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(event)
    }

    /// Devuelve el día del evento borrado, si existía.
    pub async fn delete_event(&self, id: Uuid) -> Result<Option<NaiveDate>, AppError> {
        let day: Option<(NaiveDate,)> =
            sqlx::query_as("DELETE FROM calendar_events WHERE id = $1 RETURNING day")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(day.map(|(d,)| d))
    }
}
