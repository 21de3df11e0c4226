// src/db/reservation_repo.rs

use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::reservations::{Cart, CartPayload, Reservation, ResourceKind},
};

const RESERVATION_COLUMNS: &str = "id, resource, reservation_date, slot_index, slot_label, \
                                   cart_id, title, user_id, user_name, created_at";

#[derive(Clone)]
pub struct ReservationRepository {
    pool: PgPool,
}

pub struct NewReservation<'a> {
    pub resource: ResourceKind,
    pub date: NaiveDate,
    pub slot_index: i16,
    pub slot_label: &'a str,
    pub cart_id: Option<Uuid>,
    pub title: &'a str,
    pub user_id: &'a str,
    pub user_name: &'a str,
}

impl ReservationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Reservas
    // ---

    pub async fn list_for_day(
        &self,
        resource: ResourceKind,
        date: NaiveDate,
        cart_id: Option<Uuid>,
    ) -> Result<Vec<Reservation>, AppError> {
        let reservations = sqlx::query_as::<_, Reservation>(&format!(
            r#"
            SELECT {}
            FROM reservations
            WHERE resource = $1 AND reservation_date = $2
              AND ($3::uuid IS NULL OR cart_id = $3)
            ORDER BY slot_index, created_at
            "#,
            RESERVATION_COLUMNS
        ))
        .bind(resource)
        .bind(date)
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reservations)
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<Reservation>, AppError> {
        let reservation = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {} FROM reservations WHERE id = $1",
            RESERVATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(reservation)
    }

    /// El índice único decide quién se queda la franja.
    pub async fn insert(&self, new: NewReservation<'_>) -> Result<Reservation, AppError> {
        sqlx::query_as::<_, Reservation>(&format!(
            r#"
            INSERT INTO reservations
                (resource, reservation_date, slot_index, slot_label, cart_id, title, user_id, user_name)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            RESERVATION_COLUMNS
        ))
        .bind(new.resource)
        .bind(new.date)
        .bind(new.slot_index)
        .bind(new.slot_label)
        .bind(new.cart_id)
        .bind(new.title)
        .bind(new.user_id)
        .bind(new.user_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation()
                    && db_err.constraint() == Some("uq_reservations_slot")
                {
                    return AppError::SlotTaken;
                }
            }
            e.into()
        })
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    // ---
    // Carros de portátiles
    // ---

    pub async fn list_carts(&self, only_active: bool) -> Result<Vec<Cart>, AppError> {
        let carts = sqlx::query_as::<_, Cart>(
            r#"
            SELECT id, name, location, description, active
            FROM carts
            WHERE active OR NOT $1
            ORDER BY name
            "#,
        )
        .bind(only_active)
        .fetch_all(&self.pool)
        .await?;
        Ok(carts)
    }

    pub async fn find_cart(&self, id: Uuid) -> Result<Option<Cart>, AppError> {
        let cart = sqlx::query_as::<_, Cart>(
            "SELECT id, name, location, description, active FROM carts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(cart)
    }

    pub async fn insert_cart(&self, payload: &CartPayload) -> Result<Cart, AppError> {
        let cart = sqlx::query_as::<_, Cart>(
            r#"
            INSERT INTO carts (name, location, description, active)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, location, description, active
            "#,
        )
        .bind(payload.name.trim())
        .bind(payload.location.trim())
        .bind(payload.description.as_deref())
        .bind(payload.active)
        .fetch_one(&self.pool)
        .await?;
        Ok(cart)
    }

    pub async fn update_cart(&self, id: Uuid, payload: &CartPayload) -> Result<Option<Cart>, AppError> {
        let cart = sqlx::query_as::<_, Cart>(
            r#"
            UPDATE carts
            SET name = $2, location = $3, description = $4, active = $5
            WHERE id = $1
            RETURNING id, name, location, description, active
            "#,
        )
        .bind(id)
        .bind(payload.name.trim())
        .bind(payload.location.trim())
        .bind(payload.description.as_deref())
        .bind(payload.active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(cart)
    }

    // Las reservas del carro caen con él (ON DELETE CASCADE)
    pub async fn delete_cart(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM carts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
