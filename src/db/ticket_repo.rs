// src/db/ticket_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::tickets::{Priority, Ticket, TicketScope, TicketStatus, TicketType},
};

const TICKET_COLUMNS: &str = "id, ticket_number, ticket_type, title, description, priority, status, \
     requested_by, requested_by_name, requested_by_department, assigned_to, comments, \
     created_at, updated_at, updated_by, resolved_at, resolution_time_hours, \
     labor_cost, equipment_cost, total_cost, location, stl_url, filament_used, print_time, \
     image_url, printed_by, printed_by_name";

// Filtro de alcance: $2 = solicitante, $3 = departamento (ambos NULL = todo)
const SCOPE_FILTER: &str = "($2::text IS NULL OR requested_by = $2 \
     OR ($3::uuid IS NOT NULL AND requested_by_department = $3))";

pub struct NewTicket<'a> {
    pub ticket_number: &'a str,
    pub ticket_type: TicketType,
    pub title: &'a str,
    pub description: &'a str,
    pub priority: Priority,
    pub status: TicketStatus,
    pub requested_by: &'a str,
    pub requested_by_name: &'a str,
    pub requested_by_department: Option<Uuid>,
    pub location: Option<&'a str>,
    pub stl_url: Option<&'a str>,
}

#[derive(Clone)]
pub struct TicketRepository {
    pool: PgPool,
}

impl TicketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Siguiente número del tipo. Atómico: dos altas simultáneas nunca comparten número.
    pub async fn next_number<'e, E>(&self, executor: E, ticket_type: TicketType) -> Result<i32, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (value,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO ticket_counters (ticket_type, last_value)
            VALUES ($1, 1)
            ON CONFLICT (ticket_type)
            DO UPDATE SET last_value = ticket_counters.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(ticket_type)
        .fetch_one(executor)
        .await?;
        Ok(value)
    }

    pub async fn insert<'e, E>(&self, executor: E, new: NewTicket<'_>) -> Result<Ticket, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ticket = sqlx::query_as::<_, Ticket>(&format!(
            r#"
            INSERT INTO tickets (
                ticket_number, ticket_type, title, description, priority, status,
                requested_by, requested_by_name, requested_by_department, location, stl_url
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            TICKET_COLUMNS
        ))
        .bind(new.ticket_number)
        .bind(new.ticket_type)
        .bind(new.title)
        .bind(new.description)
        .bind(new.priority)
        .bind(new.status)
        .bind(new.requested_by)
        .bind(new.requested_by_name)
        .bind(new.requested_by_department)
        .bind(new.location)
        .bind(new.stl_url)
        .fetch_one(executor)
        .await?;
        Ok(ticket)
    }

    /// Lee la petición bloqueándola para una actualización.
    pub async fn lock<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Ticket>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ticket = sqlx::query_as::<_, Ticket>(&format!(
            "SELECT {} FROM tickets WHERE id = $1 FOR UPDATE",
            TICKET_COLUMNS
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(ticket)
    }

    pub async fn find(
        &self,
        ticket_type: TicketType,
        id: Uuid,
        scope: &TicketScope,
    ) -> Result<Option<Ticket>, AppError> {
        let (requester, department) = scope.filter_params();
        let ticket = sqlx::query_as::<_, Ticket>(&format!(
            "SELECT {} FROM tickets WHERE ticket_type = $1 AND {} AND id = $4",
            TICKET_COLUMNS, SCOPE_FILTER
        ))
        .bind(ticket_type)
        .bind(requester)
        .bind(department)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ticket)
    }

    /// Peticiones visibles, las más recientes primero.
    pub async fn list(
        &self,
        ticket_type: TicketType,
        scope: &TicketScope,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Ticket>, AppError> {
        let (requester, department) = scope.filter_params();
        let tickets = sqlx::query_as::<_, Ticket>(&format!(
            r#"
            SELECT {}
            FROM tickets
            WHERE ticket_type = $1 AND {}
              AND ($4::timestamptz IS NULL OR created_at >= $4)
            ORDER BY created_at DESC
            "#,
            TICKET_COLUMNS, SCOPE_FILTER
        ))
        .bind(ticket_type)
        .bind(requester)
        .bind(department)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(tickets)
    }

    /// Abiertas o en curso dentro del alcance.
    pub async fn count_active(&self, ticket_type: TicketType, scope: &TicketScope) -> Result<i64, AppError> {
        let (requester, department) = scope.filter_params();
        let (count,): (i64,) = sqlx::query_as(&format!(
            r#"
            SELECT COUNT(*)
            FROM tickets
            WHERE ticket_type = $1 AND {}
              AND status IN ('abierto', 'en_progreso')
            "#,
            SCOPE_FILTER
        ))
        .bind(ticket_type)
        .bind(requester)
        .bind(department)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn list_open_requested_by(&self, uid: &str, limit: i64) -> Result<Vec<Ticket>, AppError> {
        let tickets = sqlx::query_as::<_, Ticket>(&format!(
            r#"
            SELECT {}
            FROM tickets
            WHERE requested_by = $1 AND status IN ('abierto', 'en_progreso')
            ORDER BY created_at DESC
            LIMIT $2
            "#,
            TICKET_COLUMNS
        ))
        .bind(uid)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(tickets)
    }

    /// Persiste los campos editables de una petición ya modificada en memoria.
    pub async fn save<'e, E>(&self, executor: E, ticket: &Ticket) -> Result<Ticket, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let saved = sqlx::query_as::<_, Ticket>(&format!(
            r#"
            UPDATE tickets
            SET status = $2, assigned_to = $3, comments = $4, updated_at = $5, updated_by = $6,
                resolved_at = $7, resolution_time_hours = $8, labor_cost = $9,
                equipment_cost = $10, total_cost = $11, filament_used = $12, print_time = $13,
                image_url = $14, printed_by = $15, printed_by_name = $16
            WHERE id = $1
            RETURNING {}
            "#,
            TICKET_COLUMNS
        ))
        .bind(ticket.id)
        .bind(ticket.status)
        .bind(ticket.assigned_to.as_deref())
        .bind(ticket.comments.as_deref())
        .bind(ticket.updated_at)
        .bind(ticket.updated_by.as_deref())
        .bind(ticket.resolved_at)
        .bind(ticket.resolution_time_hours)
        .bind(ticket.labor_cost)
        .bind(ticket.equipment_cost)
        .bind(ticket.total_cost)
        .bind(ticket.filament_used)
        .bind(ticket.print_time)
        .bind(ticket.image_url.as_deref())
        .bind(ticket.printed_by.as_deref())
        .bind(ticket.printed_by_name.as_deref())
        .fetch_one(executor)
        .await?;
        Ok(saved)
    }
}
