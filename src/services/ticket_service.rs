// src/services/ticket_service.rs

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ticket_repo::NewTicket, DepartmentRepository, TicketRepository, UserRepository},
    models::{
        auth::{Principal, RoleTag},
        tickets::{
            CreateTicketPayload, Ticket, TicketScope, TicketStats, TicketStatus, TicketType,
            UpdateTicketPayload,
        },
    },
    services::visibility::Permissions,
};

pub const NO_DEPARTMENT: &str = "Sin departamento";

// ---
// Reglas puras del ciclo de vida
// ---

pub fn initial_status(ticket_type: TicketType) -> TicketStatus {
    match ticket_type {
        TicketType::Maintenance => TicketStatus::PendingValidation,
        _ => TicketStatus::Open,
    }
}

pub fn format_ticket_number(ticket_type: TicketType, n: i32) -> String {
    format!("{}-{:03}", ticket_type.prefix(), n)
}

/// Transición por edición normal. Validar o rechazar va por `decide_validation`.
pub fn check_transition(from: TicketStatus, to: TicketStatus) -> Result<(), AppError> {
    use TicketStatus::*;

    if from == to {
        return Ok(());
    }
    match (from, to) {
        (PendingValidation | Rejected, _) | (_, PendingValidation | Rejected) => {
            Err(AppError::ValidationFailed(format!(
                "transición no permitida: {} → {}",
                from.as_str(),
                to.as_str()
            )))
        }
        _ => Ok(()),
    }
}

fn round(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Se calcula una sola vez, al pasar por primera vez a resuelto o cerrado.
pub fn apply_resolution(ticket: &mut Ticket, now: DateTime<Utc>, hourly_rate: Decimal) {
    if !ticket.status.is_finished() || ticket.resolved_at.is_some() {
        return;
    }

    let elapsed_secs = (now - ticket.created_at).num_seconds().max(0);
    let hours = round(Decimal::from(elapsed_secs) / Decimal::from(3600), 1);

    ticket.resolved_at = Some(now);
    ticket.resolution_time_hours = Some(hours);

    if ticket.ticket_type == TicketType::Tic {
        let labor = round(hours * hourly_rate, 2);
        let equipment = ticket.equipment_cost.unwrap_or(Decimal::ZERO);
        ticket.labor_cost = Some(labor);
        ticket.total_cost = Some(labor + equipment);
    }
}

/// Aplica una edición del equipo gestor sobre la petición.
pub fn apply_update(
    mut ticket: Ticket,
    payload: &UpdateTicketPayload,
    editor: &Principal,
    now: DateTime<Utc>,
    hourly_rate: Decimal,
) -> Result<Ticket, AppError> {
    if ticket.ticket_type == TicketType::Maintenance
        && matches!(ticket.status, TicketStatus::PendingValidation | TicketStatus::Rejected)
    {
        return Err(AppError::ValidationFailed(
            "la petición aún no está validada por dirección".into(),
        ));
    }

    // 1. Campos propios de cada tipo
    if let Some(assigned_to) = &payload.assigned_to {
        ticket.assigned_to = Some(assigned_to.clone());
    }
    match ticket.ticket_type {
        TicketType::Tic => {
            if let Some(cost) = payload.equipment_cost {
                ticket.equipment_cost = Some(cost);
            }
            if let Some(comments) = &payload.comments {
                ticket.comments = Some(comments.clone());
            }
        }
        TicketType::Maintenance => {
            if let Some(cost) = payload.total_cost {
                ticket.total_cost = Some(cost);
            }
            if let Some(comments) = &payload.comments {
                ticket.comments = Some(comments.clone());
            }
        }
        TicketType::ThreeD => {
            let touched = payload.filament_used.is_some()
                || payload.print_time.is_some()
                || payload.image_url.is_some();
            if let Some(filament) = payload.filament_used {
                ticket.filament_used = Some(filament);
            }
            if let Some(print_time) = payload.print_time {
                ticket.print_time = Some(print_time);
            }
            if let Some(image_url) = &payload.image_url {
                ticket.image_url = Some(image_url.clone());
            }
            if touched {
                ticket.printed_by = Some(editor.uid.clone());
                ticket.printed_by_name = Some(editor.name());
            }
        }
    }

    // 2. Estado y resolución
    if let Some(to) = payload.status {
        check_transition(ticket.status, to)?;
        ticket.status = to;
        apply_resolution(&mut ticket, now, hourly_rate);
    }

    ticket.updated_at = now;
    ticket.updated_by = Some(editor.uid.clone());
    Ok(ticket)
}

/// Validación de dirección para mantenimiento: a abierto o a rechazado.
pub fn decide_validation(
    mut ticket: Ticket,
    approve: bool,
    editor: &Principal,
    now: DateTime<Utc>,
) -> Result<Ticket, AppError> {
    if ticket.ticket_type != TicketType::Maintenance {
        return Err(AppError::ValidationFailed("solo mantenimiento requiere validación".into()));
    }
    if ticket.status != TicketStatus::PendingValidation {
        return Err(AppError::ValidationFailed(format!(
            "la petición {} ya no está pendiente",
            ticket.ticket_number
        )));
    }

    ticket.status = if approve { TicketStatus::Open } else { TicketStatus::Rejected };
    ticket.updated_at = now;
    ticket.updated_by = Some(editor.uid.clone());
    Ok(ticket)
}

// ---
// Curso escolar e informes
// ---

/// El curso empieza el 1 de septiembre.
pub fn school_year_start(day: NaiveDate) -> NaiveDate {
    let year = if day.month() >= 9 { day.year() } else { day.year() - 1 };
    NaiveDate::from_ymd_opt(year, 9, 1).unwrap_or(day)
}

pub fn school_year_label(day: NaiveDate) -> String {
    let start = school_year_start(day).year();
    format!("{}-{}", start, start + 1)
}

pub fn compute_stats(
    tickets: &[Ticket],
    department_names: &HashMap<Uuid, String>,
    school_year: String,
) -> TicketStats {
    let mut by_status: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_department: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_cost = Decimal::ZERO;
    let mut resolution_hours = Vec::new();

    for ticket in tickets {
        *by_status.entry(ticket.status.as_str().to_string()).or_default() += 1;

        let department = ticket
            .requested_by_department
            .and_then(|id| department_names.get(&id).cloned())
            .unwrap_or_else(|| NO_DEPARTMENT.to_string());
        *by_department.entry(department).or_default() += 1;

        total_cost += ticket.total_cost.unwrap_or(Decimal::ZERO);
        if let Some(hours) = ticket.resolution_time_hours {
            resolution_hours.push(hours);
        }
    }

    let count = |statuses: &[TicketStatus]| {
        tickets.iter().filter(|t| statuses.contains(&t.status)).count()
    };

    let avg_resolution_hours = (!resolution_hours.is_empty()).then(|| {
        let sum: Decimal = resolution_hours.iter().copied().sum();
        round(sum / Decimal::from(resolution_hours.len()), 1)
    });

    TicketStats {
        school_year,
        total: tickets.len(),
        open: count(&[
            TicketStatus::Open,
            TicketStatus::InProgress,
            TicketStatus::PendingValidation,
        ]),
        resolved: count(&[TicketStatus::Resolved, TicketStatus::Closed]),
        by_status,
        avg_resolution_hours,
        total_cost,
        by_department,
    }
}

#[derive(Clone)]
pub struct TicketService {
    pool: PgPool,
    ticket_repo: TicketRepository,
    department_repo: DepartmentRepository,
    user_repo: UserRepository,
    hourly_rate: Decimal,
}

impl TicketService {
    pub fn new(
        pool: PgPool,
        ticket_repo: TicketRepository,
        department_repo: DepartmentRepository,
        user_repo: UserRepository,
        hourly_rate: Decimal,
    ) -> Self {
        Self { pool, ticket_repo, department_repo, user_repo, hourly_rate }
    }

    pub async fn create(
        &self,
        ticket_type: TicketType,
        payload: &CreateTicketPayload,
        requester: &Principal,
    ) -> Result<Ticket, AppError> {
        // 1. Mantenimiento puede registrar la petición en nombre de otra persona
        let on_behalf;
        let requester = match payload.on_behalf_of.as_deref() {
            Some(email) => {
                let allowed = ticket_type == TicketType::Maintenance
                    && (requester.is_admin || requester.has_role(RoleTag::EquipoMantenimiento));
                if !allowed {
                    return Err(AppError::Forbidden);
                }
                on_behalf = self
                    .user_repo
                    .find_by_email(email)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("usuario {}", email)))?;
                &on_behalf
            }
            None => requester,
        };

        let location = payload
            .location
            .as_deref()
            .filter(|_| ticket_type == TicketType::Maintenance);
        let stl_url = payload
            .stl_url
            .as_deref()
            .filter(|_| ticket_type == TicketType::ThreeD);

        // 2. Número y alta en la misma transacción
        let mut tx = self.pool.begin().await?;

        let n = self.ticket_repo.next_number(&mut *tx, ticket_type).await?;
        let ticket_number = format_ticket_number(ticket_type, n);
        let requester_name = requester.name();

        let ticket = self
            .ticket_repo
            .insert(
                &mut *tx,
                NewTicket {
                    ticket_number: &ticket_number,
                    ticket_type,
                    title: payload.title.trim(),
                    description: payload.description.trim(),
                    priority: payload.priority,
                    status: initial_status(ticket_type),
                    requested_by: &requester.uid,
                    requested_by_name: &requester_name,
                    requested_by_department: requester.department_id,
                    location,
                    stl_url,
                },
            )
            .await?;

        tx.commit().await?;

        tracing::info!("🎫 Petición {} creada por {}", ticket.ticket_number, requester.email);
        Ok(ticket)
    }

    pub async fn list(&self, ticket_type: TicketType, principal: &Principal) -> Result<Vec<Ticket>, AppError> {
        let scope = TicketScope::for_principal(ticket_type, principal);
        self.ticket_repo.list(ticket_type, &scope, None).await
    }

    pub async fn get(
        &self,
        ticket_type: TicketType,
        id: Uuid,
        principal: &Principal,
    ) -> Result<Ticket, AppError> {
        let scope = TicketScope::for_principal(ticket_type, principal);
        self.ticket_repo
            .find(ticket_type, id, &scope)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("petición {}", id)))
    }

    pub async fn update(
        &self,
        ticket_type: TicketType,
        id: Uuid,
        payload: &UpdateTicketPayload,
        editor: &Principal,
    ) -> Result<Ticket, AppError> {
        if !Permissions::for_principal(editor).can_manage_tickets(ticket_type) {
            return Err(AppError::Forbidden);
        }

        let mut tx = self.pool.begin().await?;

        let current = self.lock_of_type(&mut tx, ticket_type, id).await?;
        let previous_status = current.status;
        let updated = apply_update(current, payload, editor, Utc::now(), self.hourly_rate)?;
        let saved = self.ticket_repo.save(&mut *tx, &updated).await?;

        tx.commit().await?;

        if saved.status != previous_status {
            tracing::info!(
                "🎫 {}: {} → {}",
                saved.ticket_number,
                previous_status.as_str(),
                saved.status.as_str()
            );
        }
        Ok(saved)
    }

    pub async fn decide(
        &self,
        ticket_type: TicketType,
        id: Uuid,
        approve: bool,
        editor: &Principal,
    ) -> Result<Ticket, AppError> {
        if !Permissions::for_principal(editor).can_approve_maintenance {
            return Err(AppError::Forbidden);
        }

        let mut tx = self.pool.begin().await?;

        let current = self.lock_of_type(&mut tx, ticket_type, id).await?;
        let decided = decide_validation(current, approve, editor, Utc::now())?;
        let saved = self.ticket_repo.save(&mut *tx, &decided).await?;

        tx.commit().await?;

        tracing::info!("🎫 {} {}", saved.ticket_number, if approve { "validada" } else { "rechazada" });
        Ok(saved)
    }

    /// Informe del curso escolar en curso, dentro del alcance del usuario.
    pub async fn stats(
        &self,
        ticket_type: TicketType,
        principal: &Principal,
        today: NaiveDate,
    ) -> Result<TicketStats, AppError> {
        let scope = TicketScope::for_principal(ticket_type, principal);
        let start = school_year_start(today);
        let since = start
            .and_hms_opt(0, 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive));

        let tickets = self.ticket_repo.list(ticket_type, &scope, since).await?;
        let names = self.department_repo.names().await?;
        Ok(compute_stats(&tickets, &names, school_year_label(today)))
    }

    pub async fn count_active(&self, ticket_type: TicketType, principal: &Principal) -> Result<i64, AppError> {
        let scope = TicketScope::for_principal(ticket_type, principal);
        self.ticket_repo.count_active(ticket_type, &scope).await
    }

    pub async fn my_open_tickets(&self, principal: &Principal, limit: i64) -> Result<Vec<Ticket>, AppError> {
        self.ticket_repo.list_open_requested_by(&principal.uid, limit).await
    }

    async fn lock_of_type(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        ticket_type: TicketType,
        id: Uuid,
    ) -> Result<Ticket, AppError> {
        self.ticket_repo
            .lock(&mut **tx, id)
            .await?
            .filter(|t| t.ticket_type == ticket_type)
            .ok_or_else(|| AppError::NotFound(format!("petición {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::BTreeSet;

    fn principal(uid: &str, roles: &[RoleTag], is_admin: bool, department_id: Option<Uuid>) -> Principal {
        Principal {
            uid: uid.into(),
            email: format!("{}@iesamachado.org", uid),
            display_name: None,
            is_admin,
            roles: roles.iter().copied().collect::<BTreeSet<_>>(),
            department_id,
        }
    }

    fn ticket(ticket_type: TicketType, status: TicketStatus, created_at: DateTime<Utc>) -> Ticket {
        Ticket {
            id: Uuid::new_v4(),
            ticket_number: format_ticket_number(ticket_type, 1),
            ticket_type,
            title: "Proyector".into(),
            description: "No enciende".into(),
            priority: Default::default(),
            status,
            requested_by: "ana".into(),
            requested_by_name: "ana".into(),
            requested_by_department: None,
            assigned_to: None,
            comments: None,
            created_at,
            updated_at: created_at,
            updated_by: None,
            resolved_at: None,
            resolution_time_hours: None,
            labor_cost: None,
            equipment_cost: None,
            total_cost: None,
            location: None,
            stl_url: None,
            filament_used: None,
            print_time: None,
            image_url: None,
            printed_by: None,
            printed_by_name: None,
        }
    }

    #[test]
    fn ticket_numbers_are_prefixed_and_padded() {
        assert_eq!(format_ticket_number(TicketType::Tic, 1), "TIC-001");
        assert_eq!(format_ticket_number(TicketType::Maintenance, 42), "MNT-042");
        assert_eq!(format_ticket_number(TicketType::ThreeD, 1234), "3D-1234");
    }

    #[test]
    fn maintenance_starts_pending() {
        assert_eq!(initial_status(TicketType::Maintenance), TicketStatus::PendingValidation);
        assert_eq!(initial_status(TicketType::Tic), TicketStatus::Open);
        assert_eq!(initial_status(TicketType::ThreeD), TicketStatus::Open);
    }

    #[test]
    fn work_states_move_freely() {
        use TicketStatus::*;
        for from in [Open, InProgress, Resolved, Closed] {
            for to in [Open, InProgress, Resolved, Closed] {
                assert!(check_transition(from, to).is_ok(), "{:?} → {:?}", from, to);
            }
        }
        assert!(check_transition(PendingValidation, Open).is_err());
        assert!(check_transition(Rejected, Open).is_err());
        assert!(check_transition(Open, Rejected).is_err());
        assert!(check_transition(Open, PendingValidation).is_err());
    }

    #[test]
    fn tic_resolution_computes_hours_and_labor() {
        let created = Utc::now() - Duration::hours(5);
        let now = created + Duration::hours(3);
        let editor = principal("tic", &[RoleTag::EquipoTic], false, None);

        let payload = UpdateTicketPayload { status: Some(TicketStatus::Resolved), ..Default::default() };
        let resolved = apply_update(
            ticket(TicketType::Tic, TicketStatus::Open, created),
            &payload,
            &editor,
            now,
            Decimal::from(20),
        )
        .unwrap();

        assert_eq!(resolved.status, TicketStatus::Resolved);
        assert_eq!(resolved.resolved_at, Some(now));
        assert_eq!(resolved.resolution_time_hours, Some(Decimal::new(30, 1)));
        assert_eq!(resolved.labor_cost, Some(Decimal::new(6000, 2)));
        assert_eq!(resolved.total_cost, Some(Decimal::new(6000, 2)));
        assert_eq!(resolved.updated_by.as_deref(), Some("tic"));
    }

    #[test]
    fn equipment_cost_is_added_to_labor() {
        let created = Utc::now();
        let now = created + Duration::minutes(90);
        let editor = principal("tic", &[RoleTag::EquipoTic], false, None);

        let payload = UpdateTicketPayload {
            status: Some(TicketStatus::Closed),
            equipment_cost: Some(Decimal::new(1550, 2)),
            ..Default::default()
        };
        let closed = apply_update(
            ticket(TicketType::Tic, TicketStatus::InProgress, created),
            &payload,
            &editor,
            now,
            Decimal::from(20),
        )
        .unwrap();

        assert_eq!(closed.resolution_time_hours, Some(Decimal::new(15, 1)));
        assert_eq!(closed.labor_cost, Some(Decimal::from(30)));
        assert_eq!(closed.total_cost, Some(Decimal::new(4550, 2)));
    }

    #[test]
    fn resolution_is_computed_only_once() {
        let created = Utc::now();
        let first = created + Duration::hours(2);
        let mut t = ticket(TicketType::Tic, TicketStatus::Resolved, created);
        apply_resolution(&mut t, first, Decimal::from(20));

        // Reabierta y cerrada de nuevo: no se recalcula nada
        t.status = TicketStatus::Closed;
        apply_resolution(&mut t, first + Duration::hours(10), Decimal::from(20));

        assert_eq!(t.resolved_at, Some(first));
        assert_eq!(t.resolution_time_hours, Some(Decimal::new(20, 1)));
        assert_eq!(t.labor_cost, Some(Decimal::from(40)));
    }

    #[test]
    fn maintenance_resolution_has_no_labor_cost() {
        let created = Utc::now();
        let mut t = ticket(TicketType::Maintenance, TicketStatus::Resolved, created);
        apply_resolution(&mut t, created + Duration::hours(1), Decimal::from(20));
        assert_eq!(t.resolution_time_hours, Some(Decimal::new(10, 1)));
        assert_eq!(t.labor_cost, None);
        assert_eq!(t.total_cost, None);
    }

    #[test]
    fn pending_maintenance_cannot_be_edited() {
        let editor = principal("mnt", &[RoleTag::EquipoMantenimiento], false, None);
        let payload = UpdateTicketPayload { comments: Some("revisado".into()), ..Default::default() };
        let result = apply_update(
            ticket(TicketType::Maintenance, TicketStatus::PendingValidation, Utc::now()),
            &payload,
            &editor,
            Utc::now(),
            Decimal::from(20),
        );
        assert!(matches!(result, Err(AppError::ValidationFailed(_))));
    }

    #[test]
    fn fields_are_limited_by_type() {
        let editor = principal("mnt", &[RoleTag::EquipoMantenimiento], false, None);
        let payload = UpdateTicketPayload {
            total_cost: Some(Decimal::from(80)),
            equipment_cost: Some(Decimal::from(5)),
            filament_used: Some(Decimal::from(12)),
            ..Default::default()
        };
        let t = apply_update(
            ticket(TicketType::Maintenance, TicketStatus::Open, Utc::now()),
            &payload,
            &editor,
            Utc::now(),
            Decimal::from(20),
        )
        .unwrap();
        assert_eq!(t.total_cost, Some(Decimal::from(80)));
        assert_eq!(t.equipment_cost, None);
        assert_eq!(t.filament_used, None);
    }

    #[test]
    fn printing_records_the_printer() {
        let editor = Principal {
            display_name: Some("Laura Ruiz".into()),
            ..principal("lruiz", &[RoleTag::Equipo3d], false, None)
        };
        let payload = UpdateTicketPayload {
            filament_used: Some(Decimal::new(425, 1)),
            print_time: Some(Decimal::new(35, 1)),
            ..Default::default()
        };
        let t = apply_update(
            ticket(TicketType::ThreeD, TicketStatus::InProgress, Utc::now()),
            &payload,
            &editor,
            Utc::now(),
            Decimal::from(20),
        )
        .unwrap();
        assert_eq!(t.printed_by.as_deref(), Some("lruiz"));
        assert_eq!(t.printed_by_name.as_deref(), Some("Laura Ruiz"));
    }

    #[test]
    fn validation_opens_or_rejects_pending_maintenance() {
        let directivo = principal("jefa", &[RoleTag::EquipoDirectivo], false, None);
        let pending = ticket(TicketType::Maintenance, TicketStatus::PendingValidation, Utc::now());

        let approved = decide_validation(pending.clone(), true, &directivo, Utc::now()).unwrap();
        assert_eq!(approved.status, TicketStatus::Open);

        let rejected = decide_validation(pending, false, &directivo, Utc::now()).unwrap();
        assert_eq!(rejected.status, TicketStatus::Rejected);

        // Rechazado es definitivo
        assert!(decide_validation(rejected, true, &directivo, Utc::now()).is_err());

        let tic = ticket(TicketType::Tic, TicketStatus::Open, Utc::now());
        assert!(decide_validation(tic, true, &directivo, Utc::now()).is_err());
    }

    #[test]
    fn scope_depends_on_role() {
        let dept = Uuid::new_v4();

        let admin = principal("root", &[], true, None);
        assert_eq!(TicketScope::for_principal(TicketType::Tic, &admin), TicketScope::All);

        let tic = principal("tic", &[RoleTag::EquipoTic], false, None);
        assert_eq!(TicketScope::for_principal(TicketType::Tic, &tic), TicketScope::All);
        assert_eq!(
            TicketScope::for_principal(TicketType::ThreeD, &tic),
            TicketScope::Own("tic".into())
        );

        let director = principal("dir", &[RoleTag::Director], false, None);
        assert_eq!(TicketScope::for_principal(TicketType::Maintenance, &director), TicketScope::All);
        assert_eq!(
            TicketScope::for_principal(TicketType::Tic, &director),
            TicketScope::Own("dir".into())
        );

        let head = principal("jefe", &[RoleTag::JefeDepartamento], false, Some(dept));
        let scope = TicketScope::for_principal(TicketType::Tic, &head);
        assert_eq!(scope, TicketScope::Department { department_id: dept, uid: "jefe".into() });
        assert_eq!(scope.filter_params(), (Some("jefe"), Some(dept)));

        // Jefatura sin departamento asignado: solo las propias
        let orphan = principal("jefe2", &[RoleTag::JefeDepartamento], false, None);
        assert_eq!(
            TicketScope::for_principal(TicketType::Tic, &orphan),
            TicketScope::Own("jefe2".into())
        );
    }

    #[test]
    fn school_year_starts_in_september() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert_eq!(school_year_start(d(2025, 10, 14)), d(2025, 9, 1));
        assert_eq!(school_year_start(d(2026, 3, 2)), d(2025, 9, 1));
        assert_eq!(school_year_start(d(2025, 9, 1)), d(2025, 9, 1));
        assert_eq!(school_year_start(d(2025, 8, 31)), d(2024, 9, 1));
        assert_eq!(school_year_label(d(2026, 3, 2)), "2025-2026");
    }

    #[test]
    fn stats_group_by_status_and_department() {
        let dept = Uuid::new_v4();
        let names = HashMap::from([(dept, "Matemáticas".to_string())]);

        let mut resolved = ticket(TicketType::Tic, TicketStatus::Resolved, Utc::now());
        resolved.requested_by_department = Some(dept);
        resolved.resolution_time_hours = Some(Decimal::new(30, 1));
        resolved.total_cost = Some(Decimal::from(60));

        let mut closed = ticket(TicketType::Tic, TicketStatus::Closed, Utc::now());
        closed.resolution_time_hours = Some(Decimal::new(10, 1));
        closed.total_cost = Some(Decimal::new(2050, 2));

        let open = ticket(TicketType::Tic, TicketStatus::Open, Utc::now());
        let in_progress = ticket(TicketType::Tic, TicketStatus::InProgress, Utc::now());

        let stats = compute_stats(
            &[resolved, closed, open, in_progress],
            &names,
            "2025-2026".into(),
        );

        assert_eq!(stats.total, 4);
        assert_eq!(stats.open, 2);
        assert_eq!(stats.resolved, 2);
        assert_eq!(stats.by_status.get("resuelto"), Some(&1));
        assert_eq!(stats.avg_resolution_hours, Some(Decimal::new(20, 1)));
        assert_eq!(stats.total_cost, Decimal::new(8050, 2));
        assert_eq!(stats.by_department.get("Matemáticas"), Some(&1));
        assert_eq!(stats.by_department.get(NO_DEPARTMENT), Some(&3));
        assert_eq!(stats.school_year, "2025-2026");
    }

    #[test]
    fn stats_of_nothing_have_no_average() {
        let stats = compute_stats(&[], &HashMap::new(), "2025-2026".into());
        assert_eq!(stats.total, 0);
        assert_eq!(stats.avg_resolution_hours, None);
        assert_eq!(stats.total_cost, Decimal::ZERO);
    }

    // ---
    // Contra Postgres (DATABASE_URL), con las migraciones aplicadas
    // ---

    fn service(pool: PgPool) -> TicketService {
        TicketService::new(
            pool.clone(),
            TicketRepository::new(pool.clone()),
            DepartmentRepository::new(pool.clone()),
            UserRepository::new(pool.clone()),
            Decimal::from(20),
        )
    }

    fn payload(title: &str) -> CreateTicketPayload {
        CreateTicketPayload {
            title: title.into(),
            description: "No funciona".into(),
            priority: Default::default(),
            location: None,
            stl_url: None,
            on_behalf_of: None,
        }
    }

    async fn department(pool: &PgPool, name: &str) -> Uuid {
        let (id,): (Uuid,) = sqlx::query_as("INSERT INTO departments (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(pool)
            .await
            .unwrap();
        id
    }

    #[sqlx::test]
    async fn first_tic_ticket_is_tic_001_and_open(pool: PgPool) {
        let tickets = service(pool);
        let ana = principal("ana", &[], false, None);

        let first = tickets.create(TicketType::Tic, &payload("Proyector"), &ana).await.unwrap();
        assert_eq!(first.ticket_number, "TIC-001");
        assert_eq!(first.status, TicketStatus::Open);
        assert_eq!(first.requested_by, "ana");

        // Cada tipo lleva su propio contador
        let second = tickets.create(TicketType::Tic, &payload("Pizarra"), &ana).await.unwrap();
        assert_eq!(second.ticket_number, "TIC-002");
        let mnt = tickets.create(TicketType::Maintenance, &payload("Persiana"), &ana).await.unwrap();
        assert_eq!(mnt.ticket_number, "MNT-001");
        assert_eq!(mnt.status, TicketStatus::PendingValidation);
    }

    #[sqlx::test]
    async fn department_head_sees_colleagues_pending_maintenance(pool: PgPool) {
        let matematicas = department(&pool, "Matemáticas").await;
        let lengua = department(&pool, "Lengua").await;
        let tickets = service(pool);

        let ana = principal("ana", &[], false, Some(matematicas));
        tickets.create(TicketType::Maintenance, &payload("Persiana"), &ana).await.unwrap();

        let head = principal("jefe", &[RoleTag::JefeDepartamento], false, Some(matematicas));
        let seen: Vec<_> = tickets
            .list(TicketType::Maintenance, &head)
            .await
            .unwrap()
            .into_iter()
            .map(|t| (t.ticket_number, t.status))
            .collect();
        assert_eq!(seen, vec![("MNT-001".to_string(), TicketStatus::PendingValidation)]);

        let other_head = principal("jefa", &[RoleTag::JefeDepartamento], false, Some(lengua));
        assert!(tickets.list(TicketType::Maintenance, &other_head).await.unwrap().is_empty());

        let stranger = principal("luis", &[], false, None);
        assert!(tickets.list(TicketType::Maintenance, &stranger).await.unwrap().is_empty());
        assert_eq!(tickets.count_active(TicketType::Maintenance, &head).await.unwrap(), 0);
    }
}
