// src/services/reservation_service.rs

use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{reservation_repo::NewReservation, CalendarRepository, ReservationRepository},
    models::{
        auth::Principal,
        reservations::{time_slot, Cart, CartPayload, CreateReservationPayload, Reservation, ResourceKind},
    },
    services::{
        calendar_service::is_bookable,
        change_feed::{ChangeFeed, ChangeTopic},
        visibility::Permissions,
    },
};

/// Quién puede anular una reserva: su autor o el equipo que gestiona el recurso.
pub fn can_cancel(reservation: &Reservation, principal: &Principal) -> bool {
    reservation.user_id == principal.uid
        || Permissions::for_principal(principal).can_manage_reservations
}

// Cada ruta solo alcanza las reservas de su recurso
fn belongs_to(reservation: &Reservation, resource: ResourceKind) -> bool {
    reservation.resource == resource
}

#[derive(Clone)]
pub struct ReservationService {
    pool: PgPool,
    reservation_repo: ReservationRepository,
    calendar_repo: CalendarRepository,
    change_feed: ChangeFeed,
}

impl ReservationService {
    pub fn new(
        pool: PgPool,
        reservation_repo: ReservationRepository,
        calendar_repo: CalendarRepository,
        change_feed: ChangeFeed,
    ) -> Self {
        Self { pool, reservation_repo, calendar_repo, change_feed }
    }

    pub async fn list(
        &self,
        resource: ResourceKind,
        date: NaiveDate,
        cart_id: Option<Uuid>,
    ) -> Result<Vec<Reservation>, AppError> {
        self.reservation_repo.list_for_day(resource, date, cart_id).await
    }

    pub async fn reserve(
        &self,
        resource: ResourceKind,
        payload: &CreateReservationPayload,
        requester: &Principal,
    ) -> Result<Reservation, AppError> {
        // 1. Franja del horario fijo
        let slot = time_slot(payload.slot_index).ok_or_else(|| {
            AppError::ValidationFailed(format!("franja inexistente: {}", payload.slot_index))
        })?;

        // 2. Recurso coherente con el carro
        match (resource, payload.cart_id) {
            (ResourceKind::Sum, Some(_)) => {
                return Err(AppError::ValidationFailed("el SUM no admite carro".into()));
            }
            (ResourceKind::Cart, None) => {
                return Err(AppError::ValidationFailed("falta el carro".into()));
            }
            (ResourceKind::Cart, Some(cart_id)) => {
                let cart = self
                    .reservation_repo
                    .find_cart(cart_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("carro {}", cart_id)))?;
                if !cart.active {
                    return Err(AppError::ValidationFailed(format!("el carro '{}' está inactivo", cart.name)));
                }
            }
            (ResourceKind::Sum, None) => {}
        }

        // 3. Día laborable y no festivo
        let record = self.calendar_repo.find_day(&self.pool, payload.date).await?;
        if !is_bookable(payload.date, record.as_ref()) {
            return Err(AppError::DayNotBookable);
        }

        // 4. La unicidad la garantiza el índice; si otro llegó antes, SlotTaken
        let user_name = requester.name();
        let reservation = self
            .reservation_repo
            .insert(NewReservation {
                resource,
                date: payload.date,
                slot_index: slot.index,
                slot_label: slot.label,
                cart_id: payload.cart_id,
                title: payload.title.trim(),
                user_id: &requester.uid,
                user_name: &user_name,
            })
            .await?;

        tracing::info!(
            "🗓️ Reserva {} {} franja {} para {}",
            resource.as_str(),
            payload.date,
            slot.label,
            requester.email
        );
        self.change_feed.publish(ChangeTopic::Reservations(resource, payload.date));
        Ok(reservation)
    }

    pub async fn cancel(
        &self,
        resource: ResourceKind,
        id: Uuid,
        principal: &Principal,
    ) -> Result<(), AppError> {
        let reservation = self
            .reservation_repo
            .find(id)
            .await?
            .filter(|r| belongs_to(r, resource))
            .ok_or_else(|| AppError::NotFound(format!("reserva {}", id)))?;

        if !can_cancel(&reservation, principal) {
            return Err(AppError::Forbidden);
        }

        if !self.reservation_repo.delete(id).await? {
            return Err(AppError::NotFound(format!("reserva {}", id)));
        }

        tracing::info!("🗓️ Reserva {} anulada por {}", id, principal.email);
        self.change_feed.publish(ChangeTopic::Reservations(
            reservation.resource,
            reservation.reservation_date,
        ));
        Ok(())
    }

    // ---
    // Carros
    // ---

    pub async fn list_carts(&self, principal: &Principal) -> Result<Vec<Cart>, AppError> {
        let only_active = !Permissions::for_principal(principal).can_manage_carts;
        self.reservation_repo.list_carts(only_active).await
    }

    pub async fn create_cart(&self, payload: &CartPayload, principal: &Principal) -> Result<Cart, AppError> {
        ensure_cart_manager(principal)?;
        let cart = self.reservation_repo.insert_cart(payload).await?;
        tracing::info!("💻 Carro '{}' creado", cart.name);
        Ok(cart)
    }

    pub async fn update_cart(
        &self,
        id: Uuid,
        payload: &CartPayload,
        principal: &Principal,
    ) -> Result<Cart, AppError> {
        ensure_cart_manager(principal)?;
        self.reservation_repo
            .update_cart(id, payload)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("carro {}", id)))
    }

    pub async fn delete_cart(&self, id: Uuid, principal: &Principal) -> Result<(), AppError> {
        ensure_cart_manager(principal)?;
        if !self.reservation_repo.delete_cart(id).await? {
            return Err(AppError::NotFound(format!("carro {}", id)));
        }
        tracing::info!("💻 Carro {} eliminado junto con sus reservas", id);
        Ok(())
    }
}

fn ensure_cart_manager(principal: &Principal) -> Result<(), AppError> {
    if Permissions::for_principal(principal).can_manage_carts {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::RoleTag;
    use std::collections::BTreeSet;

    fn principal(uid: &str, roles: &[RoleTag], is_admin: bool) -> Principal {
        Principal {
            uid: uid.into(),
            email: format!("{}@iesamachado.org", uid),
            display_name: None,
            is_admin,
            roles: roles.iter().copied().collect::<BTreeSet<_>>(),
            department_id: None,
        }
    }

    fn reservation_by(uid: &str) -> Reservation {
        Reservation {
            id: Uuid::new_v4(),
            resource: ResourceKind::Sum,
            reservation_date: NaiveDate::from_ymd_opt(2025, 10, 14).unwrap(),
            slot_index: 2,
            slot_label: "10:00 - 11:00".into(),
            cart_id: None,
            title: "Charla de orientación".into(),
            user_id: uid.into(),
            user_name: uid.into(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn owner_can_cancel() {
        assert!(can_cancel(&reservation_by("ana"), &principal("ana", &[], false)));
    }

    #[test]
    fn others_cannot_cancel() {
        assert!(!can_cancel(&reservation_by("ana"), &principal("luis", &[RoleTag::Director], false)));
    }

    #[test]
    fn managers_and_admins_can_cancel() {
        assert!(can_cancel(&reservation_by("ana"), &principal("tic", &[RoleTag::EquipoTic], false)));
        assert!(can_cancel(&reservation_by("ana"), &principal("root", &[], true)));
    }

    #[test]
    fn only_managers_handle_carts() {
        assert!(ensure_cart_manager(&principal("tic", &[RoleTag::EquipoTic], false)).is_ok());
        assert!(matches!(
            ensure_cart_manager(&principal("ana", &[RoleTag::Tester], false)),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn reservations_belong_to_their_resource() {
        let sum = reservation_by("ana");
        assert!(belongs_to(&sum, ResourceKind::Sum));
        assert!(!belongs_to(&sum, ResourceKind::Cart));
    }

    // ---
    // Contra Postgres (DATABASE_URL), con las migraciones aplicadas
    // ---

    fn service(pool: PgPool) -> ReservationService {
        ReservationService::new(
            pool.clone(),
            ReservationRepository::new(pool.clone()),
            CalendarRepository::new(pool),
            ChangeFeed::default(),
        )
    }

    fn booking(slot_index: i16, cart_id: Option<Uuid>) -> CreateReservationPayload {
        CreateReservationPayload {
            // Martes lectivo
            date: NaiveDate::from_ymd_opt(2025, 10, 14).unwrap(),
            slot_index,
            cart_id,
            title: "Charla de orientación".into(),
        }
    }

    async fn cart(reservations: &ReservationService) -> Uuid {
        let tic = principal("tic", &[RoleTag::EquipoTic], false);
        let payload = CartPayload {
            name: "Carro 1".into(),
            location: "Planta baja".into(),
            description: None,
            active: true,
        };
        reservations.create_cart(&payload, &tic).await.unwrap().id
    }

    #[sqlx::test]
    async fn second_booking_of_the_same_slot_is_taken(pool: PgPool) {
        let reservations = service(pool);
        let ana = principal("ana", &[], false);
        let luis = principal("luis", &[], false);

        reservations.reserve(ResourceKind::Sum, &booking(2, None), &ana).await.unwrap();
        let second = reservations.reserve(ResourceKind::Sum, &booking(2, None), &luis).await;
        assert!(matches!(second, Err(AppError::SlotTaken)));

        // Otra franja sigue libre
        reservations.reserve(ResourceKind::Sum, &booking(4, None), &luis).await.unwrap();
    }

    #[sqlx::test]
    async fn each_cart_has_its_own_slots(pool: PgPool) {
        let reservations = service(pool);
        let first = cart(&reservations).await;
        let second = cart(&reservations).await;
        let ana = principal("ana", &[], false);

        reservations.reserve(ResourceKind::Cart, &booking(1, Some(first)), &ana).await.unwrap();
        reservations.reserve(ResourceKind::Cart, &booking(1, Some(second)), &ana).await.unwrap();
        let again = reservations.reserve(ResourceKind::Cart, &booking(1, Some(first)), &ana).await;
        assert!(matches!(again, Err(AppError::SlotTaken)));
    }

    #[sqlx::test]
    async fn cart_reservations_cannot_be_cancelled_through_the_sum(pool: PgPool) {
        let reservations = service(pool);
        let cart_id = cart(&reservations).await;
        let ana = principal("ana", &[], false);
        let booked = reservations
            .reserve(ResourceKind::Cart, &booking(1, Some(cart_id)), &ana)
            .await
            .unwrap();

        let wrong_route = reservations.cancel(ResourceKind::Sum, booked.id, &ana).await;
        assert!(matches!(wrong_route, Err(AppError::NotFound(_))));
        let day = reservations.list(ResourceKind::Cart, booked.reservation_date, None).await.unwrap();
        assert_eq!(day.len(), 1);

        reservations.cancel(ResourceKind::Cart, booked.id, &ana).await.unwrap();
        let day = reservations.list(ResourceKind::Cart, booked.reservation_date, None).await.unwrap();
        assert!(day.is_empty());
    }
}
