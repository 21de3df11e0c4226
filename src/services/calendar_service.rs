// src/services/calendar_service.rs

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, Weekday};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::CalendarRepository,
    models::auth::Principal,
    models::calendar::{
        month_id, CalendarEvent, CapacityStep, CreateEventPayload, DaySlotRecord, DayView,
        MonthView, MAX_SLOTS,
    },
    services::{
        change_feed::{ChangeFeed, ChangeTopic},
        visibility::Permissions,
    },
};

// ---
// Reglas puras
// ---

pub fn step_capacity(current: i16, step: CapacityStep) -> i16 {
    match step {
        CapacityStep::Increment => (current + 1).min(MAX_SLOTS),
        CapacityStep::Decrement => (current - 1).max(0),
    }
}

pub fn is_weekend(day: NaiveDate) -> bool {
    matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn is_bookable(day: NaiveDate, record: Option<&DaySlotRecord>) -> bool {
    !is_weekend(day) && !record.is_some_and(|r| r.is_holiday)
}

/// Día sin registro: pasa a festivo con los huecos por defecto. Con registro: invierte la marca.
pub fn toggle_holiday(day: NaiveDate, record: Option<DaySlotRecord>) -> DaySlotRecord {
    match record {
        Some(mut existing) => {
            existing.is_holiday = !existing.is_holiday;
            existing
        }
        None => DaySlotRecord { is_holiday: true, ..DaySlotRecord::new(day) },
    }
}

pub fn day_view(day: NaiveDate, record: Option<&DaySlotRecord>, events: Vec<CalendarEvent>) -> DayView {
    let weekend = is_weekend(day);
    let holiday = record.is_some_and(|r| r.is_holiday);
    let bookable = !weekend && !holiday;

    DayView {
        date: day,
        weekend,
        holiday,
        remaining_slots: bookable.then(|| record.map_or(MAX_SLOTS, |r| r.remaining_slots)),
        bookable,
        events,
    }
}

pub fn days_of_month(year: i32, month: u32) -> Result<Vec<NaiveDate>, AppError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::ValidationFailed(format!("mes inválido: {}-{}", year, month)))?;
    Ok(first
        .iter_days()
        .take_while(|d| d.month() == month)
        .collect())
}

#[derive(Clone)]
pub struct CalendarService {
    pool: PgPool,
    calendar_repo: CalendarRepository,
    change_feed: ChangeFeed,
}

impl CalendarService {
    pub fn new(pool: PgPool, calendar_repo: CalendarRepository, change_feed: ChangeFeed) -> Self {
        Self { pool, calendar_repo, change_feed }
    }

    pub async fn month_view(&self, year: i32, month: u32) -> Result<MonthView, AppError> {
        let days = days_of_month(year, month)?;
        let Some(&first) = days.first() else {
            return Err(AppError::ValidationFailed("mes vacío".into()));
        };
        let month_key = month_id(first);

        let records: HashMap<NaiveDate, DaySlotRecord> = self
            .calendar_repo
            .list_month_days(&month_key)
            .await?
            .into_iter()
            .map(|r| (r.day, r))
            .collect();

        let mut events_by_day: HashMap<NaiveDate, Vec<CalendarEvent>> = HashMap::new();
        for event in self.calendar_repo.list_month_events(&month_key).await? {
            events_by_day.entry(event.day).or_default().push(event);
        }

        let days = days
            .into_iter()
            .map(|day| {
                let events = events_by_day.remove(&day).unwrap_or_default();
                day_view(day, records.get(&day), events)
            })
            .collect();

        Ok(MonthView { month_id: month_key, days })
    }

    /// Sube o baja los huecos de un día laborable.
    pub async fn adjust_capacity(
        &self,
        day: NaiveDate,
        step: CapacityStep,
        editor: &Principal,
    ) -> Result<DayView, AppError> {
        if !Permissions::for_principal(editor).can_edit_slots {
            return Err(AppError::Forbidden);
        }
        if is_weekend(day) {
            return Err(AppError::DayNotBookable);
        }

        let mut tx = self.pool.begin().await?;

        // 1. Garantiza la fila y la bloquea
        self.calendar_repo.seed_day(&mut *tx, day).await?;
        let record = self
            .calendar_repo
            .lock_day(&mut *tx, day)
            .await?
            .unwrap_or_else(|| DaySlotRecord::new(day));

        if record.is_holiday {
            return Err(AppError::DayNotBookable);
        }

        // 2. Fuera de rango no escribe nada
        let next = step_capacity(record.remaining_slots, step);
        let record = if next != record.remaining_slots {
            let updated = DaySlotRecord { remaining_slots: next, ..record };
            self.calendar_repo.save_day(&mut *tx, &updated).await?;
            updated
        } else {
            record
        };

        tx.commit().await?;

        tracing::info!("📅 Huecos de {} → {} ({})", day, record.remaining_slots, editor.email);
        self.change_feed.publish(ChangeTopic::calendar(day));
        let events = self.calendar_repo.list_day_events(day).await?;
        Ok(day_view(day, Some(&record), events))
    }

    pub async fn toggle_holiday(&self, day: NaiveDate, editor: &Principal) -> Result<DayView, AppError> {
        if !Permissions::for_principal(editor).can_edit_slots {
            return Err(AppError::Forbidden);
        }
        if is_weekend(day) {
            return Err(AppError::DayNotBookable);
        }

        let mut tx = self.pool.begin().await?;

        let current = self.calendar_repo.lock_day(&mut *tx, day).await?;
        let updated = toggle_holiday(day, current);
        self.calendar_repo.save_day(&mut *tx, &updated).await?;

        tx.commit().await?;

        tracing::info!("📅 {} festivo = {}", day, updated.is_holiday);
        self.change_feed.publish(ChangeTopic::calendar(day));
        let events = self.calendar_repo.list_day_events(day).await?;
        Ok(day_view(day, Some(&updated), events))
    }

    /// Cualquier fecha, fines de semana incluidos.
    pub async fn add_event(
        &self,
        day: NaiveDate,
        payload: &CreateEventPayload,
        author: &Principal,
    ) -> Result<CalendarEvent, AppError> {
        if !Permissions::for_principal(author).can_add_events {
            return Err(AppError::Forbidden);
        }
        let event = self.calendar_repo.insert_event(day, payload, &author.uid).await?;
        tracing::info!("📅 Evento '{}' añadido el {}", event.title, day);
        self.change_feed.publish(ChangeTopic::calendar(day));
        Ok(event)
    }

    pub async fn remove_event(&self, id: Uuid, editor: &Principal) -> Result<(), AppError> {
        if !Permissions::for_principal(editor).can_add_events {
            return Err(AppError::Forbidden);
        }
        let day = self
            .calendar_repo
            .delete_event(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("evento {}", id)))?;
        self.change_feed.publish(ChangeTopic::calendar(day));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn capacity_stays_within_bounds() {
        assert_eq!(step_capacity(4, CapacityStep::Increment), 4);
        assert_eq!(step_capacity(0, CapacityStep::Decrement), 0);
        assert_eq!(step_capacity(2, CapacityStep::Increment), 3);
        assert_eq!(step_capacity(2, CapacityStep::Decrement), 1);
        for c in 0..=MAX_SLOTS {
            for step in [CapacityStep::Increment, CapacityStep::Decrement] {
                let next = step_capacity(c, step);
                assert!((0..=MAX_SLOTS).contains(&next));
            }
        }
    }

    #[test]
    fn weekends_are_detected() {
        // 2025-10-11 es sábado
        assert!(is_weekend(date(2025, 10, 11)));
        assert!(is_weekend(date(2025, 10, 12)));
        assert!(!is_weekend(date(2025, 10, 13)));
        assert!(!is_weekend(date(2025, 10, 17)));
    }

    #[test]
    fn holidays_and_weekends_are_not_bookable() {
        let monday = date(2025, 10, 13);
        assert!(is_bookable(monday, None));

        let holiday = DaySlotRecord { is_holiday: true, ..DaySlotRecord::new(monday) };
        assert!(!is_bookable(monday, Some(&holiday)));
        assert!(!is_bookable(date(2025, 10, 12), None));
    }

    #[test]
    fn toggling_a_missing_day_creates_a_full_holiday() {
        let day = date(2025, 12, 8);
        let record = toggle_holiday(day, None);
        assert!(record.is_holiday);
        assert_eq!(record.remaining_slots, MAX_SLOTS);
        assert_eq!(record.month_id, "2025-12");
    }

    #[test]
    fn toggling_twice_restores_the_day() {
        let day = date(2025, 10, 14);
        let original = DaySlotRecord { remaining_slots: 2, ..DaySlotRecord::new(day) };
        let toggled = toggle_holiday(day, Some(original.clone()));
        assert!(toggled.is_holiday);
        assert_eq!(toggled.remaining_slots, 2);
        assert_eq!(toggle_holiday(day, Some(toggled)), original);
    }

    #[test]
    fn day_view_hides_slots_when_not_bookable() {
        let weekday = date(2025, 10, 14);
        let view = day_view(weekday, None, Vec::new());
        assert_eq!(view.remaining_slots, Some(MAX_SLOTS));
        assert!(view.bookable);

        let holiday = DaySlotRecord { is_holiday: true, ..DaySlotRecord::new(weekday) };
        let view = day_view(weekday, Some(&holiday), Vec::new());
        assert!(view.holiday);
        assert_eq!(view.remaining_slots, None);

        let view = day_view(date(2025, 10, 11), None, Vec::new());
        assert!(view.weekend);
        assert!(!view.bookable);
    }

    #[test]
    fn month_days_cover_the_whole_month() {
        assert_eq!(days_of_month(2025, 2).unwrap().len(), 28);
        assert_eq!(days_of_month(2024, 2).unwrap().len(), 29);
        assert_eq!(days_of_month(2025, 10).unwrap().len(), 31);
        assert!(days_of_month(2025, 13).is_err());
    }

    #[sqlx::test]
    async fn day_updates_keep_the_days_events(pool: PgPool) {
        use crate::models::{auth::RoleTag, calendar::EventType};
        use std::collections::BTreeSet;

        let calendar = CalendarService::new(
            pool.clone(),
            CalendarRepository::new(pool),
            ChangeFeed::default(),
        );
        let director = Principal {
            uid: "dir".into(),
            email: "dir@iesamachado.org".into(),
            display_name: None,
            is_admin: false,
            roles: BTreeSet::from([RoleTag::Director, RoleTag::EquipoDirectivo]),
            department_id: None,
        };
        let day = date(2025, 10, 14);
        let payload = CreateEventPayload {
            title: "Claustro".into(),
            kind: EventType::Cloister,
            time: Some("16:30".into()),
            link: None,
            description: None,
        };
        calendar.add_event(day, &payload, &director).await.unwrap();

        let view = calendar.adjust_capacity(day, CapacityStep::Decrement, &director).await.unwrap();
        assert_eq!(view.remaining_slots, Some(MAX_SLOTS - 1));
        assert_eq!(view.events.len(), 1);
        assert_eq!(view.events[0].title, "Claustro");

        let view = calendar.toggle_holiday(day, &director).await.unwrap();
        assert!(view.holiday);
        assert_eq!(view.events.len(), 1);
    }
}
