// Room service module
// CRUD and availability for treatment rooms

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Local, TimeZone};
use rusqlite::{self, params, Connection, Row};

use crate::models::room::{
    CreateRoomInput, Room, RoomAppointmentSlot, RoomAvailability, RoomFilter, UpdateRoomInput,
    DEFAULT_ROOM_COLOR,
};
use crate::scheduling::store::ResourceStore;
use crate::services::appointment::shared::{now_db_time, to_db_time, to_local_datetime};

const ROOM_COLUMNS: &str =
    "id, name, description, capacity, color, is_active, created_at, updated_at";

pub struct RoomService<'a> {
    conn: &'a Connection,
}

impl<'a> RoomService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Rooms ordered by name.
    pub fn list(&self, filter: &RoomFilter) -> Result<Vec<Room>> {
        let sql = if filter.active_only {
            format!("SELECT {} FROM rooms WHERE is_active = 1 ORDER BY name ASC", ROOM_COLUMNS)
        } else {
            format!("SELECT {} FROM rooms ORDER BY name ASC", ROOM_COLUMNS)
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let rooms = stmt
            .query_map([], map_room_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list rooms")?;

        Ok(rooms)
    }

    pub fn get(&self, id: i64) -> Result<Option<Room>> {
        let result = self.conn.query_row(
            &format!("SELECT {} FROM rooms WHERE id = ?", ROOM_COLUMNS),
            [id],
            map_room_row,
        );

        match result {
            Ok(room) => Ok(Some(room)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn name_taken(&self, name: &str, except_id: Option<i64>) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM rooms WHERE name = ?1 AND (?2 IS NULL OR id != ?2)",
                params![name, except_id],
                |row| row.get(0),
            )
            .context("Failed to check room name")?;
        Ok(count > 0)
    }

    pub fn create(&self, input: &CreateRoomInput) -> Result<Room> {
        input.validate().map_err(|e| anyhow!(e))?;

        let name = input.name.trim();
        if self.name_taken(name, None)? {
            return Err(anyhow!("Room with name '{}' already exists", name));
        }

        let now = now_db_time();
        self.conn
            .execute(
                "INSERT INTO rooms (name, description, capacity, color, is_active, created_at, updated_at)
                 VALUES (?, ?, ?, ?, 1, ?, ?)",
                params![
                    name,
                    input.description,
                    input.capacity.unwrap_or(1),
                    input.color.as_deref().unwrap_or(DEFAULT_ROOM_COLOR),
                    &now,
                    &now,
                ],
            )
            .context("Failed to insert room")?;

        let id = self.conn.last_insert_rowid();
        log::info!("Created room {} '{}'", id, name);
        self.get(id)?
            .ok_or_else(|| anyhow!("Room with id {} not found", id))
    }

    /// Apply a partial update. An empty update returns the stored room unchanged.
    pub fn update(&self, id: i64, input: &UpdateRoomInput) -> Result<Room> {
        let existing = self
            .get(id)?
            .ok_or_else(|| anyhow!("Room with id {} not found", id))?;
        if input.is_empty() {
            return Ok(existing);
        }
        input.validate().map_err(|e| anyhow!(e))?;

        let name = input
            .name
            .as_deref()
            .map(str::trim)
            .unwrap_or(&existing.name);
        if self.name_taken(name, Some(id))? {
            return Err(anyhow!("Room with name '{}' already exists", name));
        }

        self.conn
            .execute(
                "UPDATE rooms SET name = ?, description = ?, capacity = ?, color = ?,
                    is_active = ?, updated_at = ?
                 WHERE id = ?",
                params![
                    name,
                    input.description.as_ref().or(existing.description.as_ref()),
                    input.capacity.unwrap_or(existing.capacity),
                    input.color.as_ref().unwrap_or(&existing.color),
                    input.is_active.unwrap_or(existing.is_active) as i32,
                    now_db_time(),
                    id,
                ],
            )
            .context("Failed to update room")?;

        self.get(id)?
            .ok_or_else(|| anyhow!("Room with id {} not found", id))
    }

    /// Remove a room. Refused while live appointments still reference it.
    pub fn delete(&self, id: i64) -> Result<()> {
        let referencing: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM appointments WHERE room_id = ? AND deleted_at IS NULL",
                [id],
                |row| row.get(0),
            )
            .context("Failed to check room appointments")?;

        if referencing > 0 {
            return Err(anyhow!(
                "Cannot delete room with id {}: {} appointment(s) still use it",
                id,
                referencing
            ));
        }

        // Soft-deleted history keeps no room reference
        self.conn
            .execute(
                "UPDATE appointments SET room_id = NULL WHERE room_id = ? AND deleted_at IS NOT NULL",
                [id],
            )
            .context("Failed to detach deleted appointments")?;

        let rows_affected = self
            .conn
            .execute("DELETE FROM rooms WHERE id = ?", [id])
            .context("Failed to delete room")?;

        if rows_affected == 0 {
            return Err(anyhow!("Room with id {} not found", id));
        }

        log::info!("Deleted room {}", id);
        Ok(())
    }

    /// Occupancy of a room around `at`, based on its scheduled and in-progress
    /// appointments on that calendar day.
    pub fn availability(&self, room_id: i64, at: DateTime<Local>) -> Result<RoomAvailability> {
        let room = self
            .get(room_id)?
            .ok_or_else(|| anyhow!("Room with id {} not found", room_id))?;

        let day_start = at
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .and_then(|midnight| Local.from_local_datetime(&midnight).earliest())
            .unwrap_or(at);
        let day_end = day_start + Duration::days(1);

        let mut stmt = self.conn.prepare(
            "SELECT id, title, start_time, end_time, status FROM appointments
             WHERE room_id = ?1
               AND deleted_at IS NULL
               AND status IN ('scheduled', 'in_progress')
               AND start_time < ?2 AND end_time > ?3
             ORDER BY start_time ASC, id ASC",
        )?;
        let slots = stmt
            .query_map(
                params![room_id, to_db_time(&day_end), to_db_time(&day_start)],
                |row| {
                    Ok(RoomAppointmentSlot {
                        appointment_id: row.get(0)?,
                        title: row.get(1)?,
                        start_time: to_local_datetime(row.get(2)?)?,
                        end_time: to_local_datetime(row.get(3)?)?,
                        status: row.get(4)?,
                    })
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to load room appointments")?;

        let capacity = room.capacity.max(1) as usize;
        let occupancy = |t: DateTime<Local>| {
            slots
                .iter()
                .filter(|slot| slot.start_time <= t && t < slot.end_time)
                .count()
        };

        let is_available = occupancy(at) < capacity;
        let next_available = if is_available {
            None
        } else {
            // The room frees up at the first end time where occupancy drops below capacity
            let mut ends: Vec<DateTime<Local>> = slots
                .iter()
                .map(|slot| slot.end_time)
                .filter(|end| *end > at)
                .collect();
            ends.sort();
            ends.into_iter().find(|end| occupancy(*end) < capacity)
        };

        Ok(RoomAvailability {
            room,
            is_available,
            next_available,
            current_appointments: slots,
        })
    }
}

impl ResourceStore for RoomService<'_> {
    fn list_resources(&self, filter: &RoomFilter) -> Result<Vec<Room>> {
        self.list(filter)
    }
}

fn map_room_row(row: &Row<'_>) -> Result<Room, rusqlite::Error> {
    Ok(Room {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        capacity: row.get(3)?,
        color: row.get(4)?,
        is_active: row.get::<_, i32>(5)? != 0,
        created_at: Some(to_local_datetime(row.get(6)?)?),
        updated_at: Some(to_local_datetime(row.get(7)?)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::appointment::{AppointmentStatus, CreateAppointmentInput, UpdateAppointmentInput};
    use crate::services::appointment::AppointmentService;
    use crate::services::database::Database;
    use chrono::NaiveDate;

    fn setup_test_db() -> Database {
        let db = Database::new(":memory:").unwrap();
        db.initialize_schema().unwrap();
        db
    }

    fn at(hour: u32, minute: u32) -> DateTime<Local> {
        let naive = NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap();
        Local.from_local_datetime(&naive).earliest().unwrap()
    }

    fn book(db: &Database, room_id: i64, start: DateTime<Local>, end: DateTime<Local>) -> i64 {
        AppointmentService::new(db.connection())
            .create(&CreateAppointmentInput {
                patient_id: 1,
                title: "Consult".to_string(),
                description: None,
                start_time: start,
                end_time: end,
                room_id: Some(room_id),
            })
            .unwrap()
            .id
    }

    #[test]
    fn test_create_room_defaults() {
        let db = setup_test_db();
        let service = RoomService::new(db.connection());

        let room = service.create(&CreateRoomInput::named("Exam 1")).unwrap();
        assert_eq!(room.capacity, 1);
        assert_eq!(room.color, DEFAULT_ROOM_COLOR);
        assert!(room.is_active);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let db = setup_test_db();
        let service = RoomService::new(db.connection());

        service.create(&CreateRoomInput::named("Surgery")).unwrap();
        let err = service.create(&CreateRoomInput::named("Surgery")).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_update_partial_and_rename_clash() {
        let db = setup_test_db();
        let service = RoomService::new(db.connection());
        let exam = service.create(&CreateRoomInput::named("Exam 1")).unwrap();
        service.create(&CreateRoomInput::named("Exam 2")).unwrap();

        let updated = service
            .update(
                exam.id,
                &UpdateRoomInput {
                    capacity: Some(3),
                    ..UpdateRoomInput::default()
                },
            )
            .unwrap();
        assert_eq!(updated.capacity, 3);
        assert_eq!(updated.name, "Exam 1");

        let clash = UpdateRoomInput {
            name: Some("Exam 2".to_string()),
            ..UpdateRoomInput::default()
        };
        assert!(service.update(exam.id, &clash).is_err());
    }

    #[test]
    fn test_list_active_only() {
        let db = setup_test_db();
        let service = RoomService::new(db.connection());
        let xray = service.create(&CreateRoomInput::named("X-Ray")).unwrap();
        service.create(&CreateRoomInput::named("Dental")).unwrap();
        service
            .update(
                xray.id,
                &UpdateRoomInput {
                    is_active: Some(false),
                    ..UpdateRoomInput::default()
                },
            )
            .unwrap();

        let active = service.list(&RoomFilter::default()).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "Dental");

        let all = service.list_resources(&RoomFilter { active_only: false }).unwrap();
        let names: Vec<&str> = all.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Dental", "X-Ray"]);
    }

    #[test]
    fn test_delete_refused_while_in_use() {
        let db = setup_test_db();
        let service = RoomService::new(db.connection());
        let room = service.create(&CreateRoomInput::named("Surgery")).unwrap();
        let appointment = book(&db, room.id, at(9, 0), at(10, 0));

        assert!(service.delete(room.id).is_err());

        AppointmentService::new(db.connection())
            .delete(appointment)
            .unwrap();
        service.delete(room.id).unwrap();
        assert!(service.get(room.id).unwrap().is_none());
        assert!(service.delete(room.id).is_err());
    }

    #[test]
    fn test_availability_single_capacity() {
        let db = setup_test_db();
        let service = RoomService::new(db.connection());
        let room = service.create(&CreateRoomInput::named("Exam 1")).unwrap();
        book(&db, room.id, at(9, 0), at(10, 0));
        book(&db, room.id, at(10, 0), at(10, 30));

        let busy = service.availability(room.id, at(9, 30)).unwrap();
        assert!(!busy.is_available);
        // Back-to-back booking keeps it busy until 10:30
        assert_eq!(busy.next_available, Some(at(10, 30)));
        assert_eq!(busy.current_appointments.len(), 2);

        let free = service.availability(room.id, at(11, 0)).unwrap();
        assert!(free.is_available);
        assert!(free.next_available.is_none());
    }

    #[test]
    fn test_availability_respects_capacity_and_status() {
        let db = setup_test_db();
        let service = RoomService::new(db.connection());
        let room = service
            .create(&CreateRoomInput {
                capacity: Some(2),
                ..CreateRoomInput::named("Kennel")
            })
            .unwrap();
        book(&db, room.id, at(9, 0), at(10, 0));
        let done = book(&db, room.id, at(9, 0), at(10, 0));
        AppointmentService::new(db.connection())
            .update(
                done,
                &UpdateAppointmentInput {
                    status: Some(AppointmentStatus::Completed),
                    ..UpdateAppointmentInput::default()
                },
            )
            .unwrap();

        let availability = service.availability(room.id, at(9, 30)).unwrap();
        assert!(availability.is_available);
        assert_eq!(availability.current_appointments.len(), 1);
    }

    #[test]
    fn test_availability_unknown_room() {
        let db = setup_test_db();
        let service = RoomService::new(db.connection());
        assert!(service.availability(5, at(9, 0)).is_err());
    }
}
