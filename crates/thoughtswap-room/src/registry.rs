//! The Room Registry (§4.4, §4.9): owns the map of live Rooms keyed by
//! `JoinCode`, allocates fresh codes on `TEACHER_START_CLASS`, rehydrates a
//! Room from the store on `TEACHER_REJOIN`/`JOIN_ROOM` after a process
//! restart, and runs the debounced teacher-disconnect auto-end.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::DashMap;
use rusqlite::Connection;
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use thoughtswap_core::config::JOIN_CODE_MAX_RETRIES;
use thoughtswap_core::{ConnId, CoreError, JoinCode, UserId};
use thoughtswap_store::error::StoreError;
use thoughtswap_store::types::User;

use crate::error::Result;
use crate::room::Room;
use crate::types::{Outcome, Participant};

/// What the registry hands the gateway when a debounced auto-end fires: the
/// room is already gone from the map, so the participant snapshot travels
/// alongside the `Outcome` the gateway needs it to resolve `Target::AllMembers`/
/// `Target::Teachers` against (§9: the Room resolves membership, the gateway
/// only ever sees identifiers).
pub type AutoEndMessage = (JoinCode, Vec<Participant>, Outcome);

pub struct RoomRegistry {
    rooms: Arc<DashMap<JoinCode, Arc<Room>>>,
    /// Generation counter per join code with a teacher currently disconnected
    /// (§4.9). A reconnect bumps the counter; the scheduled auto-end task
    /// only proceeds if the counter it captured is still current.
    pending_disconnects: Arc<DashMap<JoinCode, Arc<AtomicU64>>>,
    db: Arc<Mutex<Connection>>,
    debounce: Duration,
    auto_end_tx: UnboundedSender<AutoEndMessage>,
}

impl RoomRegistry {
    pub fn new(
        db: Arc<Mutex<Connection>>,
        debounce_ms: u64,
        auto_end_tx: UnboundedSender<AutoEndMessage>,
    ) -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            pending_disconnects: Arc::new(DashMap::new()),
            db,
            debounce: Duration::from_millis(debounce_ms),
            auto_end_tx,
        }
    }

    pub fn get(&self, join_code: &JoinCode) -> Option<Arc<Room>> {
        self.rooms.get(join_code).map(|r| r.clone())
    }

    pub fn active_session_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn total_participants(&self) -> usize {
        self.rooms.iter().map(|r| r.participant_count()).sum()
    }

    pub fn remove(&self, join_code: &JoinCode) {
        self.rooms.remove(join_code);
        self.pending_disconnects.remove(join_code);
    }

    /// `TEACHER_START_CLASS` (§4.4, §4.9): allocate a Course + Session with a
    /// freshly generated, store-unique `JoinCode`, retrying on collision up
    /// to `JOIN_CODE_MAX_RETRIES` times.
    pub fn teacher_start_class(
        &self,
        conn_id: ConnId,
        teacher: &User,
        title: &str,
        max_swap_requests: u32,
    ) -> Result<(Arc<Room>, Outcome)> {
        let conn = self.db.lock().unwrap();
        for _ in 0..JOIN_CODE_MAX_RETRIES {
            let join_code = JoinCode::random();
            match thoughtswap_store::courses::create_course_with_session(
                &conn,
                &teacher.id,
                title,
                join_code.as_str(),
                max_swap_requests,
            ) {
                Ok((course, session)) => {
                    drop(conn);
                    let room = Arc::new(Room::new(
                        join_code.clone(),
                        course.id,
                        session.id,
                        UserId::from(teacher.id.clone()),
                        max_swap_requests,
                        self.db.clone(),
                    ));
                    self.rooms.insert(join_code, room.clone());
                    let outcome = room.teacher_start(conn_id, teacher)?;
                    return Ok((room, outcome));
                }
                Err(StoreError::Conflict(_)) => continue,
                Err(e) => return Err(CoreError::from(e)),
            }
        }
        Err(CoreError::Transient(
            "could not allocate a unique join code".into(),
        ))
    }

    /// `TEACHER_REJOIN` (§4.5): find the live Room, or rehydrate it from the
    /// store if this process never saw it (e.g. after a restart). Cancels
    /// any pending auto-end debounce for this join code.
    pub fn teacher_rejoin(
        &self,
        conn_id: ConnId,
        teacher: &User,
        join_code: &JoinCode,
    ) -> Result<(Arc<Room>, Outcome)> {
        let room = self.room_or_hydrate(join_code)?;
        let outcome = room.teacher_rejoin(conn_id, teacher)?;
        if let Some(counter) = self.pending_disconnects.get(join_code) {
            counter.fetch_add(1, Ordering::SeqCst);
        }
        Ok((room, outcome))
    }

    /// `JOIN_ROOM` (§4.5): any role. Rehydrates the Room from the store when
    /// this process doesn't hold it in memory, same as `teacher_rejoin`.
    pub fn join(&self, conn_id: ConnId, user: &User, join_code: &JoinCode) -> Result<(Arc<Room>, Outcome)> {
        let room = self.room_or_hydrate(join_code)?;
        let outcome = room.join(conn_id, user)?;
        Ok((room, outcome))
    }

    fn room_or_hydrate(&self, join_code: &JoinCode) -> Result<Arc<Room>> {
        if let Some(room) = self.get(join_code) {
            return Ok(room);
        }
        let conn = self.db.lock().unwrap();
        let Some((course, session)) =
            thoughtswap_store::courses::find_active_session_by_join_code(&conn, join_code.as_str())
                .map_err(CoreError::from)?
        else {
            return Err(CoreError::NotFound("Invalid Room Code".into()));
        };
        drop(conn);
        let room = Arc::new(Room::hydrate(
            join_code.clone(),
            course.id,
            session.id,
            UserId::from(course.teacher_id),
            session.max_swap_requests,
            self.db.clone(),
        )?);
        self.rooms.insert(join_code.clone(), room.clone());
        Ok(room)
    }

    /// A connection dropped. Removes the participant and, if it was the
    /// owning teacher, arms the debounced auto-end (§4.9).
    pub fn leave(&self, join_code: &JoinCode, conn_id: &ConnId) -> Result<Outcome> {
        let Some(room) = self.get(join_code) else {
            return Ok(Outcome::default());
        };
        let result = room.leave(conn_id)?;
        if result.was_teacher {
            self.arm_teacher_disconnect(join_code.clone(), room);
        }
        Ok(result.outcome)
    }

    fn arm_teacher_disconnect(&self, join_code: JoinCode, room: Arc<Room>) {
        let counter = self
            .pending_disconnects
            .entry(join_code.clone())
            .or_insert_with(|| Arc::new(AtomicU64::new(0)))
            .clone();
        let generation = counter.fetch_add(1, Ordering::SeqCst) + 1;

        let rooms = self.rooms.clone();
        let pending = self.pending_disconnects.clone();
        let debounce = self.debounce;
        let auto_end_tx = self.auto_end_tx.clone();
        let code_for_task = join_code.clone();

        tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if counter.load(Ordering::SeqCst) != generation {
                // A reconnect cancelled this timer.
                return;
            }
            rooms.remove(&code_for_task);
            pending.remove(&code_for_task);
            let participants = room.participants();
            match room.auto_end() {
                Ok(outcome) => {
                    let _ = auto_end_tx.send((code_for_task, participants, outcome));
                }
                Err(e) => warn!(join_code = %code_for_task, error = %e, "auto-end failed"),
            }
        });
    }
}
