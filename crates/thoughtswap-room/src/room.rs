//! The Room state machine (§4.5): the single largest component. Owns the
//! authoritative in-memory state for one ACTIVE Session — participants, the
//! current PromptUse, collected thoughts (via the store), and the current
//! Distribution — and drives every transition, moderation action, and
//! restoration path named in §4.5.
//!
//! A `Room` never reaches back into the transport layer: every method
//! returns `Outcome`, a list of addressed `Effect`s the gateway actually
//! delivers (§9: "Rooms hold only identifiers ... never owning references
//! back to transport objects").

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use thoughtswap_core::types::{MC_OPTIONS_MAX, MC_OPTIONS_MIN};
use thoughtswap_core::{ConnId, CoreError, JoinCode, PromptKind, RoomState, UserId, UserRole};
use thoughtswap_protocol::events;
use thoughtswap_protocol::payloads::{
    ClassStartedPayload, DistributionEntryView, DistributionUpdatePayload, NewPromptPayload,
    ParticipantView, ParticipantsUpdatePayload, ReceiveSwapPayload, RestoreStatePayload,
    RestoreStatus, SessionEndedPayload, SwapCompletedPayload, ThoughtDeletedPayload, ThoughtView,
    ThoughtsUpdatePayload,
};
use thoughtswap_protocol::OutboundEvent;
use thoughtswap_store::types::User;

use crate::error::Result;
use crate::logger;
use crate::types::{CurrentPrompt, DistEntry, Distribution, Effect, Outcome, Participant};

struct RoomInner {
    state: RoomState,
    max_swap_requests: u32,
    current_prompt: Option<CurrentPrompt>,
    participants: HashMap<ConnId, Participant>,
    distribution: Distribution,
}

/// Authoritative per-join-code live state (§3 Room, §4.5).
pub struct Room {
    join_code: JoinCode,
    course_id: String,
    session_id: String,
    teacher_id: UserId,
    db: Arc<Mutex<Connection>>,
    inner: Mutex<RoomInner>,
}

/// Outcome of a disconnect, so the caller (registry) can decide whether the
/// teacher-disconnect auto-end debounce applies (§4.9).
pub struct LeaveResult {
    pub outcome: Outcome,
    pub left_user_id: Option<UserId>,
    pub was_teacher: bool,
}

impl Room {
    pub(crate) fn new(
        join_code: JoinCode,
        course_id: String,
        session_id: String,
        teacher_id: UserId,
        max_swap_requests: u32,
        db: Arc<Mutex<Connection>>,
    ) -> Self {
        Self {
            join_code,
            course_id,
            session_id,
            teacher_id,
            db,
            inner: Mutex::new(RoomInner {
                state: RoomState::Idle,
                max_swap_requests,
                current_prompt: None,
                participants: HashMap::new(),
                distribution: Distribution::default(),
            }),
        }
    }

    /// Rebuild a Room from store state for a `TEACHER_REJOIN` the registry
    /// has no in-memory entry for (§4.4, §4.5). The live participant roster
    /// and volatile Distribution cannot be recovered — only PromptUse
    /// history survives a restart.
    pub(crate) fn hydrate(
        join_code: JoinCode,
        course_id: String,
        session_id: String,
        teacher_id: UserId,
        max_swap_requests: u32,
        db: Arc<Mutex<Connection>>,
    ) -> Result<Self> {
        let room = Self::new(join_code, course_id, session_id, teacher_id, max_swap_requests, db);
        let conn = room.db.lock().unwrap();
        if let Some(pu) = thoughtswap_store::prompts::latest_prompt_use(&conn, &room.session_id)
            .map_err(CoreError::from)?
        {
            let mut inner = room.inner.lock().unwrap();
            inner.state = RoomState::AwaitingSubmissions;
            inner.current_prompt = Some(CurrentPrompt {
                id: pu.id,
                content: pu.content,
                kind: pu.kind,
                options: pu.options,
            });
        }
        Ok(room)
    }

    pub fn join_code(&self) -> &JoinCode {
        &self.join_code
    }

    pub fn course_id(&self) -> &str {
        &self.course_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn teacher_id(&self) -> &UserId {
        &self.teacher_id
    }

    pub fn participant_count(&self) -> usize {
        self.inner.lock().unwrap().participants.len()
    }

    /// Snapshot of the current roster, for the gateway to resolve
    /// `Target::AllMembers`/`Target::Teachers` into connection ids (§9:
    /// the Room owns membership, the gateway owns delivery).
    pub fn participants(&self) -> Vec<Participant> {
        self.inner.lock().unwrap().participants.values().cloned().collect()
    }

    fn require_participant(inner: &RoomInner, conn_id: &ConnId) -> Result<Participant> {
        inner
            .participants
            .get(conn_id)
            .cloned()
            .ok_or_else(|| CoreError::Authz("not a participant of this room".into()))
    }

    fn require_role(inner: &RoomInner, conn_id: &ConnId, role: UserRole) -> Result<Participant> {
        let p = Self::require_participant(inner, conn_id)?;
        if p.role != role {
            return Err(CoreError::Authz(format!("command requires role {role}")));
        }
        Ok(p)
    }

    /// Teacher-only commands additionally require the caller to be *this*
    /// room's owning teacher (§4.5 TEACHER_SEND_PROMPT: "room exists and
    /// owned by caller").
    fn require_owning_teacher(&self, inner: &RoomInner, conn_id: &ConnId) -> Result<Participant> {
        let p = Self::require_role(inner, conn_id, UserRole::Teacher)?;
        if p.user_id != self.teacher_id {
            return Err(CoreError::Authz("not this room's teacher".into()));
        }
        Ok(p)
    }

    fn submission_count(&self, conn: &Connection, inner: &RoomInner) -> Result<usize> {
        match &inner.current_prompt {
            Some(p) => Ok(thoughtswap_store::thoughts::list_thoughts(conn, &p.id)
                .map_err(CoreError::from)?
                .len()),
            None => Ok(0),
        }
    }

    fn participants_update(&self, conn: &Connection, inner: &RoomInner) -> Result<Effect> {
        let participants = inner
            .participants
            .values()
            .map(|p| ParticipantView {
                connection_id: p.conn_id.to_string(),
                name: p.name.clone(),
            })
            .collect();
        let submission_count = self.submission_count(conn, inner)?;
        Ok(Effect::teachers(OutboundEvent::new(
            events::PARTICIPANTS_UPDATE,
            ParticipantsUpdatePayload {
                participants,
                submission_count,
            },
        )))
    }

    fn thoughts_update(&self, conn: &Connection, inner: &RoomInner) -> Result<Effect> {
        let thoughts = match &inner.current_prompt {
            Some(p) => thoughtswap_store::thoughts::list_thoughts(conn, &p.id)
                .map_err(CoreError::from)?
                .into_iter()
                .map(|t| ThoughtView {
                    id: t.thought.id,
                    content: t.thought.content,
                    author_name: t.author_name,
                })
                .collect(),
            None => Vec::new(),
        };
        Ok(Effect::teachers(OutboundEvent::new(
            events::THOUGHTS_UPDATE,
            ThoughtsUpdatePayload { thoughts },
        )))
    }

    /// Shared `Thought` (with joined author name) -> swap-engine input
    /// mapping, used by every command that feeds the current prompt's live
    /// thoughts into the Swap Engine (`trigger_swap`,
    /// `student_request_new_thought`, `teacher_reassign_distribution`).
    fn thought_inputs(
        thoughts: Vec<thoughtswap_store::types::ThoughtWithAuthor>,
    ) -> Vec<thoughtswap_swap::ThoughtInput> {
        thoughts
            .into_iter()
            .map(|t| thoughtswap_swap::ThoughtInput {
                content: t.thought.content,
                author_user_id: t.thought.author_id,
                author_name: t.author_name,
            })
            .collect()
    }

    fn distribution_update(&self, inner: &RoomInner) -> Effect {
        let mut distribution = HashMap::new();
        for (conn_id, entry) in inner.distribution.iter() {
            if let Some(p) = inner.participants.get(conn_id) {
                distribution.insert(
                    conn_id.to_string(),
                    DistributionEntryView {
                        student_name: p.name.clone(),
                        thought_content: entry.content.clone(),
                        original_author_name: entry.original_author_name.clone(),
                    },
                );
            }
        }
        Effect::teachers(OutboundEvent::new(
            events::DISTRIBUTION_UPDATE,
            DistributionUpdatePayload { distribution },
        ))
    }

    // -- JOIN_ROOM / TEACHER_START_CLASS / TEACHER_REJOIN ------------------

    /// `TEACHER_START_CLASS` (§4.9): the founding teacher's own join. No
    /// restoration work — the Room was just created.
    pub fn teacher_start(&self, conn_id: ConnId, teacher: &User) -> Result<Outcome> {
        // §5: every method that needs both `db` and `inner` at once takes
        // `db` first, then `inner` — here that means inserting the
        // participant under a short-lived `inner` lock, dropping it, then
        // acquiring `db` before `inner` is taken again. A mix of orderings
        // across methods is how a Room deadlocks under concurrent commands.
        {
            let mut inner = self.inner.lock().unwrap();
            inner.participants.insert(
                conn_id.clone(),
                Participant {
                    conn_id: conn_id.clone(),
                    user_id: UserId::from(teacher.id.clone()),
                    name: teacher.name.clone(),
                    role: UserRole::Teacher,
                },
            );
        }
        let conn = self.db.lock().unwrap();
        logger::log(
            &conn,
            events::LOG_START_CLASS,
            Some(&teacher.id),
            serde_json::json!({"joinCode": self.join_code.as_str()}),
        );
        let inner = self.inner.lock().unwrap();
        let class_started = Effect::to(
            conn_id,
            OutboundEvent::new(
                events::CLASS_STARTED,
                ClassStartedPayload {
                    join_code: self.join_code.to_string(),
                    session_id: self.session_id.clone(),
                    max_swap_requests: inner.max_swap_requests,
                },
            ),
        );
        let participants_update = self.participants_update(&conn, &inner)?;
        Ok(Outcome::new(vec![class_started, participants_update]))
    }

    /// `TEACHER_REJOIN` (§4.5): owner-only; replays `CLASS_STARTED` plus the
    /// current snapshot of every teacher-facing view.
    pub fn teacher_rejoin(&self, conn_id: ConnId, teacher: &User) -> Result<Outcome> {
        if teacher.id != self.teacher_id.as_str() {
            return Err(CoreError::Authz("not this room's teacher".into()));
        }
        {
            let mut inner = self.inner.lock().unwrap();
            inner.participants.insert(
                conn_id.clone(),
                Participant {
                    conn_id: conn_id.clone(),
                    user_id: UserId::from(teacher.id.clone()),
                    name: teacher.name.clone(),
                    role: UserRole::Teacher,
                },
            );
        }
        let conn = self.db.lock().unwrap();
        let inner = self.inner.lock().unwrap();
        let class_started = Effect::to(
            conn_id,
            OutboundEvent::new(
                events::CLASS_STARTED,
                ClassStartedPayload {
                    join_code: self.join_code.to_string(),
                    session_id: self.session_id.clone(),
                    max_swap_requests: inner.max_swap_requests,
                },
            ),
        );
        let participants_update = self.participants_update(&conn, &inner)?;
        let thoughts_update = self.thoughts_update(&conn, &inner)?;
        let distribution_update = self.distribution_update(&inner);
        Ok(Outcome::new(vec![
            class_started,
            participants_update,
            thoughts_update,
            distribution_update,
        ]))
    }

    /// `JOIN_ROOM` (§4.5 rejoin & restoration): any role, but the
    /// restoration snapshot only applies to students. A reconnecting
    /// student is told exactly one of `NEW_PROMPT`, `RESTORE_STATE
    /// {SUBMITTED}`, or `RECEIVE_SWAP` + `RESTORE_STATE {DISCUSSING}`.
    pub fn join(&self, conn_id: ConnId, user: &User) -> Result<Outcome> {
        let role = user.role;
        let user_id = UserId::from(user.id.clone());
        {
            let mut inner = self.inner.lock().unwrap();
            inner.participants.insert(
                conn_id.clone(),
                Participant {
                    conn_id: conn_id.clone(),
                    user_id: user_id.clone(),
                    name: user.name.clone(),
                    role,
                },
            );
        }

        let conn = self.db.lock().unwrap();
        logger::log(
            &conn,
            events::LOG_JOIN_ROOM,
            Some(&user.id),
            serde_json::json!({"joinCode": self.join_code.as_str()}),
        );

        let mut inner = self.inner.lock().unwrap();
        let mut effects = vec![
            Effect::to(conn_id.clone(), OutboundEvent::new(events::JOIN_SUCCESS, serde_json::json!({
                "joinCode": self.join_code.as_str(),
            }))),
            self.participants_update(&conn, &inner)?,
        ];

        if role == UserRole::Student {
            if let Some(prompt) = inner.current_prompt.clone() {
                let has_submitted = thoughtswap_store::thoughts::list_thoughts(&conn, &prompt.id)
                    .map_err(CoreError::from)?
                    .iter()
                    .any(|t| t.thought.author_id == user.id);

                let dist_entry = inner
                    .distribution
                    .get_by_conn(&conn_id)
                    .or_else(|| inner.distribution.get_by_user(&user_id))
                    .cloned();

                if let Some(entry) = dist_entry {
                    // Re-key onto this connection so a later
                    // `DISTRIBUTION_UPDATE`/second reconnect still finds this
                    // student, even if the entry was only recovered via
                    // `get_by_user` under a stale, already-gone connection id
                    // (§9 Distribution keying open question).
                    inner.distribution.rebind_conn(conn_id.clone(), user_id.clone());
                    effects.push(Effect::to(
                        conn_id.clone(),
                        OutboundEvent::new(
                            events::RECEIVE_SWAP,
                            ReceiveSwapPayload {
                                content: entry.content.clone(),
                            },
                        ),
                    ));
                    effects.push(Effect::to(
                        conn_id.clone(),
                        OutboundEvent::new(
                            events::RESTORE_STATE,
                            RestoreStatePayload {
                                status: RestoreStatus::Discussing,
                                prompt: Some(prompt.content.clone()),
                                prompt_use_id: Some(prompt.id.clone()),
                                kind: Some(prompt.kind),
                                options: if prompt.options.is_empty() {
                                    None
                                } else {
                                    Some(prompt.options.clone())
                                },
                            },
                        ),
                    ));
                } else if has_submitted {
                    effects.push(Effect::to(
                        conn_id.clone(),
                        OutboundEvent::new(
                            events::RESTORE_STATE,
                            RestoreStatePayload {
                                status: RestoreStatus::Submitted,
                                prompt: Some(prompt.content.clone()),
                                prompt_use_id: Some(prompt.id.clone()),
                                kind: Some(prompt.kind),
                                options: if prompt.options.is_empty() {
                                    None
                                } else {
                                    Some(prompt.options.clone())
                                },
                            },
                        ),
                    ));
                } else {
                    effects.push(Effect::to(
                        conn_id,
                        OutboundEvent::new(
                            events::NEW_PROMPT,
                            NewPromptPayload {
                                content: prompt.content.clone(),
                                prompt_use_id: prompt.id.clone(),
                                kind: prompt.kind,
                                options: if prompt.options.is_empty() {
                                    None
                                } else {
                                    Some(prompt.options.clone())
                                },
                            },
                        ),
                    ));
                }
            }
        }

        Ok(Outcome::new(effects))
    }

    // -- TEACHER_SEND_PROMPT ------------------------------------------------

    pub fn teacher_send_prompt(
        &self,
        conn_id: &ConnId,
        content: &str,
        kind: PromptKind,
        options: Option<Vec<String>>,
    ) -> Result<Outcome> {
        let content = content.trim();
        if content.is_empty() {
            return Err(CoreError::Precondition("Prompt content cannot be empty.".into()));
        }

        let cleaned_options: Vec<String> = options
            .unwrap_or_default()
            .into_iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        if kind == PromptKind::Mc
            && !(MC_OPTIONS_MIN..=MC_OPTIONS_MAX).contains(&cleaned_options.len())
        {
            return Err(CoreError::Precondition(format!(
                "Multiple choice prompts need {MC_OPTIONS_MIN}-{MC_OPTIONS_MAX} options."
            )));
        }
        let options = if kind == PromptKind::Mc { cleaned_options } else { Vec::new() };

        {
            let inner = self.inner.lock().unwrap();
            self.require_owning_teacher(&inner, conn_id)?;
        }

        let conn = self.db.lock().unwrap();
        let prompt_use =
            thoughtswap_store::prompts::append_prompt_use(&conn, &self.session_id, content, kind, &options)
                .map_err(CoreError::from)?;
        logger::log(
            &conn,
            events::LOG_SEND_PROMPT,
            Some(self.teacher_id.as_str()),
            serde_json::json!({"joinCode": self.join_code.as_str(), "promptUseId": prompt_use.id}),
        );

        let mut inner = self.inner.lock().unwrap();
        inner.current_prompt = Some(CurrentPrompt {
            id: prompt_use.id.clone(),
            content: prompt_use.content.clone(),
            kind,
            options: prompt_use.options.clone(),
        });
        inner.distribution.clear();
        inner.state = RoomState::AwaitingSubmissions;

        let new_prompt = Effect::all(OutboundEvent::new(
            events::NEW_PROMPT,
            NewPromptPayload {
                content: prompt_use.content,
                prompt_use_id: prompt_use.id,
                kind,
                options: if prompt_use.options.is_empty() {
                    None
                } else {
                    Some(prompt_use.options)
                },
            },
        ));
        let thoughts_update = self.thoughts_update(&conn, &inner)?;
        Ok(Outcome::new(vec![new_prompt, thoughts_update]))
    }

    // -- SUBMIT_THOUGHT ------------------------------------------------------

    pub fn submit_thought(
        &self,
        conn_id: &ConnId,
        content: &str,
        prompt_use_id: &str,
    ) -> Result<Outcome> {
        let inner = self.inner.lock().unwrap();
        let p = Self::require_role(&inner, conn_id, UserRole::Student)?;

        let Some(current) = inner.current_prompt.clone() else {
            return Ok(Outcome::default());
        };
        if current.id != prompt_use_id {
            // Stale submission from a previous prompt — discarded silently (§4.5).
            return Ok(Outcome::default());
        }
        let prompt_use_id = current.id;
        drop(inner);

        let content = content.trim();
        if content.is_empty() {
            return Err(CoreError::Precondition("Thought cannot be empty.".into()));
        }

        let conn = self.db.lock().unwrap();
        thoughtswap_store::thoughts::insert_thought(&conn, &prompt_use_id, p.user_id.as_str(), content)
            .map_err(CoreError::from)?;
        logger::log(
            &conn,
            events::LOG_SUBMIT_THOUGHT,
            Some(p.user_id.as_str()),
            serde_json::json!({"joinCode": self.join_code.as_str(), "promptUseId": prompt_use_id}),
        );

        let inner = self.inner.lock().unwrap();
        let participants_update = self.participants_update(&conn, &inner)?;
        let thoughts_update = self.thoughts_update(&conn, &inner)?;
        Ok(Outcome::new(vec![participants_update, thoughts_update]))
    }

    // -- TEACHER_DELETE_THOUGHT -----------------------------------------------

    pub fn teacher_delete_thought(&self, conn_id: &ConnId, thought_id: &str) -> Result<Outcome> {
        let inner = self.inner.lock().unwrap();
        self.require_owning_teacher(&inner, conn_id)?;
        drop(inner);

        let conn = self.db.lock().unwrap();
        let (thought, _prompt_use) =
            thoughtswap_store::thoughts::delete_thought(&conn, thought_id).map_err(CoreError::from)?;
        logger::log(
            &conn,
            events::LOG_DELETE_THOUGHT,
            Some(self.teacher_id.as_str()),
            serde_json::json!({"joinCode": self.join_code.as_str(), "thoughtId": thought_id}),
        );

        let inner = self.inner.lock().unwrap();
        let mut effects = vec![self.participants_update(&conn, &inner)?, self.thoughts_update(&conn, &inner)?];

        let author_conn = inner
            .participants
            .values()
            .find(|p| p.user_id.as_str() == thought.author_id)
            .map(|p| p.conn_id.clone());
        if let Some(author_conn) = author_conn {
            effects.push(Effect::to(
                author_conn,
                OutboundEvent::new(
                    events::THOUGHT_DELETED,
                    ThoughtDeletedPayload {
                        message: "Your teacher removed your thought. You can submit a new one.".into(),
                    },
                ),
            ));
        }
        Ok(Outcome::new(effects))
    }

    // -- TRIGGER_SWAP ----------------------------------------------------------

    pub fn trigger_swap(&self, conn_id: &ConnId) -> Result<Outcome> {
        let inner = self.inner.lock().unwrap();
        self.require_owning_teacher(&inner, conn_id)?;
        let Some(current) = inner.current_prompt.clone() else {
            return Err(CoreError::Precondition("There is no active prompt to swap.".into()));
        };
        drop(inner);

        let conn = self.db.lock().unwrap();
        let thoughts = thoughtswap_store::thoughts::list_thoughts(&conn, &current.id)
            .map_err(CoreError::from)?;
        if thoughts.is_empty() {
            return Err(CoreError::Precondition(
                "Add at least one thought before swapping.".into(),
            ));
        }
        let thought_inputs = Self::thought_inputs(thoughts);

        let mut inner = self.inner.lock().unwrap();
        let recipients: Vec<thoughtswap_swap::RecipientInput> = inner
            .participants
            .values()
            .filter(|p| p.role == UserRole::Student)
            .map(|p| thoughtswap_swap::RecipientInput {
                connection_id: p.conn_id.to_string(),
                user_id: p.user_id.to_string(),
            })
            .collect();

        let assignments = thoughtswap_swap::compute_distribution(&thought_inputs, &recipients);

        logger::log(
            &conn,
            events::LOG_TRIGGER_SWAP,
            Some(self.teacher_id.as_str()),
            serde_json::json!({"joinCode": self.join_code.as_str(), "count": assignments.len()}),
        );

        inner.distribution.clear();
        let mut effects = Vec::new();
        for (conn_id_str, assignment) in assignments.iter() {
            let recipient_conn = ConnId(conn_id_str.clone());
            let recipient_user = inner
                .participants
                .get(&recipient_conn)
                .map(|p| p.user_id.clone());
            if let Some(user_id) = recipient_user {
                inner.distribution.set(
                    recipient_conn.clone(),
                    user_id,
                    DistEntry {
                        content: assignment.content.clone(),
                        author_user_id: UserId::from(assignment.author_user_id.clone()),
                        original_author_name: assignment.original_author_name.clone(),
                    },
                );
                effects.push(Effect::to(
                    recipient_conn,
                    OutboundEvent::new(
                        events::RECEIVE_SWAP,
                        ReceiveSwapPayload {
                            content: assignment.content.clone(),
                        },
                    ),
                ));
            }
        }
        inner.state = RoomState::Swapped;

        effects.push(self.distribution_update(&inner));
        effects.push(Effect::to(
            conn_id.clone(),
            OutboundEvent::new(
                events::SWAP_COMPLETED,
                SwapCompletedPayload {
                    count: assignments.len(),
                },
            ),
        ));
        Ok(Outcome::new(effects))
    }

    // -- STUDENT_REQUEST_NEW_THOUGHT -------------------------------------------

    pub fn student_request_new_thought(
        &self,
        conn_id: &ConnId,
        current_content: &str,
    ) -> Result<Outcome> {
        let inner = self.inner.lock().unwrap();
        let p = Self::require_role(&inner, conn_id, UserRole::Student)?;
        if inner.state != RoomState::Swapped {
            return Err(CoreError::Precondition("No swap has happened yet.".into()));
        }
        let Some(current) = inner.current_prompt.clone() else {
            return Err(CoreError::Precondition("There is no active prompt.".into()));
        };
        let max_swap_requests = inner.max_swap_requests;
        drop(inner);

        let conn = self.db.lock().unwrap();
        let used = thoughtswap_store::swaps::count_swap_requests(&conn, p.user_id.as_str(), &self.session_id)
            .map_err(CoreError::from)?;
        if used >= max_swap_requests {
            return Err(CoreError::Precondition(
                "Limit reached: you've used all your re-swap requests for this session.".into(),
            ));
        }

        let thoughts = thoughtswap_store::thoughts::list_thoughts(&conn, &current.id)
            .map_err(CoreError::from)?;
        let thought_inputs = Self::thought_inputs(thoughts);
        let Some(picked) =
            thoughtswap_swap::pick_reswap_thought(&thought_inputs, p.user_id.as_str(), current_content)
        else {
            return Err(CoreError::Precondition(
                "No other thoughts are available to swap to right now.".into(),
            ));
        };

        thoughtswap_store::swaps::record_swap_request(&conn, p.user_id.as_str(), &self.session_id)
            .map_err(CoreError::from)?;
        logger::log(
            &conn,
            events::LOG_REQUEST_RESWAP,
            Some(p.user_id.as_str()),
            serde_json::json!({"joinCode": self.join_code.as_str()}),
        );

        let mut inner = self.inner.lock().unwrap();
        inner.distribution.set(
            conn_id.clone(),
            p.user_id.clone(),
            DistEntry {
                content: picked.content.clone(),
                author_user_id: UserId::from(picked.author_user_id.clone()),
                original_author_name: picked.author_name.clone(),
            },
        );
        let receive_swap = Effect::to(
            conn_id.clone(),
            OutboundEvent::new(
                events::RECEIVE_SWAP,
                ReceiveSwapPayload {
                    content: picked.content,
                },
            ),
        );
        let distribution_update = self.distribution_update(&inner);
        Ok(Outcome::new(vec![receive_swap, distribution_update]))
    }

    // -- TEACHER_REASSIGN_DISTRIBUTION ------------------------------------------

    pub fn teacher_reassign_distribution(
        &self,
        conn_id: &ConnId,
        student_connection_id: &str,
    ) -> Result<Outcome> {
        let inner = self.inner.lock().unwrap();
        self.require_owning_teacher(&inner, conn_id)?;
        let target_conn = ConnId(student_connection_id.to_string());
        let target = inner
            .participants
            .get(&target_conn)
            .cloned()
            .filter(|p| p.role == UserRole::Student)
            .ok_or_else(|| CoreError::NotFound("student not found in this room".into()))?;
        let Some(current) = inner.current_prompt.clone() else {
            return Err(CoreError::Precondition("There is no active prompt.".into()));
        };
        let current_content = inner
            .distribution
            .get_by_conn(&target_conn)
            .map(|e| e.content.clone())
            .unwrap_or_default();
        drop(inner);

        let conn = self.db.lock().unwrap();
        let thoughts = thoughtswap_store::thoughts::list_thoughts(&conn, &current.id)
            .map_err(CoreError::from)?;
        let thought_inputs = Self::thought_inputs(thoughts);
        let Some(picked) = thoughtswap_swap::pick_reassignment_thought(
            &thought_inputs,
            target.user_id.as_str(),
            &current_content,
        ) else {
            return Err(CoreError::Precondition(
                "No alternate thought is available for this student.".into(),
            ));
        };
        logger::log(
            &conn,
            events::LOG_REQUEST_RESWAP,
            Some(self.teacher_id.as_str()),
            serde_json::json!({"joinCode": self.join_code.as_str(), "studentConnectionId": student_connection_id}),
        );

        let mut inner = self.inner.lock().unwrap();
        inner.distribution.set(
            target_conn.clone(),
            target.user_id,
            DistEntry {
                content: picked.content.clone(),
                author_user_id: UserId::from(picked.author_user_id.clone()),
                original_author_name: picked.author_name.clone(),
            },
        );
        let receive_swap = Effect::to(
            target_conn,
            OutboundEvent::new(
                events::RECEIVE_SWAP,
                ReceiveSwapPayload {
                    content: picked.content,
                },
            ),
        );
        let distribution_update = self.distribution_update(&inner);
        Ok(Outcome::new(vec![receive_swap, distribution_update]))
    }

    // -- UPDATE_SESSION_SETTINGS -------------------------------------------------

    pub fn update_session_settings(&self, conn_id: &ConnId, max_swap_requests: u32) -> Result<Outcome> {
        {
            let inner = self.inner.lock().unwrap();
            self.require_owning_teacher(&inner, conn_id)?;
        }

        let conn = self.db.lock().unwrap();
        thoughtswap_store::courses::update_max_swap_requests(&conn, &self.session_id, max_swap_requests)
            .map_err(CoreError::from)?;
        logger::log(
            &conn,
            events::LOG_UPDATE_SETTINGS,
            Some(self.teacher_id.as_str()),
            serde_json::json!({"joinCode": self.join_code.as_str(), "maxSwapRequests": max_swap_requests}),
        );

        let mut inner = self.inner.lock().unwrap();
        inner.max_swap_requests = max_swap_requests;
        Ok(Outcome::default())
    }

    // -- TEACHER_RESET_STATE ------------------------------------------------------

    /// Clears the Distribution and returns the Room to `AWAITING_SUBMISSIONS`
    /// for the existing PromptUse, without ending the Session (§6 lists the
    /// event; §4.5 does not spell out its transition — resolved in
    /// DESIGN.md). The current prompt and its already-submitted Thoughts
    /// stay intact — only the swap assignments are discarded.
    pub fn teacher_reset_state(&self, conn_id: &ConnId) -> Result<Outcome> {
        {
            let inner = self.inner.lock().unwrap();
            self.require_owning_teacher(&inner, conn_id)?;
        }

        let conn = self.db.lock().unwrap();
        logger::log(
            &conn,
            events::LOG_RESET_STATE,
            Some(self.teacher_id.as_str()),
            serde_json::json!({"joinCode": self.join_code.as_str()}),
        );

        let mut inner = self.inner.lock().unwrap();
        inner.distribution.clear();
        inner.state = RoomState::AwaitingSubmissions;

        let participants_update = self.participants_update(&conn, &inner)?;
        let thoughts_update = self.thoughts_update(&conn, &inner)?;
        let distribution_update = self.distribution_update(&inner);
        Ok(Outcome::new(vec![
            participants_update,
            thoughts_update,
            distribution_update,
        ]))
    }

    // -- END_SESSION ------------------------------------------------------------

    pub fn end_session(&self, conn_id: &ConnId, survey_link: Option<String>) -> Result<Outcome> {
        let inner = self.inner.lock().unwrap();
        self.require_owning_teacher(&inner, conn_id)?;
        drop(inner);

        let conn = self.db.lock().unwrap();
        thoughtswap_store::courses::complete_session(&conn, &self.session_id).map_err(CoreError::from)?;
        logger::log(
            &conn,
            events::LOG_END_SESSION,
            Some(self.teacher_id.as_str()),
            serde_json::json!({"joinCode": self.join_code.as_str()}),
        );

        let ended = Effect::all(OutboundEvent::new(
            events::SESSION_ENDED,
            SessionEndedPayload { survey_link },
        ));
        Ok(Outcome::destroying(vec![ended]))
    }

    /// Auto-end path (§4.9 teacher disconnect, debounced by the registry).
    /// Returns the `SESSION_ENDED` broadcast so the registry can deliver it
    /// before tearing the Room down.
    pub(crate) fn auto_end(&self) -> Result<Outcome> {
        let conn = self.db.lock().unwrap();
        thoughtswap_store::courses::complete_session(&conn, &self.session_id).map_err(CoreError::from)?;
        logger::log(
            &conn,
            events::LOG_SESSION_AUTO_ENDED,
            Some(self.teacher_id.as_str()),
            serde_json::json!({"joinCode": self.join_code.as_str()}),
        );
        let ended = Effect::all(OutboundEvent::new(
            events::SESSION_ENDED,
            SessionEndedPayload { survey_link: None },
        ));
        Ok(Outcome::destroying(vec![ended]))
    }

    // -- Disconnect -----------------------------------------------------------

    /// A connection dropped (§5 "a client disconnect cancels in-flight
    /// handlers"). Removes the participant and re-broadcasts
    /// `PARTICIPANTS_UPDATE`; tells the caller whether this was the owning
    /// teacher so it can arm the auto-end debounce (§4.9).
    pub fn leave(&self, conn_id: &ConnId) -> Result<LeaveResult> {
        let removed = {
            let mut inner = self.inner.lock().unwrap();
            inner.participants.remove(conn_id)
        };
        let Some(removed) = removed else {
            return Ok(LeaveResult {
                outcome: Outcome::default(),
                left_user_id: None,
                was_teacher: false,
            });
        };
        let was_teacher = removed.role == UserRole::Teacher && removed.user_id == self.teacher_id;

        let conn = self.db.lock().unwrap();
        let inner = self.inner.lock().unwrap();
        let participants_update = self.participants_update(&conn, &inner)?;
        Ok(LeaveResult {
            outcome: Outcome::new(vec![participants_update]),
            left_user_id: Some(removed.user_id),
            was_teacher,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memdb() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        thoughtswap_store::db::init_db(&conn).unwrap();
        Arc::new(Mutex::new(conn))
    }

    fn make_user(db: &Arc<Mutex<Connection>>, email: &str, name: &str, role: UserRole) -> User {
        let conn = db.lock().unwrap();
        thoughtswap_store::users::upsert_user(&conn, None, email, name, role).unwrap()
    }

    /// A Room with one teacher already seated, its founding Course + Session
    /// already in the store, ready to drive through a command sequence.
    fn new_room(db: &Arc<Mutex<Connection>>, teacher: &User, max_swap_requests: u32) -> (Room, ConnId) {
        let join_code = JoinCode::random();
        let (course, session) = {
            let conn = db.lock().unwrap();
            thoughtswap_store::courses::create_course_with_session(
                &conn,
                &teacher.id,
                "Period 3",
                join_code.as_str(),
                max_swap_requests,
            )
            .unwrap()
        };
        let room = Room::new(
            join_code,
            course.id,
            session.id,
            UserId::from(teacher.id.clone()),
            max_swap_requests,
            db.clone(),
        );
        let teacher_conn = ConnId::new();
        room.teacher_start(teacher_conn.clone(), teacher).unwrap();
        (room, teacher_conn)
    }

    fn find_payload<'a>(outcome: &'a Outcome, event: &str) -> &'a serde_json::Value {
        &outcome
            .effects
            .iter()
            .find(|e| e.event.event == event)
            .unwrap_or_else(|| panic!("no {event} effect in outcome"))
            .event
            .payload
    }

    /// Sends a Text prompt and returns its `promptUseId`, so callers can
    /// submit Thoughts against the right PromptUse.
    fn send_prompt(room: &Room, teacher_conn: &ConnId, content: &str) -> String {
        let outcome = room
            .teacher_send_prompt(teacher_conn, content, PromptKind::Text, None)
            .unwrap();
        find_payload(&outcome, events::NEW_PROMPT)["promptUseId"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn full_sequence_start_join_prompt_submit_swap() {
        let db = memdb();
        let teacher = make_user(&db, "t@school.edu", "Ms. Frizzle", UserRole::Teacher);
        let (room, teacher_conn) = new_room(&db, &teacher, 1);

        let alice = make_user(&db, "alice@school.edu", "Alice", UserRole::Student);
        let bob = make_user(&db, "bob@school.edu", "Bob", UserRole::Student);
        let alice_conn = ConnId::new();
        let bob_conn = ConnId::new();
        room.join(alice_conn.clone(), &alice).unwrap();
        room.join(bob_conn.clone(), &bob).unwrap();
        assert_eq!(room.participant_count(), 3);

        let prompt_use_id = send_prompt(&room, &teacher_conn, "What's one thing you learned?");
        room.submit_thought(&alice_conn, "Photosynthesis", &prompt_use_id).unwrap();
        room.submit_thought(&bob_conn, "Mitosis", &prompt_use_id).unwrap();

        let outcome = room.trigger_swap(&teacher_conn).unwrap();
        let completed = find_payload(&outcome, events::SWAP_COMPLETED);
        assert_eq!(completed["count"], 2);

        // §4.6 constraint 2: with exactly two students, each must receive
        // the other's thought, never their own.
        let alice_outcome = room.join(alice_conn.clone(), &alice).unwrap();
        let receive_swap = find_payload(&alice_outcome, events::RECEIVE_SWAP);
        assert_eq!(receive_swap["content"], "Mitosis");
    }

    #[test]
    fn reconnect_mid_swap_restores_distribution_under_new_connection() {
        let db = memdb();
        let teacher = make_user(&db, "t@school.edu", "Ms. Frizzle", UserRole::Teacher);
        let (room, teacher_conn) = new_room(&db, &teacher, 1);

        let alice = make_user(&db, "alice@school.edu", "Alice", UserRole::Student);
        let bob = make_user(&db, "bob@school.edu", "Bob", UserRole::Student);
        let alice_conn = ConnId::new();
        let bob_conn = ConnId::new();
        room.join(alice_conn.clone(), &alice).unwrap();
        room.join(bob_conn.clone(), &bob).unwrap();

        let prompt_use_id = send_prompt(&room, &teacher_conn, "Prompt");
        room.submit_thought(&alice_conn, "A", &prompt_use_id).unwrap();
        room.submit_thought(&bob_conn, "B", &prompt_use_id).unwrap();
        room.trigger_swap(&teacher_conn).unwrap();

        // Alice reconnects under a fresh connection id; she must still find
        // her assignment (§9 Distribution keying open question).
        let alice_conn2 = ConnId::new();
        let outcome = room.join(alice_conn2, &alice).unwrap();
        let receive_swap = find_payload(&outcome, events::RECEIVE_SWAP);
        assert_eq!(receive_swap["content"], "B");
        assert_eq!(find_payload(&outcome, events::RESTORE_STATE)["status"], "DISCUSSING");
    }

    #[test]
    fn teacher_reset_state_keeps_current_prompt_and_thoughts() {
        let db = memdb();
        let teacher = make_user(&db, "t@school.edu", "Ms. Frizzle", UserRole::Teacher);
        let (room, teacher_conn) = new_room(&db, &teacher, 1);
        let alice = make_user(&db, "alice@school.edu", "Alice", UserRole::Student);
        let alice_conn = ConnId::new();
        room.join(alice_conn.clone(), &alice).unwrap();

        let prompt_use_id = send_prompt(&room, &teacher_conn, "Prompt");
        room.submit_thought(&alice_conn, "Photosynthesis", &prompt_use_id).unwrap();
        room.trigger_swap(&teacher_conn).unwrap();

        let outcome = room.teacher_reset_state(&teacher_conn).unwrap();

        // The Distribution is gone, but the PromptUse and its submitted
        // Thoughts remain visible — only the swap assignments are cleared.
        let thoughts = find_payload(&outcome, events::THOUGHTS_UPDATE);
        assert_eq!(thoughts["thoughts"].as_array().unwrap().len(), 1);
        let distribution = find_payload(&outcome, events::DISTRIBUTION_UPDATE);
        assert!(distribution["distribution"].as_object().unwrap().is_empty());

        // A fresh submission under the same prompt is still accepted, which
        // would be impossible had the prompt been cleared back to IDLE.
        let bob = make_user(&db, "bob@school.edu", "Bob", UserRole::Student);
        let bob_conn = ConnId::new();
        room.join(bob_conn.clone(), &bob).unwrap();
        room.submit_thought(&bob_conn, "Mitosis", &prompt_use_id).unwrap();
    }

    #[test]
    fn student_request_new_thought_respects_quota() {
        let db = memdb();
        let teacher = make_user(&db, "t@school.edu", "Ms. Frizzle", UserRole::Teacher);
        let (room, teacher_conn) = new_room(&db, &teacher, 1);
        let alice = make_user(&db, "alice@school.edu", "Alice", UserRole::Student);
        let bob = make_user(&db, "bob@school.edu", "Bob", UserRole::Student);
        let carol = make_user(&db, "carol@school.edu", "Carol", UserRole::Student);
        let alice_conn = ConnId::new();
        let bob_conn = ConnId::new();
        let carol_conn = ConnId::new();
        room.join(alice_conn.clone(), &alice).unwrap();
        room.join(bob_conn.clone(), &bob).unwrap();
        room.join(carol_conn.clone(), &carol).unwrap();

        let prompt_use_id = send_prompt(&room, &teacher_conn, "Prompt");
        room.submit_thought(&alice_conn, "A", &prompt_use_id).unwrap();
        room.submit_thought(&bob_conn, "B", &prompt_use_id).unwrap();
        room.submit_thought(&carol_conn, "C", &prompt_use_id).unwrap();
        room.trigger_swap(&teacher_conn).unwrap();

        let current_content = {
            let outcome = room.join(alice_conn.clone(), &alice).unwrap();
            find_payload(&outcome, events::RECEIVE_SWAP)["content"]
                .as_str()
                .unwrap()
                .to_string()
        };

        room.student_request_new_thought(&alice_conn, &current_content).unwrap();
        let err = room
            .student_request_new_thought(&alice_conn, &current_content)
            .unwrap_err();
        assert!(matches!(err, CoreError::Precondition(_)));
    }

    #[test]
    fn non_owning_teacher_cannot_moderate_another_teachers_room() {
        let db = memdb();
        let teacher = make_user(&db, "t@school.edu", "Ms. Frizzle", UserRole::Teacher);
        let (room, _) = new_room(&db, &teacher, 1);

        let impostor = make_user(&db, "other@school.edu", "Mr. Keating", UserRole::Teacher);
        let impostor_conn = ConnId::new();
        room.join(impostor_conn.clone(), &impostor).unwrap();

        let err = room
            .teacher_send_prompt(&impostor_conn, "Prompt", PromptKind::Text, None)
            .unwrap_err();
        assert!(matches!(err, CoreError::Authz(_)));
    }

    #[test]
    fn leave_flags_owning_teacher_disconnect() {
        let db = memdb();
        let teacher = make_user(&db, "t@school.edu", "Ms. Frizzle", UserRole::Teacher);
        let (room, teacher_conn) = new_room(&db, &teacher, 1);
        let alice = make_user(&db, "alice@school.edu", "Alice", UserRole::Student);
        let alice_conn = ConnId::new();
        room.join(alice_conn.clone(), &alice).unwrap();

        let result = room.leave(&alice_conn).unwrap();
        assert!(!result.was_teacher);
        assert_eq!(room.participant_count(), 2);

        let result = room.leave(&teacher_conn).unwrap();
        assert!(result.was_teacher);
        assert_eq!(room.participant_count(), 1);
    }
}
