//! One function per wire event (§6). Every handler returns the participant
//! snapshot alongside the `Outcome` it produced, since by the time
//! `dispatch::route` delivers it the Room may already be gone (`END_SESSION`)
//! — callers that never touch a Room (saved prompts, admin, consent) just
//! return an empty snapshot, which `ConnectionRegistry::deliver` tolerates
//! fine since those outcomes only ever address `Target::Connection`.

use std::sync::Arc;

use thoughtswap_core::{CoreError, JoinCode, UserRole};
use thoughtswap_protocol::payloads::{
    DeleteSavedPromptPayload, JoinCodeOnlyPayload, JoinRoomPayload, PreviousSessionView,
    PreviousSessionsPayload, SavePromptPayload, SavedPromptView, SavedPromptsListPayload,
    StudentRequestNewThoughtPayload, SubmitThoughtPayload, TeacherDeleteThoughtPayload,
    TeacherReassignDistributionPayload, TeacherSendPromptPayload, UpdateConsentPayload,
    UpdateSessionSettingsPayload,
};
use thoughtswap_protocol::{events, OutboundEvent};
use thoughtswap_room::{Effect, Outcome, Participant, Room};
use thoughtswap_store::types::SessionStatus;

use crate::app::AppState;
use crate::ws::connection::ConnContext;

pub type HandlerResult = Result<(Vec<Participant>, Outcome), CoreError>;

fn solo(conn_id: thoughtswap_core::ConnId, event: OutboundEvent) -> HandlerResult {
    Ok((Vec::new(), Outcome::new(vec![Effect::to(conn_id, event)])))
}

fn require_role(ctx: &ConnContext, role: UserRole) -> Result<(), CoreError> {
    if ctx.user.role != role {
        return Err(CoreError::Authz(format!("command requires role {role}")));
    }
    Ok(())
}

fn get_room(app: &Arc<AppState>, join_code_str: &str) -> Result<Arc<Room>, CoreError> {
    let join_code = JoinCode::normalize(join_code_str);
    app.registry
        .get(&join_code)
        .ok_or_else(|| CoreError::NotFound("Invalid Room Code".into()))
}

// -- JOIN_ROOM / TEACHER_START_CLASS / TEACHER_REJOIN -----------------------

pub fn join_room(app: &Arc<AppState>, ctx: &mut ConnContext, p: JoinRoomPayload) -> HandlerResult {
    let join_code = JoinCode::normalize(&p.join_code);
    let (room, outcome) = app.registry.join(ctx.conn_id.clone(), &ctx.user, &join_code)?;
    ctx.join_code = Some(join_code);
    Ok((room.participants(), outcome))
}

pub fn teacher_start_class(
    app: &Arc<AppState>,
    ctx: &mut ConnContext,
    payload: serde_json::Value,
) -> HandlerResult {
    require_role(ctx, UserRole::Teacher)?;
    let title = payload
        .get("title")
        .and_then(|v| v.as_str())
        .unwrap_or("Untitled Class");
    let max_swap_requests = payload
        .get("maxSwapRequests")
        .and_then(|v| v.as_u64())
        .map(|v| v as u32)
        .unwrap_or(app.config.session.default_max_swap_requests);
    let (room, outcome) =
        app.registry
            .teacher_start_class(ctx.conn_id.clone(), &ctx.user, title, max_swap_requests)?;
    ctx.join_code = Some(room.join_code().clone());
    Ok((room.participants(), outcome))
}

pub fn teacher_rejoin(
    app: &Arc<AppState>,
    ctx: &mut ConnContext,
    p: JoinCodeOnlyPayload,
) -> HandlerResult {
    require_role(ctx, UserRole::Teacher)?;
    let join_code = JoinCode::normalize(&p.join_code);
    let (room, outcome) = app.registry.teacher_rejoin(ctx.conn_id.clone(), &ctx.user, &join_code)?;
    ctx.join_code = Some(join_code);
    Ok((room.participants(), outcome))
}

// -- Teacher-side room commands ----------------------------------------------

pub fn teacher_send_prompt(
    app: &Arc<AppState>,
    ctx: &mut ConnContext,
    p: TeacherSendPromptPayload,
) -> HandlerResult {
    let room = get_room(app, &p.join_code)?;
    let outcome = room.teacher_send_prompt(&ctx.conn_id, &p.content, p.kind, p.options)?;
    Ok((room.participants(), outcome))
}

pub fn teacher_delete_thought(
    app: &Arc<AppState>,
    ctx: &mut ConnContext,
    p: TeacherDeleteThoughtPayload,
) -> HandlerResult {
    let room = get_room(app, &p.join_code)?;
    let outcome = room.teacher_delete_thought(&ctx.conn_id, &p.thought_id)?;
    Ok((room.participants(), outcome))
}

pub fn teacher_reassign_distribution(
    app: &Arc<AppState>,
    ctx: &mut ConnContext,
    p: TeacherReassignDistributionPayload,
) -> HandlerResult {
    let room = get_room(app, &p.join_code)?;
    let outcome = room.teacher_reassign_distribution(&ctx.conn_id, &p.student_connection_id)?;
    Ok((room.participants(), outcome))
}

pub fn teacher_reset_state(
    app: &Arc<AppState>,
    ctx: &mut ConnContext,
    p: JoinCodeOnlyPayload,
) -> HandlerResult {
    let room = get_room(app, &p.join_code)?;
    let outcome = room.teacher_reset_state(&ctx.conn_id)?;
    Ok((room.participants(), outcome))
}

pub fn trigger_swap(app: &Arc<AppState>, ctx: &mut ConnContext, p: JoinCodeOnlyPayload) -> HandlerResult {
    let room = get_room(app, &p.join_code)?;
    let outcome = room.trigger_swap(&ctx.conn_id)?;
    Ok((room.participants(), outcome))
}

pub fn end_session(app: &Arc<AppState>, ctx: &mut ConnContext, p: JoinCodeOnlyPayload) -> HandlerResult {
    let room = get_room(app, &p.join_code)?;
    let outcome = room.end_session(&ctx.conn_id, None)?;
    let participants = room.participants();
    if outcome.destroy_room {
        app.registry.remove(room.join_code());
        ctx.join_code = None;
    }
    Ok((participants, outcome))
}

pub fn update_session_settings(
    app: &Arc<AppState>,
    ctx: &mut ConnContext,
    p: UpdateSessionSettingsPayload,
) -> HandlerResult {
    let room = get_room(app, &p.join_code)?;
    let outcome = room.update_session_settings(&ctx.conn_id, p.max_swap_requests)?;
    Ok((room.participants(), outcome))
}

// -- Student-side room commands ----------------------------------------------

pub fn submit_thought(app: &Arc<AppState>, ctx: &mut ConnContext, p: SubmitThoughtPayload) -> HandlerResult {
    let room = get_room(app, &p.join_code)?;
    let outcome = room.submit_thought(&ctx.conn_id, &p.content, &p.prompt_use_id)?;
    Ok((room.participants(), outcome))
}

pub fn student_request_new_thought(
    app: &Arc<AppState>,
    ctx: &mut ConnContext,
    p: StudentRequestNewThoughtPayload,
) -> HandlerResult {
    let room = get_room(app, &p.join_code)?;
    let outcome = room.student_request_new_thought(&ctx.conn_id, &p.current_thought_content)?;
    Ok((room.participants(), outcome))
}

// -- Consent ------------------------------------------------------------------

pub fn update_consent(app: &Arc<AppState>, ctx: &mut ConnContext, p: UpdateConsentPayload) -> HandlerResult {
    let user = app.identity.record_consent(&ctx.user.id, p.consent_given)?;
    {
        let conn = app.db.lock().unwrap();
        thoughtswap_room::logger::log(
            &conn,
            events::LOG_UPDATE_CONSENT,
            Some(&user.id),
            serde_json::json!({ "consentGiven": p.consent_given }),
        );
    }
    let event = OutboundEvent::new(
        events::CONSENT_STATUS,
        thoughtswap_protocol::ConsentStatus {
            consent_given: user.consent_given,
            consent_date: user.consent_date.clone(),
        },
    );
    ctx.user = user;
    solo(ctx.conn_id.clone(), event)
}

// -- Saved prompts (teacher, not room-scoped) ---------------------------------

fn saved_prompts_event(prompts: Vec<thoughtswap_store::types::SavedPrompt>) -> OutboundEvent {
    let prompts = prompts
        .into_iter()
        .map(|p| SavedPromptView {
            id: p.id,
            content: p.content,
            kind: p.kind,
            options: p.options,
            created_at: p.created_at,
        })
        .collect();
    OutboundEvent::new(events::SAVED_PROMPTS_LIST, SavedPromptsListPayload { prompts })
}

pub fn save_prompt(app: &Arc<AppState>, ctx: &mut ConnContext, p: SavePromptPayload) -> HandlerResult {
    require_role(ctx, UserRole::Teacher)?;
    let options = p.options.unwrap_or_default();
    let conn = app.db.lock().unwrap();
    thoughtswap_store::saved_prompts::create_saved_prompt(&conn, &ctx.user.id, &p.content, p.kind, &options)
        .map_err(CoreError::from)?;
    let list =
        thoughtswap_store::saved_prompts::list_saved_prompts(&conn, &ctx.user.id).map_err(CoreError::from)?;
    drop(conn);
    solo(ctx.conn_id.clone(), saved_prompts_event(list))
}

pub fn get_saved_prompts(app: &Arc<AppState>, ctx: &mut ConnContext) -> HandlerResult {
    require_role(ctx, UserRole::Teacher)?;
    let conn = app.db.lock().unwrap();
    let list =
        thoughtswap_store::saved_prompts::list_saved_prompts(&conn, &ctx.user.id).map_err(CoreError::from)?;
    drop(conn);
    solo(ctx.conn_id.clone(), saved_prompts_event(list))
}

pub fn delete_saved_prompt(
    app: &Arc<AppState>,
    ctx: &mut ConnContext,
    p: DeleteSavedPromptPayload,
) -> HandlerResult {
    require_role(ctx, UserRole::Teacher)?;
    let conn = app.db.lock().unwrap();
    thoughtswap_store::saved_prompts::delete_saved_prompt(&conn, &ctx.user.id, &p.id).map_err(CoreError::from)?;
    let list =
        thoughtswap_store::saved_prompts::list_saved_prompts(&conn, &ctx.user.id).map_err(CoreError::from)?;
    drop(conn);
    solo(ctx.conn_id.clone(), saved_prompts_event(list))
}

// -- Previous sessions (teacher) ----------------------------------------------

pub fn get_previous_sessions(app: &Arc<AppState>, ctx: &mut ConnContext) -> HandlerResult {
    require_role(ctx, UserRole::Teacher)?;
    let conn = app.db.lock().unwrap();
    let sessions = thoughtswap_store::courses::list_sessions_for_teacher(&conn, &ctx.user.id)
        .map_err(CoreError::from)?;
    drop(conn);
    let sessions = sessions
        .into_iter()
        .map(|(course, session)| PreviousSessionView {
            session_id: session.id,
            join_code: course.join_code,
            title: course.title,
            status: match session.status {
                SessionStatus::Active => "ACTIVE".to_string(),
                SessionStatus::Completed => "COMPLETED".to_string(),
            },
            created_at: session.created_at,
        })
        .collect();
    solo(
        ctx.conn_id.clone(),
        OutboundEvent::new(events::PREVIOUS_SESSIONS, PreviousSessionsPayload { sessions }),
    )
}

// -- Admin --------------------------------------------------------------------

pub fn admin_join(app: &Arc<AppState>, ctx: &mut ConnContext) -> HandlerResult {
    admin_get_data(app, ctx)
}

pub fn admin_get_data(app: &Arc<AppState>, ctx: &mut ConnContext) -> HandlerResult {
    require_role(ctx, UserRole::Admin)?;
    let snapshot = thoughtswap_room::admin::build_snapshot(&app.db, &app.registry)?;
    solo(
        ctx.conn_id.clone(),
        OutboundEvent::new(events::ADMIN_DATA_UPDATE, snapshot),
    )
}
