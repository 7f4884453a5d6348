//! Routes one inbound event to its handler and delivers the result (§6, §7).
//!
//! A malformed payload is dropped with a warning, the same way a malformed
//! outer frame is (`InboundEvent::parse_payload`'s doc comment). `AUTHZ`
//! never reaches the client (§7: "does not leak existence of command"); every
//! other error becomes an `ERROR {message}` targeted at the connection that
//! sent the command.

use std::sync::Arc;

use thoughtswap_core::CoreError;
use thoughtswap_protocol::payloads::{
    DeleteSavedPromptPayload, JoinCodeOnlyPayload, JoinRoomPayload, SavePromptPayload,
    StudentRequestNewThoughtPayload, SubmitThoughtPayload, TeacherDeleteThoughtPayload,
    TeacherReassignDistributionPayload, TeacherSendPromptPayload, UpdateConsentPayload,
    UpdateSessionSettingsPayload,
};
use thoughtswap_protocol::{events, ErrorPayload, InboundEvent, OutboundEvent};
use thoughtswap_room::{Effect, Outcome};
use tracing::{error, warn};

use crate::app::AppState;
use crate::ws::connection::ConnContext;
use crate::ws::handlers::{self, HandlerResult};

pub fn route(frame: InboundEvent, app: &Arc<AppState>, ctx: &mut ConnContext) {
    let event_name = frame.event.clone();
    // Every arm below reborrows `ctx` (`&mut *ctx`) rather than passing it
    // directly: `ctx` is itself a `&mut ConnContext`, and closures don't
    // auto-reborrow `&mut` captures the way plain statements do, so a bare
    // `ctx` would move it out of `route` on the very first arm.
    let result: Option<HandlerResult> = match event_name.as_str() {
        events::JOIN_ROOM => with_payload(&frame, |p: JoinRoomPayload| handlers::join_room(app, &mut *ctx, p)),
        events::TEACHER_START_CLASS => {
            Some(handlers::teacher_start_class(app, &mut *ctx, frame.payload.clone()))
        }
        events::TEACHER_REJOIN => {
            with_payload(&frame, |p: JoinCodeOnlyPayload| handlers::teacher_rejoin(app, &mut *ctx, p))
        }
        events::TEACHER_SEND_PROMPT => with_payload(&frame, |p: TeacherSendPromptPayload| {
            handlers::teacher_send_prompt(app, &mut *ctx, p)
        }),
        events::TEACHER_DELETE_THOUGHT => with_payload(&frame, |p: TeacherDeleteThoughtPayload| {
            handlers::teacher_delete_thought(app, &mut *ctx, p)
        }),
        events::TEACHER_REASSIGN_DISTRIBUTION => with_payload(&frame, |p: TeacherReassignDistributionPayload| {
            handlers::teacher_reassign_distribution(app, &mut *ctx, p)
        }),
        events::TEACHER_RESET_STATE => {
            with_payload(&frame, |p: JoinCodeOnlyPayload| handlers::teacher_reset_state(app, &mut *ctx, p))
        }
        events::TRIGGER_SWAP => {
            with_payload(&frame, |p: JoinCodeOnlyPayload| handlers::trigger_swap(app, &mut *ctx, p))
        }
        events::END_SESSION => {
            with_payload(&frame, |p: JoinCodeOnlyPayload| handlers::end_session(app, &mut *ctx, p))
        }
        events::UPDATE_SESSION_SETTINGS => with_payload(&frame, |p: UpdateSessionSettingsPayload| {
            handlers::update_session_settings(app, &mut *ctx, p)
        }),
        events::SUBMIT_THOUGHT => {
            with_payload(&frame, |p: SubmitThoughtPayload| handlers::submit_thought(app, &mut *ctx, p))
        }
        events::STUDENT_REQUEST_NEW_THOUGHT => with_payload(&frame, |p: StudentRequestNewThoughtPayload| {
            handlers::student_request_new_thought(app, &mut *ctx, p)
        }),
        events::UPDATE_CONSENT => {
            with_payload(&frame, |p: UpdateConsentPayload| handlers::update_consent(app, &mut *ctx, p))
        }
        events::SAVE_PROMPT => {
            with_payload(&frame, |p: SavePromptPayload| handlers::save_prompt(app, &mut *ctx, p))
        }
        events::GET_SAVED_PROMPTS => Some(handlers::get_saved_prompts(app, &mut *ctx)),
        events::DELETE_SAVED_PROMPT => with_payload(&frame, |p: DeleteSavedPromptPayload| {
            handlers::delete_saved_prompt(app, &mut *ctx, p)
        }),
        events::ADMIN_JOIN => Some(handlers::admin_join(app, &mut *ctx)),
        events::ADMIN_GET_DATA => Some(handlers::admin_get_data(app, &mut *ctx)),
        events::GET_PREVIOUS_SESSIONS => Some(handlers::get_previous_sessions(app, &mut *ctx)),
        other => {
            warn!(event = %other, "unknown event");
            None
        }
    };

    let Some(result) = result else { return };
    deliver(app, ctx, &event_name, result);
}

fn with_payload<T, F>(frame: &InboundEvent, f: F) -> Option<HandlerResult>
where
    T: serde::de::DeserializeOwned,
    F: FnOnce(T) -> HandlerResult,
{
    match frame.parse_payload::<T>() {
        Ok(p) => Some(f(p)),
        Err(e) => {
            warn!(event = %frame.event, error = %e, "malformed payload, dropping");
            None
        }
    }
}

fn deliver(app: &Arc<AppState>, ctx: &ConnContext, event_name: &str, result: HandlerResult) {
    match result {
        Ok((participants, outcome)) => app.connections.deliver(&participants, &outcome),
        Err(CoreError::Authz(_)) => {}
        Err(e) => {
            if let Some(message) = e.client_message() {
                let outcome = Outcome::new(vec![Effect::to(
                    ctx.conn_id.clone(),
                    OutboundEvent::new(events::ERROR, ErrorPayload::new(message)),
                )]);
                app.connections.deliver(&[], &outcome);
            }
            if matches!(e, CoreError::Invariant(_)) {
                error!(event = event_name, error = %e, "invariant violation");
            }
        }
    }
}
