// Wire event names — uppercase snake, exactly as specified in §6.
// Grouped the way the original method-name table was grouped.

// client -> server
pub const JOIN_ROOM: &str = "JOIN_ROOM";
pub const TEACHER_START_CLASS: &str = "TEACHER_START_CLASS";
pub const TEACHER_REJOIN: &str = "TEACHER_REJOIN";
pub const TEACHER_SEND_PROMPT: &str = "TEACHER_SEND_PROMPT";
pub const TEACHER_DELETE_THOUGHT: &str = "TEACHER_DELETE_THOUGHT";
pub const TEACHER_REASSIGN_DISTRIBUTION: &str = "TEACHER_REASSIGN_DISTRIBUTION";
pub const TEACHER_RESET_STATE: &str = "TEACHER_RESET_STATE";
pub const TRIGGER_SWAP: &str = "TRIGGER_SWAP";
pub const END_SESSION: &str = "END_SESSION";
pub const UPDATE_SESSION_SETTINGS: &str = "UPDATE_SESSION_SETTINGS";
pub const SUBMIT_THOUGHT: &str = "SUBMIT_THOUGHT";
pub const STUDENT_REQUEST_NEW_THOUGHT: &str = "STUDENT_REQUEST_NEW_THOUGHT";
pub const UPDATE_CONSENT: &str = "UPDATE_CONSENT";
pub const SAVE_PROMPT: &str = "SAVE_PROMPT";
pub const GET_SAVED_PROMPTS: &str = "GET_SAVED_PROMPTS";
pub const DELETE_SAVED_PROMPT: &str = "DELETE_SAVED_PROMPT";
pub const ADMIN_JOIN: &str = "ADMIN_JOIN";
pub const ADMIN_GET_DATA: &str = "ADMIN_GET_DATA";
pub const GET_PREVIOUS_SESSIONS: &str = "GET_PREVIOUS_SESSIONS";

// server -> client
pub const AUTH_ERROR: &str = "AUTH_ERROR";
pub const CONSENT_STATUS: &str = "CONSENT_STATUS";
pub const CLASS_STARTED: &str = "CLASS_STARTED";
pub const JOIN_SUCCESS: &str = "JOIN_SUCCESS";
pub const PARTICIPANTS_UPDATE: &str = "PARTICIPANTS_UPDATE";
pub const THOUGHTS_UPDATE: &str = "THOUGHTS_UPDATE";
pub const DISTRIBUTION_UPDATE: &str = "DISTRIBUTION_UPDATE";
pub const NEW_PROMPT: &str = "NEW_PROMPT";
pub const RECEIVE_SWAP: &str = "RECEIVE_SWAP";
pub const SWAP_COMPLETED: &str = "SWAP_COMPLETED";
pub const RESTORE_STATE: &str = "RESTORE_STATE";
pub const THOUGHT_DELETED: &str = "THOUGHT_DELETED";
pub const SESSION_ENDED: &str = "SESSION_ENDED";
pub const SAVED_PROMPTS_LIST: &str = "SAVED_PROMPTS_LIST";
pub const PREVIOUS_SESSIONS: &str = "PREVIOUS_SESSIONS";
pub const ADMIN_DATA_UPDATE: &str = "ADMIN_DATA_UPDATE";
pub const ERROR: &str = "ERROR";

// log event kinds (§4.7) — not wire events, but share the same symbolic-name style
pub const LOG_USER_CONNECT: &str = "USER_CONNECT";
pub const LOG_JOIN_ROOM: &str = "JOIN_ROOM";
pub const LOG_SEND_PROMPT: &str = "SEND_PROMPT";
pub const LOG_SUBMIT_THOUGHT: &str = "SUBMIT_THOUGHT";
pub const LOG_TRIGGER_SWAP: &str = "TRIGGER_SWAP";
pub const LOG_REQUEST_RESWAP: &str = "REQUEST_RESWAP";
pub const LOG_DELETE_THOUGHT: &str = "DELETE_THOUGHT";
pub const LOG_END_SESSION: &str = "END_SESSION";
pub const LOG_SESSION_AUTO_ENDED: &str = "SESSION_AUTO_ENDED";
pub const LOG_ADMIN_GET_DATA: &str = "ADMIN_GET_DATA";
pub const LOG_UPDATE_CONSENT: &str = "UPDATE_CONSENT";
pub const LOG_UPDATE_SETTINGS: &str = "UPDATE_SETTINGS";
pub const LOG_RESET_STATE: &str = "RESET_STATE";
pub const LOG_START_CLASS: &str = "START_CLASS";
