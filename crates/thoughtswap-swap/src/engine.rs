use std::collections::{HashMap, HashSet};

use rand::seq::SliceRandom;
use rand::Rng;

/// Bounded retry count for the derangement shuffle (§4.6 constraint 5).
/// Mirrors `thoughtswap_core::config::DERANGEMENT_MAX_SHUFFLES`; duplicated
/// here rather than pulled in as a dependency — this crate is pure and has
/// no business depending on the config/transport stack.
const DERANGEMENT_MAX_SHUFFLES: u32 = 5;

/// One collected Thought, as the Room hands it to the engine (§4.6 input).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThoughtInput {
    pub content: String,
    pub author_user_id: String,
    pub author_name: String,
}

/// One connected student, as the Room hands it to the engine (§4.6 input).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientInput {
    pub connection_id: String,
    pub user_id: String,
}

/// What a single recipient ends up with (§4.6 output).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub content: String,
    pub author_user_id: String,
    pub original_author_name: String,
}

impl From<ThoughtInput> for Assignment {
    fn from(t: ThoughtInput) -> Self {
        Self {
            content: t.content,
            author_user_id: t.author_user_id,
            original_author_name: t.author_name,
        }
    }
}

/// Build the pool of thoughts to distribute: duplicate-until-full for
/// oversubscription (`|thoughts| < |recipients|`), truncate for
/// undersubscription (`|thoughts| > |recipients|`) (§4.6 constraint 3).
fn build_pool(thoughts: &[ThoughtInput], recipient_count: usize) -> Vec<ThoughtInput> {
    let mut pool: Vec<ThoughtInput> = thoughts.to_vec();
    if pool.is_empty() || recipient_count == 0 {
        pool.truncate(recipient_count);
        return pool;
    }
    while pool.len() < recipient_count {
        pool.extend(thoughts.iter().cloned());
    }
    pool.truncate(recipient_count);
    pool
}

/// Does position-wise pairing `pool[i] -> recipients[i]` violate the
/// no-own-thought constraint anywhere?
fn has_conflict(pool: &[ThoughtInput], recipients: &[RecipientInput]) -> bool {
    pool.iter()
        .zip(recipients.iter())
        .any(|(t, r)| t.author_user_id == r.user_id)
}

/// Best-effort derangement: swap each offending position with the first
/// other position that resolves the conflict without creating a new one
/// (§4.6 constraint 5, "swap offending positions pairwise with any
/// non-conflicting neighbor").
fn resolve_conflicts_by_swap(pool: &mut [ThoughtInput], recipients: &[RecipientInput]) {
    let n = pool.len();
    for i in 0..n {
        if pool[i].author_user_id != recipients[i].user_id {
            continue;
        }
        if let Some(j) = (0..n).find(|&j| {
            j != i
                && pool[j].author_user_id != recipients[i].user_id
                && pool[i].author_user_id != recipients[j].user_id
        }) {
            pool.swap(i, j);
        }
    }
}

/// Randomized many-to-many redistribution of Thoughts to recipients
/// (§4.6). Pure: the caller is responsible for writing the result into a
/// Room's Distribution and fanning it out.
///
/// Empty in either direction yields an empty map — `TRIGGER_SWAP` with no
/// thoughts is rejected upstream as a precondition, and zero recipients is
/// valid (§8 boundary: "Swap with N thoughts and 0 students").
pub fn compute_distribution(
    thoughts: &[ThoughtInput],
    recipients: &[RecipientInput],
) -> HashMap<String, Assignment> {
    if thoughts.is_empty() || recipients.is_empty() {
        return HashMap::new();
    }

    let distinct_authors: HashSet<&str> =
        thoughts.iter().map(|t| t.author_user_id.as_str()).collect();

    let mut pool = build_pool(thoughts, recipients.len());
    let mut rng = rand::thread_rng();

    pool.shuffle(&mut rng);
    let mut attempts = 0;
    while has_conflict(&pool, recipients) && attempts < DERANGEMENT_MAX_SHUFFLES {
        pool.shuffle(&mut rng);
        attempts += 1;
    }

    if has_conflict(&pool, recipients) && distinct_authors.len() >= 2 {
        resolve_conflicts_by_swap(&mut pool, recipients);
    }
    // distinct_authors.len() == 1: constraint is unsatisfiable, deliver as-is.

    recipients
        .iter()
        .zip(pool.into_iter())
        .map(|(r, t)| (r.connection_id.clone(), Assignment::from(t)))
        .collect()
}

/// `STUDENT_REQUEST_NEW_THOUGHT` eligibility + pick (§4.5, §4.6): a uniformly
/// random thought authored by someone else whose content differs from the
/// student's current one. `None` means the precondition failed — the caller
/// reports `ERROR` and does not touch the SwapRequest ledger.
pub fn pick_reswap_thought(
    thoughts: &[ThoughtInput],
    requester_user_id: &str,
    current_content: &str,
) -> Option<ThoughtInput> {
    let eligible: Vec<&ThoughtInput> = thoughts
        .iter()
        .filter(|t| t.author_user_id != requester_user_id && t.content != current_content)
        .collect();
    if eligible.is_empty() {
        return None;
    }
    let idx = rand::thread_rng().gen_range(0..eligible.len());
    Some(eligible[idx].clone())
}

/// `TEACHER_REASSIGN_DISTRIBUTION` pick (§4.5, §4.6): a uniformly random
/// thought not authored by the target student; when more than one eligible
/// thought exists, prefer ones that differ from the student's current
/// assignment (no quota, teacher-only).
pub fn pick_reassignment_thought(
    thoughts: &[ThoughtInput],
    target_user_id: &str,
    current_content: &str,
) -> Option<ThoughtInput> {
    let eligible: Vec<&ThoughtInput> = thoughts
        .iter()
        .filter(|t| t.author_user_id != target_user_id)
        .collect();
    if eligible.is_empty() {
        return None;
    }

    let preferred: Vec<&&ThoughtInput> = eligible
        .iter()
        .filter(|t| t.content != current_content)
        .collect();
    let pool = if preferred.is_empty() {
        eligible.clone()
    } else {
        preferred.into_iter().copied().collect()
    };

    let idx = rand::thread_rng().gen_range(0..pool.len());
    Some(pool[idx].clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thought(author: &str, content: &str) -> ThoughtInput {
        ThoughtInput {
            content: content.to_string(),
            author_user_id: author.to_string(),
            author_name: format!("name-{author}"),
        }
    }

    fn recipient(conn: &str, user: &str) -> RecipientInput {
        RecipientInput {
            connection_id: conn.to_string(),
            user_id: user.to_string(),
        }
    }

    #[test]
    fn two_students_always_swap_with_each_other() {
        // §8 scenario 1: deterministic by constraint 2 with |students| = 2.
        let thoughts = vec![thought("u1", "A"), thought("u2", "B")];
        let recipients = vec![recipient("c1", "u1"), recipient("c2", "u2")];

        for _ in 0..200 {
            let dist = compute_distribution(&thoughts, &recipients);
            assert_eq!(dist.len(), 2);
            assert_ne!(dist["c1"].author_user_id, "u1");
            assert_ne!(dist["c2"].author_user_id, "u2");
        }
    }

    #[test]
    fn single_submitter_unsatisfiable_constraint_delivers_own_thought() {
        // §8 scenario 2: sole author is a student; everyone including them
        // receives the one thought.
        let thoughts = vec![thought("u1", "A")];
        let recipients = vec![recipient("c1", "u1"), recipient("c2", "u2")];
        let dist = compute_distribution(&thoughts, &recipients);
        assert_eq!(dist.len(), 2);
        assert_eq!(dist["c1"].content, "A");
        assert_eq!(dist["c2"].content, "A");
    }

    #[test]
    fn zero_recipients_yields_empty_distribution() {
        let thoughts = vec![thought("u1", "A"), thought("u2", "B")];
        let dist = compute_distribution(&thoughts, &[]);
        assert!(dist.is_empty());
    }

    #[test]
    fn empty_thoughts_yields_empty_distribution() {
        let recipients = vec![recipient("c1", "u1")];
        let dist = compute_distribution(&[], &recipients);
        assert!(dist.is_empty());
    }

    #[test]
    fn oversubscription_every_thought_appears_and_pool_matches_recipient_count() {
        // §8 boundary: T thoughts, R > T recipients — each of the T
        // thoughts appears at least once, |distribution| == R.
        let thoughts = vec![thought("u1", "A"), thought("u2", "B"), thought("u3", "C")];
        let recipients: Vec<RecipientInput> = (0..7)
            .map(|i| recipient(&format!("c{i}"), &format!("v{i}")))
            .collect();
        let dist = compute_distribution(&thoughts, &recipients);
        assert_eq!(dist.len(), 7);
        let delivered: HashSet<&str> = dist.values().map(|a| a.content.as_str()).collect();
        assert_eq!(delivered, HashSet::from(["A", "B", "C"]));
    }

    #[test]
    fn undersubscription_truncates_to_recipient_count() {
        let thoughts: Vec<ThoughtInput> = (0..5)
            .map(|i| thought(&format!("u{i}"), &format!("T{i}")))
            .collect();
        let recipients = vec![recipient("c1", "vA"), recipient("c2", "vB")];
        let dist = compute_distribution(&thoughts, &recipients);
        assert_eq!(dist.len(), 2);
    }

    #[test]
    fn reswap_excludes_own_authorship_and_current_content() {
        let thoughts = vec![thought("u1", "A"), thought("u2", "B"), thought("u1", "C")];
        for _ in 0..50 {
            let picked = pick_reswap_thought(&thoughts, "u1", "Z").unwrap();
            assert_eq!(picked.content, "B");
            assert_eq!(picked.author_user_id, "u2");
        }
    }

    #[test]
    fn reswap_with_no_eligible_thought_returns_none() {
        let thoughts = vec![thought("u1", "A")];
        assert!(pick_reswap_thought(&thoughts, "u1", "A").is_none());
        assert!(pick_reswap_thought(&thoughts, "u1", "B").is_none()); // only author is self
    }

    #[test]
    fn reassignment_excludes_own_authorship_and_prefers_different_content() {
        let thoughts = vec![thought("u1", "A"), thought("u2", "B"), thought("u3", "C")];
        for _ in 0..50 {
            let picked = pick_reassignment_thought(&thoughts, "u1", "B").unwrap();
            assert_ne!(picked.author_user_id, "u1");
            assert_eq!(picked.content, "C");
        }
    }

    #[test]
    fn reassignment_falls_back_to_current_content_when_no_other_option() {
        let thoughts = vec![thought("u2", "B")];
        let picked = pick_reassignment_thought(&thoughts, "u1", "B").unwrap();
        assert_eq!(picked.content, "B");
    }
}
