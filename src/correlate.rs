// src/correlate.rs
//
// Resolve the message a reply or forward should anchor to.

use log::debug;
use serde::Serialize;

use crate::ident::MessageId;
use crate::message::Message;

/// Precedence level at which a target matched, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    /// A candidate lists the target in its References chain.
    ReferenceMembership,
    /// A candidate's In-Reply-To is the target.
    InReplyTo,
    /// The candidate is the target itself.
    ExactMatch,
}

impl Tier {
    fn matches(self, target: &MessageId, msg: &Message) -> bool {
        match self {
            Tier::ReferenceMembership => msg.references.contains(target),
            Tier::InReplyTo => msg.parent_id.as_ref() == Some(target),
            Tier::ExactMatch => &msg.id == target,
        }
    }
}

const TIERS: [Tier; 3] = [Tier::ReferenceMembership, Tier::InReplyTo, Tier::ExactMatch];

/// Outcome of a successful correlation.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedTarget<'a> {
    pub message: &'a Message,
    pub tier: Tier,
}

/// Find the best anchor for `target` among `candidates`.
///
/// The strongest tier with any match wins; within a tier the latest `date`
/// wins and equal dates keep the earliest candidate. Returns `None` when
/// nothing matches, leaving the caller to decide whether that is fatal.
pub fn resolve<'a, I>(target: &MessageId, candidates: I) -> Option<ResolvedTarget<'a>>
where
    I: IntoIterator<Item = &'a Message>,
{
    let mut best: [Option<&'a Message>; 3] = [None; 3];
    let mut scanned = 0usize;

    for msg in candidates {
        scanned += 1;
        for (slot, tier) in best.iter_mut().zip(TIERS) {
            if !tier.matches(target, msg) {
                continue;
            }
            if slot.map_or(true, |current| msg.date > current.date) {
                *slot = Some(msg);
            }
        }
    }

    let resolved = best
        .iter()
        .zip(TIERS)
        .find_map(|(slot, tier)| slot.map(|message| ResolvedTarget { message, tier }));

    match &resolved {
        Some(r) => debug!(
            "Resolved {} to {} via {:?} after {} candidates",
            target, r.message.id, r.tier, scanned
        ),
        None => debug!("No candidate among {} references {}", scanned, target),
    }
    resolved
}
