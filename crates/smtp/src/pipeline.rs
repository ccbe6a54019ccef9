//! The inbound acceptance pipeline: an ordered sequence
//! of checks run per session/recipient, each contributing to a composite
//! `Outcome` bitmask; the final SMTP reply is chosen from the
//! worst-case outcome across all accepting recipients.

use std::net::IpAddr;

use crate::checks::{dkim, greylist, rbl, spam, spf, virus};
use crate::envelope::Envelope;
use crate::prefs::{CheckPolicy, InboundPrefs};

/// Composite per-recipient verdict. Multiple bits may be set; the worst
/// bit (by `Outcome::severity`) determines the SMTP reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Outcome(pub u32);

impl Outcome {
    pub const SUCCESS: Outcome = Outcome(0);
    pub const PERM_FAILURE: Outcome = Outcome(1 << 0);
    pub const TEMP_SERVER: Outcome = Outcome(1 << 1);
    pub const TEMP_OVERQUOTA: Outcome = Outcome(1 << 2);
    pub const TEMP_LOCKED: Outcome = Outcome(1 << 3);
    pub const BOUNCE_SPF: Outcome = Outcome(1 << 4);
    pub const BOUNCE_DKIM: Outcome = Outcome(1 << 5);
    pub const BOUNCE_VIRUS: Outcome = Outcome(1 << 6);
    pub const BOUNCE_PHISH: Outcome = Outcome(1 << 7);
    pub const BOUNCE_SPAM: Outcome = Outcome(1 << 8);
    pub const BOUNCE_RBL: Outcome = Outcome(1 << 9);

    pub fn contains(self, other: Outcome) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn set(&mut self, other: Outcome) {
        self.0 |= other.0;
    }

    pub fn is_success(self) -> bool {
        self.0 == 0
    }

    pub fn any_bounce(self) -> bool {
        self.0
            & (Outcome::BOUNCE_SPF.0
                | Outcome::BOUNCE_DKIM.0
                | Outcome::BOUNCE_VIRUS.0
                | Outcome::BOUNCE_PHISH.0
                | Outcome::BOUNCE_SPAM.0
                | Outcome::BOUNCE_RBL.0)
            != 0
    }

    /// Worst-case severity for SMTP reply-code selection: permanent
    /// failures outrank temporary ones, which outrank bounce-flagged
    /// success.
    pub fn severity(self) -> u8 {
        if self.contains(Outcome::PERM_FAILURE) {
            3
        } else if self.contains(Outcome::TEMP_SERVER)
            || self.contains(Outcome::TEMP_OVERQUOTA)
            || self.contains(Outcome::TEMP_LOCKED)
        {
            2
        } else if self.any_bounce() {
            1
        } else {
            0
        }
    }

    pub fn worst(a: Outcome, b: Outcome) -> Outcome {
        if a.severity() >= b.severity() {
            a
        } else {
            b
        }
    }
}

/// Session-scoped results that are evaluated once and cached across all
/// recipients steps 2-3 ("per-session; result cached
/// across recipients").
#[derive(Debug, Clone, Default)]
pub struct SessionChecks {
    pub rbl: Option<rbl::RblVerdict>,
    pub spf: Option<spf::SpfVerdict>,
    pub dkim: Option<dkim::DkimVerdict>,
}

pub struct PipelineInput<'a> {
    pub remote_ip: IpAddr,
    pub envelope: &'a Envelope,
    pub body: &'a [u8],
}

/// Should this bounce be suppressed to avoid backscatter? True when the
/// reverse-path is empty or SPF/DKIM explicitly failed.
pub fn suppress_bounce(envelope: &Envelope, outcome: Outcome) -> bool {
    envelope.from.is_none()
        || outcome.contains(Outcome::BOUNCE_SPF)
        || outcome.contains(Outcome::BOUNCE_DKIM)
}

/// Runs the ordered check sequence for one recipient: Size -> RBL -> SPF
/// -> DKIM -> Virus -> Spam -> Greylist. Filters run separately after
/// acceptance (see `checks::filters`).
pub async fn run_for_recipient(
    input: &PipelineInput<'_>,
    prefs: &InboundPrefs,
    session: &mut SessionChecks,
    max_size: u64,
) -> Outcome {
    let mut outcome = Outcome::SUCCESS;

    if input.body.len() as u64 > max_size || input.body.len() as u64 > prefs.per_recipient_size_limit {
        outcome.set(Outcome::PERM_FAILURE);
        return outcome;
    }

    if prefs.rbl_enabled {
        let verdict = match &session.rbl {
            Some(v) => v.clone(),
            None => {
                let v = rbl::check(input.remote_ip).await;
                session.rbl = Some(v.clone());
                v
            }
        };
        if verdict.listed {
            apply_policy(&mut outcome, Outcome::BOUNCE_RBL, prefs.rbl_policy);
        }
    }

    if prefs.spf_enabled {
        let verdict = match &session.spf {
            Some(v) => v.clone(),
            None => {
                let v = spf::check(input.envelope.from.as_deref(), input.remote_ip).await;
                session.spf = Some(v.clone());
                v
            }
        };
        if verdict.failed {
            apply_policy(&mut outcome, Outcome::BOUNCE_SPF, prefs.spf_policy);
        }
    }

    if prefs.dkim_enabled {
        let verdict = match &session.dkim {
            Some(v) => v.clone(),
            None => {
                let v = dkim::verify(input.body).await;
                session.dkim = Some(v.clone());
                v
            }
        };
        if verdict.failed {
            apply_policy(&mut outcome, Outcome::BOUNCE_DKIM, prefs.dkim_policy);
        }
    }

    if prefs.virus_enabled {
        let verdict = virus::scan(input.body).await;
        if verdict.infected {
            apply_policy(&mut outcome, Outcome::BOUNCE_VIRUS, prefs.virus_policy);
        }
    }

    if prefs.spam_enabled {
        let verdict = spam::classify(input.body);
        if verdict.is_spam {
            apply_policy(&mut outcome, Outcome::BOUNCE_SPAM, prefs.spam_policy);
        }
    }

    if prefs.greylist_enabled && outcome.is_success() {
        let key = greylist::Tuple {
            from: input.envelope.from.clone().unwrap_or_default(),
            to: prefs.address.clone(),
            ip: input.remote_ip,
        };
        if !greylist::should_accept(&key) {
            outcome.set(Outcome::TEMP_SERVER);
        }
    }

    outcome
}

fn apply_policy(outcome: &mut Outcome, bounce_bit: Outcome, policy: CheckPolicy) {
    match policy {
        CheckPolicy::Bounce => outcome.set(bounce_bit),
        CheckPolicy::Mark => outcome.set(bounce_bit),
        CheckPolicy::Ignore => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_permanent_above_temp_above_bounce() {
        assert!(Outcome::PERM_FAILURE.severity() > Outcome::TEMP_SERVER.severity());
        assert!(Outcome::TEMP_SERVER.severity() > Outcome::BOUNCE_SPAM.severity());
        assert!(Outcome::BOUNCE_SPAM.severity() > Outcome::SUCCESS.severity());
    }

    #[test]
    fn worst_picks_higher_severity() {
        let worst = Outcome::worst(Outcome::SUCCESS, Outcome::TEMP_SERVER);
        assert_eq!(worst, Outcome::TEMP_SERVER);
    }

    #[test]
    fn bounce_suppressed_on_empty_reverse_path() {
        let envelope = Envelope::new(None, None, crate::envelope::Body::SevenBit);
        assert!(suppress_bounce(&envelope, Outcome::BOUNCE_SPAM));
    }

    #[test]
    fn bounce_suppressed_on_spf_or_dkim_failure() {
        let envelope = Envelope::new(Some("a@b.com".into()), None, crate::envelope::Body::SevenBit);
        assert!(suppress_bounce(&envelope, Outcome::BOUNCE_SPF));
        assert!(!suppress_bounce(&envelope, Outcome::BOUNCE_SPAM));
    }
}
