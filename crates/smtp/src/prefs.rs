//! Per-recipient inbound preferences: quota, daily counters, filter
//! set, per-check enablement and bounce-or-mark policy, size limit,
//! autoreply id, and forwarding address.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckPolicy {
    Bounce,
    Mark,
    Ignore,
}

#[derive(Debug, Clone)]
pub struct InboundPrefs {
    pub usernum: u64,
    pub address: String,
    pub quota_remaining: i64,
    pub daily_received: u32,
    pub daily_limit: u32,
    pub per_recipient_size_limit: u64,
    pub spam_enabled: bool,
    pub virus_enabled: bool,
    pub spf_enabled: bool,
    pub dkim_enabled: bool,
    pub rbl_enabled: bool,
    pub greylist_enabled: bool,
    pub spam_policy: CheckPolicy,
    pub virus_policy: CheckPolicy,
    pub spf_policy: CheckPolicy,
    pub dkim_policy: CheckPolicy,
    pub rbl_policy: CheckPolicy,
    pub autoreply_id: u64,
    pub forward_address: Option<String>,
}

impl InboundPrefs {
    pub fn has_quota_for(&self, size: u64) -> bool {
        self.quota_remaining >= size as i64
    }

    pub fn under_daily_limit(&self) -> bool {
        self.daily_limit == 0 || self.daily_received < self.daily_limit
    }
}

/// Attached to the session; duplicate recipients are collapsed upstream
/// in `Envelope::add_recipient`, so this list is keyed 1:1 with the
/// envelope's recipient list.
#[derive(Debug, Clone, Default)]
pub struct PrefsList {
    pub entries: Vec<InboundPrefs>,
}

impl PrefsList {
    pub fn push(&mut self, prefs: InboundPrefs) {
        if !self.entries.iter().any(|p| p.address == prefs.address) {
            self.entries.push(prefs);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> InboundPrefs {
        InboundPrefs {
            usernum: 1,
            address: "user@magma.test".into(),
            quota_remaining: 1000,
            daily_received: 5,
            daily_limit: 10,
            per_recipient_size_limit: 10_000_000,
            spam_enabled: true,
            virus_enabled: true,
            spf_enabled: true,
            dkim_enabled: true,
            rbl_enabled: true,
            greylist_enabled: true,
            spam_policy: CheckPolicy::Mark,
            virus_policy: CheckPolicy::Bounce,
            spf_policy: CheckPolicy::Mark,
            dkim_policy: CheckPolicy::Mark,
            rbl_policy: CheckPolicy::Bounce,
            autoreply_id: 0,
            forward_address: None,
        }
    }

    #[test]
    fn quota_and_daily_limit_checks() {
        let prefs = sample();
        assert!(prefs.has_quota_for(500));
        assert!(!prefs.has_quota_for(5000));
        assert!(prefs.under_daily_limit());
    }

    #[test]
    fn prefs_list_collapses_duplicates() {
        let mut list = PrefsList::default();
        list.push(sample());
        list.push(sample());
        assert_eq!(list.entries.len(), 1);
    }
}
