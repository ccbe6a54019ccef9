//! User-defined filters, run after acceptance: stable
//! evaluation order so the same rule set applied to the same message
//! always yields the same outcome. Rule matching is grounded in
//! `directory`'s data model rather than a new language — filters are
//! simple field/value predicates evaluated in declaration order.

#[derive(Debug, Clone)]
pub enum Predicate {
    FromContains(String),
    SubjectContains(String),
    HeaderEquals { name: String, value: String },
}

#[derive(Debug, Clone)]
pub enum Action {
    MoveToFolder(String),
    SetStatusBit(u32),
    Discard,
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub predicate: Predicate,
    pub action: Action,
}

#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    pub rules: Vec<Rule>,
}

pub struct MessageView<'a> {
    pub from: &'a str,
    pub subject: &'a str,
    pub headers: &'a [(String, String)],
}

impl FilterSet {
    /// Evaluates rules in declaration order, returning the first
    /// matching action (first-match-wins, matching a mail filter's
    /// usual "stop on first match" semantics).
    pub fn evaluate(&self, message: &MessageView) -> Option<&Action> {
        self.rules.iter().find_map(|rule| {
            if predicate_matches(&rule.predicate, message) {
                Some(&rule.action)
            } else {
                None
            }
        })
    }
}

fn predicate_matches(predicate: &Predicate, message: &MessageView) -> bool {
    match predicate {
        Predicate::FromContains(needle) => message.from.contains(needle.as_str()),
        Predicate::SubjectContains(needle) => message.subject.contains(needle.as_str()),
        Predicate::HeaderEquals { name, value } => message
            .headers
            .iter()
            .any(|(n, v)| n.eq_ignore_ascii_case(name) && v == value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message<'a>(from: &'a str, subject: &'a str, headers: &'a [(String, String)]) -> MessageView<'a> {
        MessageView { from, subject, headers }
    }

    #[test]
    fn first_matching_rule_wins() {
        let set = FilterSet {
            rules: vec![
                Rule {
                    predicate: Predicate::SubjectContains("invoice".into()),
                    action: Action::MoveToFolder("Bills".into()),
                },
                Rule {
                    predicate: Predicate::FromContains("boss@".into()),
                    action: Action::MoveToFolder("Priority".into()),
                },
            ],
        };
        let msg = message("boss@company.com", "Your invoice is ready", &[]);
        let action = set.evaluate(&msg).unwrap();
        assert!(matches!(action, Action::MoveToFolder(name) if name == "Bills"));
    }

    #[test]
    fn same_message_yields_same_outcome_repeatedly() {
        let set = FilterSet {
            rules: vec![Rule {
                predicate: Predicate::FromContains("spam".into()),
                action: Action::Discard,
            }],
        };
        let msg = message("spammer@evil.test", "hi", &[]);
        let first = set.evaluate(&msg).is_some();
        let second = set.evaluate(&msg).is_some();
        assert_eq!(first, second);
    }

    #[test]
    fn no_match_returns_none() {
        let set = FilterSet::default();
        let msg = message("a@b.com", "hi", &[]);
        assert!(set.evaluate(&msg).is_none());
    }
}
