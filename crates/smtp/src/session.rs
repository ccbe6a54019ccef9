//! The SMTP session state machine:
//! `INIT -> HELO/EHLO -> [AUTH*] -> MAIL FROM -> RCPT TO(1..n) -> DATA -> QUEUED -> RSET|QUIT`.
//! `STARTTLS` returns to the post-HELO state discarding prior HELO; `RSET`
//! returns to post-HELO. Unknown verbs or violations increment a
//! per-session counter that closes the connection past a configured limit.

use crate::envelope::Envelope;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Init,
    Greeted,
    MailFrom,
    RcptTo,
    Data,
    Queued,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Helo,
    Ehlo,
    AuthLogin,
    AuthPlain,
    StartTls,
    MailFrom,
    RcptTo,
    Data,
    DataEnd,
    Rset,
    Quit,
    Unknown,
}

#[derive(Debug)]
pub enum Transition {
    Ok(State),
    OutOfOrder,
    Unrecognized,
}

pub struct Session {
    pub state: State,
    pub hostname: Option<String>,
    pub authenticated: bool,
    /// Promotes the session to `submission` mode: outbound relay becomes
    /// eligible once `AUTH` succeeds.
    pub submission: bool,
    pub envelope: Option<Envelope>,
    pub violations: u32,
    pub violation_limit: u32,
}

impl Session {
    pub fn new(violation_limit: u32) -> Self {
        Session {
            state: State::Init,
            hostname: None,
            authenticated: false,
            submission: false,
            envelope: None,
            violations: 0,
            violation_limit,
        }
    }

    /// Applies one protocol verb, returning the resulting transition.
    /// Does not itself generate the SMTP reply text — that's the caller's
    /// job once it knows the transition's outcome.
    pub fn apply(&mut self, verb: Verb) -> Transition {
        use State::*;
        use Verb::*;

        let next = match (self.state, verb) {
            (Init, Helo) | (Init, Ehlo) | (Greeted, Helo) | (Greeted, Ehlo) => Some(Greeted),
            (Greeted, AuthLogin) | (Greeted, AuthPlain) => {
                self.authenticated = true;
                self.submission = true;
                Some(Greeted)
            }
            (_, StartTls) => {
                self.hostname = None;
                self.authenticated = false;
                Some(Greeted)
            }
            (Greeted, MailFrom) => Some(MailFrom),
            (MailFrom, RcptTo) | (RcptTo, RcptTo) => Some(RcptTo),
            (RcptTo, Data) => Some(Data),
            (Data, DataEnd) => Some(Queued),
            (_, Rset) => Some(Greeted),
            (_, Quit) => Some(self.state),
            _ => None,
        };

        match next {
            Some(state) => {
                self.state = state;
                Transition::Ok(state)
            }
            None if verb == Unknown => {
                self.record_violation();
                Transition::Unrecognized
            }
            None => {
                self.record_violation();
                Transition::OutOfOrder
            }
        }
    }

    fn record_violation(&mut self) {
        self.violations += 1;
        trc::Event::new(trc::EventType::SmtpProtocolViolation)
            .ctx("violations", self.violations as u64)
            .log();
    }

    pub fn should_close(&self) -> bool {
        self.violations > self.violation_limit
    }

    pub fn reset(&mut self) {
        self.state = State::Greeted;
        self.envelope = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_reaches_queued() {
        let mut session = Session::new(5);
        assert!(matches!(session.apply(Verb::Ehlo), Transition::Ok(State::Greeted)));
        assert!(matches!(session.apply(Verb::MailFrom), Transition::Ok(State::MailFrom)));
        assert!(matches!(session.apply(Verb::RcptTo), Transition::Ok(State::RcptTo)));
        assert!(matches!(session.apply(Verb::RcptTo), Transition::Ok(State::RcptTo)));
        assert!(matches!(session.apply(Verb::Data), Transition::Ok(State::Data)));
        assert!(matches!(session.apply(Verb::DataEnd), Transition::Ok(State::Queued)));
    }

    #[test]
    fn rcpt_before_mail_from_is_out_of_order() {
        let mut session = Session::new(5);
        session.apply(Verb::Ehlo);
        assert!(matches!(session.apply(Verb::RcptTo), Transition::OutOfOrder));
        assert_eq!(session.violations, 1);
    }

    #[test]
    fn starttls_discards_prior_helo() {
        let mut session = Session::new(5);
        session.apply(Verb::Ehlo);
        session.hostname = Some("client.example".into());
        session.apply(Verb::StartTls);
        assert!(session.hostname.is_none());
        assert_eq!(session.state, State::Greeted);
    }

    #[test]
    fn rset_returns_to_post_helo() {
        let mut session = Session::new(5);
        session.apply(Verb::Ehlo);
        session.apply(Verb::MailFrom);
        session.apply(Verb::Rset);
        assert_eq!(session.state, State::Greeted);
    }

    #[test]
    fn exceeding_violation_limit_closes_connection() {
        let mut session = Session::new(2);
        for _ in 0..3 {
            session.apply(Verb::Unknown);
        }
        assert!(session.should_close());
    }

    #[test]
    fn successful_auth_promotes_to_submission() {
        let mut session = Session::new(5);
        session.apply(Verb::Ehlo);
        session.apply(Verb::AuthLogin);
        assert!(session.submission);
        assert!(session.authenticated);
    }
}
