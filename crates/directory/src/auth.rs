//! Authentication: verifies a plaintext password against
//! the stored STACIE verification token without ever persisting the
//! password or the derived master key.

use crypto::stacie;

use crate::error::DirectoryError;

pub struct AuthOutcome {
    pub usernum: u64,
    /// Unsealed only for the duration of the session; callers should wrap
    /// it in a secure buffer and drop it on logout.
    pub master_key: zeroize::Zeroizing<Vec<u8>>,
}

pub fn authenticate(
    user: &store::index::UserRecord,
    password: &str,
) -> Result<AuthOutcome, DirectoryError> {
    let keys = stacie::derive(password, &user.username, &user.salt, 0)?;
    if keys.verification_token != user.verification_token {
        trc::Event::new(trc::EventType::DirectoryAuthFailed)
            .ctx("username", user.username.clone())
            .log();
        return Err(DirectoryError::AuthenticationFailed);
    }
    Ok(AuthOutcome {
        usernum: user.usernum,
        master_key: keys.master_key,
    })
}
