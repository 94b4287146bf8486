//! Sign-up, sign-in and sign-out flows.
//!
//! These glue an [`AuthProvider`] to the user records kept by the
//! [`Gateway`]. Drivers publish their location on every sign-in so they show
//! up in nearby queries; signing out removes it again.

use curbside_backend::{AuthProvider, Database, Gateway};
use curbside_core::{AccountType, Coordinate, User};

use crate::SessionError;

/// Input of the sign-up form.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    /// Email address, matched case-insensitively.
    pub email: String,
    /// Plain-text password.
    pub password: String,
    /// Display name.
    pub fullname: String,
    /// Role chosen at sign-up.
    pub account_type: AccountType,
    /// Location fix at sign-up, if the device has one.
    pub location: Option<Coordinate>,
}

/// Create an account and its user record.
///
/// # Errors
///
/// - `SessionError::Auth` if the account cannot be created
/// - `SessionError::Gateway` if the user record or location cannot be written
pub fn sign_up<A, D>(
    auth: &A,
    gateway: &Gateway<D>,
    registration: Registration,
) -> Result<User, SessionError>
where
    A: AuthProvider + ?Sized,
    D: Database,
{
    let email = registration.email.trim().to_lowercase();
    let uid = auth.create_user(&email, &registration.password)?;

    let mut user = User::new(uid, registration.fullname, email, registration.account_type);
    user.location = registration.location;
    gateway.save_user(&user)?;

    publish_location(gateway, &user)?;
    tracing::info!(uid = %user.uid, account_type = ?user.account_type, "user registered");
    Ok(user)
}

/// Sign in and load the user record.
///
/// `location` is the device's current fix. Drivers publish it.
///
/// # Errors
///
/// - `SessionError::Auth` if the credentials are rejected
/// - `SessionError::ProfileMissing` if the account has no user record
/// - `SessionError::Gateway` if the record or location cannot be accessed
pub fn sign_in<A, D>(
    auth: &A,
    gateway: &Gateway<D>,
    email: &str,
    password: &str,
    location: Option<Coordinate>,
) -> Result<User, SessionError>
where
    A: AuthProvider + ?Sized,
    D: Database,
{
    let uid = auth.sign_in(email, password)?;
    let mut user = gateway.fetch_user(&uid)?.ok_or(SessionError::ProfileMissing { uid })?;

    if location.is_some() {
        user.location = location;
    }
    publish_location(gateway, &user)?;
    Ok(user)
}

/// Sign out, withdrawing a driver from nearby queries first.
///
/// # Errors
///
/// - `SessionError::Gateway` if the driver location cannot be removed
/// - `SessionError::Auth` if the provider fails to sign out
pub fn sign_out<A, D>(auth: &A, gateway: &Gateway<D>, user: &User) -> Result<(), SessionError>
where
    A: AuthProvider + ?Sized,
    D: Database,
{
    if user.is_driver() {
        gateway.remove_driver_location(&user.uid)?;
    }
    auth.sign_out()?;
    Ok(())
}

fn publish_location<D: Database>(gateway: &Gateway<D>, user: &User) -> Result<(), SessionError> {
    if let (true, Some(location)) = (user.is_driver(), user.location) {
        gateway.push_driver_location(&user.uid, location)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use curbside_backend::{AuthError, MemoryAuth, MemoryDatabase, SystemEnv};

    use super::*;

    fn setup() -> (MemoryAuth<SystemEnv>, Gateway<MemoryDatabase>) {
        (MemoryAuth::new(SystemEnv::new()), Gateway::new(MemoryDatabase::new()))
    }

    fn registration(email: &str, account_type: AccountType) -> Registration {
        Registration {
            email: email.into(),
            password: "hunter22".into(),
            fullname: "Robin Vale".into(),
            account_type,
            location: Some(Coordinate::new(37.0, -122.0)),
        }
    }

    #[test]
    fn sign_up_stores_lowercased_profile() {
        let (auth, gateway) = setup();
        let user = sign_up(&auth, &gateway, registration("Robin@X.Y", AccountType::Passenger))
            .expect("sign up");

        assert_eq!(user.email, "robin@x.y");
        let stored = gateway.fetch_user(&user.uid).expect("fetch").expect("profile");
        assert_eq!(stored.fullname, "Robin Vale");
        assert_eq!(stored.account_type, Some(AccountType::Passenger));
        assert_eq!(gateway.database().location(&user.uid).expect("location"), None);
    }

    #[test]
    fn driver_sign_up_publishes_location() {
        let (auth, gateway) = setup();
        let user =
            sign_up(&auth, &gateway, registration("d@x.y", AccountType::Driver)).expect("sign up");

        assert_eq!(
            gateway.database().location(&user.uid).expect("location"),
            Some(Coordinate::new(37.0, -122.0))
        );
    }

    #[test]
    fn sign_in_loads_profile_and_refreshes_location() {
        let (auth, gateway) = setup();
        let created =
            sign_up(&auth, &gateway, registration("d@x.y", AccountType::Driver)).expect("sign up");
        auth.sign_out().expect("sign out");

        let moved = Coordinate::new(37.2, -122.2);
        let user = sign_in(&auth, &gateway, "D@X.Y", "hunter22", Some(moved)).expect("sign in");

        assert_eq!(user.uid, created.uid);
        assert_eq!(user.location, Some(moved));
        assert_eq!(gateway.database().location(&user.uid).expect("location"), Some(moved));
    }

    #[test]
    fn sign_in_without_profile_fails() {
        let (auth, gateway) = setup();
        let uid = auth.create_user("ghost@x.y", "hunter22").expect("create");

        let result = sign_in(&auth, &gateway, "ghost@x.y", "hunter22", None);
        assert_eq!(result, Err(SessionError::ProfileMissing { uid }));
    }

    #[test]
    fn wrong_password_is_rejected() {
        let (auth, gateway) = setup();
        sign_up(&auth, &gateway, registration("p@x.y", AccountType::Passenger)).expect("sign up");

        let result = sign_in(&auth, &gateway, "p@x.y", "wrong-password", None);
        assert_eq!(result, Err(SessionError::Auth(AuthError::InvalidCredentials)));
    }

    #[test]
    fn driver_sign_out_removes_location() {
        let (auth, gateway) = setup();
        let user =
            sign_up(&auth, &gateway, registration("d@x.y", AccountType::Driver)).expect("sign up");

        sign_out(&auth, &gateway, &user).expect("sign out");

        assert_eq!(auth.current_uid(), None);
        assert_eq!(gateway.database().location(&user.uid).expect("location"), None);
    }
}
