//! Session commands.

use fys_client::{ClientError, DirectoryClient};
use fys_core::AppConfig;
use fys_sync::{App, SyncError};

const RELOGIN_HINT: &str = "the directory no longer accepts the stored credential; run `fys login`";

/// # Errors
///
/// Returns an error if the directory rejects the login or the credential
/// cannot be stored.
pub(crate) async fn run_login(
    app: &App<DirectoryClient>,
    email: &str,
    password: &str,
) -> anyhow::Result<()> {
    app.login(email, password).await?;
    println!("logged in as {email}");
    Ok(())
}

/// # Errors
///
/// Returns an error only if the stored credential cannot be removed.
pub(crate) async fn run_logout(app: &App<DirectoryClient>) -> anyhow::Result<()> {
    app.logout().await?;
    println!("logged out");
    Ok(())
}

pub(crate) fn run_status(app: &App<DirectoryClient>, config: &AppConfig) {
    let filter = app.filters().get();
    let credential = app.session().state().credential();

    println!("directory:  {}", app.directory().base_url());
    println!("env:        {}", config.env);
    println!("state file: {}", config.state_path.display());
    println!("theme:      {}", config.theme);
    println!(
        "session:    {}",
        if app.session().is_authenticated() {
            format!(
                "logged in ({}, expires {})",
                credential.token_type.as_deref().unwrap_or("bearer"),
                credential.expires_at.as_deref().unwrap_or("never")
            )
        } else {
            "logged out".to_string()
        }
    );
    println!("distance:   {}", filter.distance);
    println!("center:     {}", filter.center);
}

/// Hint printed after a command failed because the directory answered 401.
/// The session has already been cleared by then.
pub(crate) fn unauthorized_hint(err: &anyhow::Error) -> Option<&'static str> {
    let unauthorized = err
        .downcast_ref::<SyncError>()
        .is_some_and(SyncError::is_unauthorized)
        || err
            .downcast_ref::<ClientError>()
            .is_some_and(ClientError::is_unauthorized);
    unauthorized.then_some(RELOGIN_HINT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected() -> ClientError {
        ClientError::Unauthorized {
            url: "http://localhost/services".to_string(),
        }
    }

    #[test]
    fn hint_for_unauthorized_sync_error() {
        let err = anyhow::Error::from(SyncError::Client(rejected()));
        assert_eq!(unauthorized_hint(&err), Some(RELOGIN_HINT));
    }

    #[test]
    fn hint_for_unauthorized_client_error() {
        let err = anyhow::Error::from(rejected());
        assert_eq!(unauthorized_hint(&err), Some(RELOGIN_HINT));
    }

    #[test]
    fn no_hint_for_other_failures() {
        let not_found = anyhow::Error::from(SyncError::Client(ClientError::NotFound {
            url: "http://localhost/services/9".to_string(),
        }));
        assert_eq!(unauthorized_hint(&not_found), None);
        assert_eq!(unauthorized_hint(&anyhow::anyhow!("nothing to update")), None);
    }
}
