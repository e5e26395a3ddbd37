//! Client-side session state and page guards.

/// Pages of the application the guard knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    SignIn,
    SignUp,
    Dashboard,
}

/// Outcome of a page guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    Allow,
    Redirect(Page),
}

/// What the client knows about the signed-in user. The refresh token is
/// not here: it lives in the HTTP-only cookie jar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    access_token: Option<String>,
    email: Option<String>,
}

impl Session {
    pub fn authenticated(access_token: impl Into<String>, email: Option<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            email,
        }
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    pub(crate) fn set_access_token(&mut self, token: String) {
        self.access_token = Some(token);
    }

    pub fn clear(&mut self) {
        self.access_token = None;
        self.email = None;
    }

    /// Clear the session only if it still holds `stale`. Returns whether it
    /// was cleared.
    pub(crate) fn clear_if_current(&mut self, stale: Option<&str>) -> bool {
        if self.access_token() != stale {
            return false;
        }
        self.clear();
        true
    }

    /// Decide whether `page` may be shown. Signed-out users are sent to
    /// sign-in from protected pages; signed-in users skip the credential forms.
    pub fn guard(&self, page: Page) -> Guard {
        match (page, self.is_authenticated()) {
            (Page::Dashboard, false) => Guard::Redirect(Page::SignIn),
            (Page::SignIn | Page::SignUp, true) => Guard::Redirect(Page::Dashboard),
            _ => Guard::Allow,
        }
    }
}
