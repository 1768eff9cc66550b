//! Session state: who the effective user is, and whether they are a guest

use tokio::sync::watch;

/// The effective user session at a point in time
///
/// Guests are locally-identified, non-authenticated users; they have an
/// effective user id for local storage but never touch the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Effective user identifier, if any
    pub user_id: Option<String>,
    /// Whether this is a guest (local-only) session
    pub is_guest: bool,
}

impl Session {
    /// An authenticated session for the given user
    #[must_use]
    pub fn authenticated(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            is_guest: false,
        }
    }

    /// A guest session with a locally-generated identifier
    #[must_use]
    pub fn guest(local_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(local_id.into()),
            is_guest: true,
        }
    }

    /// No session at all (signed out, no guest identity yet)
    #[must_use]
    pub const fn signed_out() -> Self {
        Self {
            user_id: None,
            is_guest: false,
        }
    }
}

/// Exposes the current session and its transitions
pub trait SessionProvider: Send + Sync {
    /// Read the current session
    ///
    /// Sync operations call this exactly once at entry so the identity is
    /// fixed for the duration of one pass.
    fn current(&self) -> Session;

    /// Subscribe to session transitions
    fn observe(&self) -> watch::Receiver<Session>;
}

/// Watch-channel backed `SessionProvider`
///
/// The auth layer feeds sign-in/sign-out transitions in; sync reads them.
pub struct SessionHandle {
    tx: watch::Sender<Session>,
}

impl SessionHandle {
    #[must_use]
    pub fn new(initial: Session) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Replace the current session
    pub fn set(&self, session: Session) {
        tracing::debug!(
            user = session.user_id.as_deref().unwrap_or("<none>"),
            guest = session.is_guest,
            "Session changed"
        );
        self.tx.send_replace(session);
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new(Session::signed_out())
    }
}

impl SessionProvider for SessionHandle {
    fn current(&self) -> Session {
        self.tx.borrow().clone()
    }

    fn observe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }
}
