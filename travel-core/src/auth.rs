//! In-memory placeholder session backed by a single fixed account.
//!
//! This is not a security boundary: there is no token, no persistence and no
//! lockout. Session state is only reachable through the provider handle.

use tokio::sync::watch;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub name: String,
    pub email: String,
    pub avatar: String,
}

struct Account {
    name: &'static str,
    email: &'static str,
    password: &'static str,
    avatar: &'static str,
}

const FAKE_ACCOUNT: Account = Account {
    name: "Jack",
    email: "jack@example.com",
    password: "qwerty",
    avatar: "https://i.pravatar.cc/100?u=zz",
};

impl Account {
    fn profile(&self) -> User {
        User {
            name: self.name.to_string(),
            email: self.email.to_string(),
            avatar: self.avatar.to_string(),
        }
    }
}

/// `is_authenticated` is true iff `user` is present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<User>,
    pub is_authenticated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthAction {
    Login(User),
    Logout,
}

// Both fields are replaced on every action.
pub fn reduce(_state: AuthState, action: AuthAction) -> AuthState {
    match action {
        AuthAction::Login(user) => AuthState { user: Some(user), is_authenticated: true },
        AuthAction::Logout => AuthState::default(),
    }
}

#[derive(Debug)]
pub struct AuthProvider {
    state: watch::Sender<AuthState>,
}

impl Default for AuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthProvider {
    pub fn new() -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self { state }
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    fn dispatch(&self, action: AuthAction) {
        self.state.send_modify(|state| *state = reduce(std::mem::take(state), action));
    }

    /// Signs in on an exact credential match. Anything else changes nothing.
    /// Returns whether a session is active afterwards.
    pub fn login(&self, email: &str, password: &str) -> bool {
        if email == FAKE_ACCOUNT.email && password == FAKE_ACCOUNT.password {
            let user = FAKE_ACCOUNT.profile();
            info!(user = %user.name, "logged in");
            self.dispatch(AuthAction::Login(user));
        } else {
            debug!("login rejected");
        }
        self.state.borrow().is_authenticated
    }

    pub fn logout(&self) {
        self.dispatch(AuthAction::Logout);
    }
}
