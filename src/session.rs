use crate::models::{Role, User};

/// Dashboard the client should show for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, juniper::GraphQLEnum)]
pub enum Surface {
    Login,
    AdminDashboard,
    UserDashboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, juniper::GraphQLEnum)]
pub enum SessionStateKind {
    LoggedOut,
    LoggedInAdmin,
    LoggedInUser,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SignedIn(User),
    SignedOut,
}

/// Who is on the other side of a request.
///
/// The role only decides which surface is offered. Every operation still
/// checks permissions against the directory row on its own.
#[derive(Debug, Clone, PartialEq)]
pub enum Session {
    LoggedOut,
    LoggedInAdmin(User),
    LoggedInUser(User),
}

impl Default for Session {
    fn default() -> Self {
        Session::LoggedOut
    }
}

impl Session {
    /// Any sign-in replaces whatever came before it.
    pub fn transition(self, event: SessionEvent) -> Session {
        match event {
            SessionEvent::SignedIn(user) => match user.role {
                Role::Admin => Session::LoggedInAdmin(user),
                Role::User => Session::LoggedInUser(user),
            },
            SessionEvent::SignedOut => Session::LoggedOut,
        }
    }

    pub fn for_user(user: User) -> Session {
        Session::LoggedOut.transition(SessionEvent::SignedIn(user))
    }

    pub fn kind(&self) -> SessionStateKind {
        match self {
            Session::LoggedOut => SessionStateKind::LoggedOut,
            Session::LoggedInAdmin(_) => SessionStateKind::LoggedInAdmin,
            Session::LoggedInUser(_) => SessionStateKind::LoggedInUser,
        }
    }

    pub fn surface(&self) -> Surface {
        match self {
            Session::LoggedOut => Surface::Login,
            Session::LoggedInAdmin(_) => Surface::AdminDashboard,
            Session::LoggedInUser(_) => Surface::UserDashboard,
        }
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Session::LoggedOut => None,
            Session::LoggedInAdmin(user) | Session::LoggedInUser(user) => Some(user),
        }
    }
}
