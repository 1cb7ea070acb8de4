//! Which endpoint created a connection.

/// Endpoint role of a connection.
///
/// The wire format is symmetric; the role only decides how the connection
/// came to be (outbound connect or inbound accept) and shows up in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Outbound connection created by a [`Client`](crate::Client).
    Client,
    /// Inbound connection accepted by a [`Server`](crate::Server).
    Server,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Client => write!(f, "Client"),
            Role::Server => write!(f, "Server"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_display() {
        assert_eq!(Role::Client.to_string(), "Client");
        assert_eq!(Role::Server.to_string(), "Server");
    }
}
