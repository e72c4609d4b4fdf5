use std::fmt;

/// Where a [`ClientSession`](super::ClientSession) is in its browsing loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientState {
    #[default]
    Idle,
    AwaitingConnection,
    AwaitingMainResponse,
    AwaitingInlineResponse,
    ReadingPause,
    Closed,
}

impl ClientState {
    /// Whether response bytes are expected in this state.
    #[inline]
    pub fn is_awaiting_response(self) -> bool {
        matches!(self, ClientState::AwaitingMainResponse | ClientState::AwaitingInlineResponse)
    }

    #[inline]
    pub fn is_closed(self) -> bool {
        self == ClientState::Closed
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClientState::Idle => "idle",
            ClientState::AwaitingConnection => "awaiting connection",
            ClientState::AwaitingMainResponse => "awaiting main response",
            ClientState::AwaitingInlineResponse => "awaiting inline response",
            ClientState::ReadingPause => "reading pause",
            ClientState::Closed => "closed",
        };
        f.write_str(name)
    }
}
