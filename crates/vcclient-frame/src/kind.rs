//! Frame kinds.
//!
//! The first header field names the channel/semantics of a frame. On replies
//! the same position carries the acknowledgement code instead, see
//! [`crate::ack::AckCode`].

/// Kind of an outbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Endpoint-addressed command (call control, queries).
    Command,
    /// Create a new simulated endpoint.
    CreateEndpoint,
    /// Attach to an endpoint created by another client.
    AttachEndpoint,
    /// Server-side log control.
    Log,
    /// Generic, non-addressed command.
    Generic,
}

impl FrameKind {
    /// Wire character for this kind.
    pub const fn as_char(self) -> char {
        match self {
            FrameKind::Command => 'c',
            FrameKind::CreateEndpoint => 'n',
            FrameKind::AttachEndpoint => 'e',
            FrameKind::Log => 'l',
            FrameKind::Generic => 'g',
        }
    }

    /// Parse a wire character.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'c' => Some(FrameKind::Command),
            'n' => Some(FrameKind::CreateEndpoint),
            'e' => Some(FrameKind::AttachEndpoint),
            'l' => Some(FrameKind::Log),
            'g' => Some(FrameKind::Generic),
            _ => None,
        }
    }

    /// Human-readable name.
    pub const fn name(self) -> &'static str {
        match self {
            FrameKind::Command => "COMMAND",
            FrameKind::CreateEndpoint => "CREATE",
            FrameKind::AttachEndpoint => "ATTACH",
            FrameKind::Log => "LOG",
            FrameKind::Generic => "GENERIC",
        }
    }

    /// True if frames of this kind carry an endpoint-level acknowledgement.
    pub const fn is_endpoint_addressed(self) -> bool {
        !matches!(self, FrameKind::Generic)
    }
}

impl std::fmt::Display for FrameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl std::str::FromStr for FrameKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                Self::from_char(c).ok_or_else(|| format!("unknown frame kind '{s}'"))
            }
            _ => match s.to_ascii_lowercase().as_str() {
                "command" => Ok(FrameKind::Command),
                "create" => Ok(FrameKind::CreateEndpoint),
                "attach" => Ok(FrameKind::AttachEndpoint),
                "log" => Ok(FrameKind::Log),
                "generic" => Ok(FrameKind::Generic),
                _ => Err(format!("unknown frame kind '{s}'")),
            },
        }
    }
}
