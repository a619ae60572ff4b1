/// State of the live-update channel as shown in the status bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    Failed,
}

impl ConnectionStatus {
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Connected)
    }

    #[must_use]
    pub fn label(self) -> String {
        match self {
            Self::Disconnected => "offline".to_string(),
            Self::Connecting => "connecting".to_string(),
            Self::Connected => "live".to_string(),
            Self::Reconnecting { attempt } => format!("reconnecting ({attempt})"),
            Self::Failed => "live updates unavailable".to_string(),
        }
    }
}
