// MIT License - Copyright (c) 2026 The dsc2mqtt Developers
// Panel-wide status

/// Panel-wide flags: trouble, keybus link, receive buffer health.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemStatus {
    pub trouble: bool,
    pub trouble_changed: bool,
    /// True while keybus traffic is being decoded
    pub link_connected: bool,
    pub link_changed: bool,
    /// The collaborator dropped keybus data because it was not polled often enough
    pub buffer_overflowed: bool,
    /// The panel is asking a keypad for an access code
    pub access_code_prompt: bool,
}

impl SystemStatus {
    pub fn set_trouble(&mut self, active: bool) -> bool {
        if self.trouble == active {
            return false;
        }
        self.trouble = active;
        self.trouble_changed = true;
        true
    }

    pub fn set_link_connected(&mut self, connected: bool) -> bool {
        if self.link_connected == connected {
            return false;
        }
        self.link_connected = connected;
        self.link_changed = true;
        true
    }

    pub fn has_changes(&self) -> bool {
        self.trouble_changed || self.link_changed
    }
}
