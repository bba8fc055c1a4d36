use ratatui::{
    buffer::Buffer,
    layout::Rect,
    widgets::{Paragraph, Widget},
};

/// Operational counters shown in the bottom row with `--debug`.
#[derive(Debug, Default)]
pub struct DebugState {
    pub num_events: usize,
    pub num_frames: usize,
    pub num_key_events: usize,
    pub num_mouse_events: usize,
    /// Stream messages received from the compute backend.
    pub num_compute_messages: usize,
    /// Requests still streaming, set by the app before each frame.
    pub pending_requests: usize,
    pub last_key_event_name: String,
    pub last_type_name: String,
    /// Last action taken (e.g. "export_csv") for debugging key handling.
    pub last_action: String,
    pub enabled: bool,
}

impl DebugState {
    pub fn on_key(&mut self, event: &crossterm::event::KeyEvent) {
        self.num_key_events += 1;
        self.last_key_event_name = format!("{:?}", event.code);
        self.last_type_name = format!("{:?}", event.kind);
    }

    pub fn on_mouse(&mut self, event: &crossterm::event::MouseEvent) {
        self.num_mouse_events += 1;
        self.last_type_name = format!("{:?}", event.kind);
    }

    pub fn set_action(&mut self, action: impl Into<String>) {
        self.last_action = action.into();
        tracing::debug!(action = %self.last_action, "action");
    }
}

impl Widget for &DebugState {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(format!(
            "events={} keys={} mouse={} compute={} pending={} last_key={} kind={} last_action={} frames={}",
            self.num_events,
            self.num_key_events,
            self.num_mouse_events,
            self.num_compute_messages,
            self.pending_requests,
            self.last_key_event_name,
            self.last_type_name,
            self.last_action,
            self.num_frames,
        ))
        .render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    #[test]
    fn counts_keys_and_renders_counters() {
        let mut state = DebugState::default();
        state.on_key(&KeyEvent::new(KeyCode::Char('b'), KeyModifiers::NONE));
        state.set_action("bucket_dialog");
        state.pending_requests = 2;
        let area = Rect::new(0, 0, 140, 1);
        let mut buf = Buffer::empty(area);
        (&state).render(area, &mut buf);
        let line: String = (0..area.width).map(|x| buf[(x, 0)].symbol().to_string()).collect();
        assert!(line.contains("keys=1"));
        assert!(line.contains("pending=2"));
        assert!(line.contains("last_action=bucket_dialog"));
    }
}
