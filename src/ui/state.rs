// Dashboard view state driven by keys and engine updates

use super::input::Action;
use super::panels::InfoKind;
use crate::models::{ChartSnapshot, DashboardEvent};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug, Default)]
pub struct ViewState {
    /// Index of the first container shown in every panel.
    pub offset: usize,
    pub info_kind: InfoKind,
    pub inspect: bool,
    /// Latest snapshot published by the engine.
    pub chart: ChartSnapshot,
}

impl ViewState {
    pub fn apply(&mut self, event: DashboardEvent) {
        match event {
            DashboardEvent::ContainerAdded(record) => {
                debug!(id = %record.id, name = %record.name, "container added");
            }
            DashboardEvent::ContainerRemoved(id) => {
                debug!(id = %id, "container removed");
            }
            DashboardEvent::Chart(snapshot) => self.chart = snapshot,
        }
    }

    /// `count` is the size of the active container set the panels are drawn from.
    pub fn handle(&mut self, action: Action, count: usize) -> Flow {
        match action {
            Action::Up => self.offset = self.offset.saturating_sub(1),
            Action::Down => self.offset = (self.offset + 1).min(count.saturating_sub(1)),
            Action::PrevInfo => self.info_kind = self.info_kind.prev(),
            Action::NextInfo => self.info_kind = self.info_kind.next(),
            Action::ToggleInspect => self.inspect = !self.inspect,
            Action::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    /// Pulls the offset back when containers disappear underneath it.
    pub fn clamp(&mut self, count: usize) {
        self.offset = self.offset.min(count.saturating_sub(1));
    }
}
