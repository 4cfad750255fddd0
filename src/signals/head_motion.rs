//! Counts changes of the directional head pose label.

use super::pose::HeadPoseLabel;

#[derive(Debug, Clone, Default)]
pub struct HeadMotionCounter {
    last_label: Option<HeadPoseLabel>,
    count: u32,
}

impl HeadMotionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The first resolved label only seeds the counter; every later label
    /// that differs from the previous one counts a movement.
    /// Returns `true` when a movement was counted.
    pub fn update(&mut self, label: Option<HeadPoseLabel>) -> bool {
        let Some(label) = label else {
            return false;
        };
        match self.last_label {
            None => {
                self.last_label = Some(label);
                false
            }
            Some(last) if last != label => {
                self.last_label = Some(label);
                self.count += 1;
                true
            }
            Some(_) => false,
        }
    }

    pub fn movement_count(&self) -> u32 {
        self.count
    }

    pub fn last_label(&self) -> Option<HeadPoseLabel> {
        self.last_label
    }

    pub fn reset(&mut self) {
        self.last_label = None;
        self.count = 0;
    }
}
