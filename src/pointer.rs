use crate::types::PointerSample;

/// Last pointer sample seen by the dock.
///
/// Written by the input handlers, read by the renderer. `update` reports
/// whether the sample actually changed so repeated identical positions don't
/// trigger another frame.
#[derive(Default)]
pub struct PointerState {
    sample: PointerSample,
    touch_id: Option<i32>,
}

impl PointerState {
    pub fn sample(&self) -> PointerSample {
        self.sample
    }

    pub fn update(&mut self, sample: PointerSample) -> bool {
        if self.sample == sample {
            return false;
        }
        tracing::trace!(?sample, "pointer sample");
        self.sample = sample;
        true
    }

    pub fn moved(&mut self, x: f64) -> bool {
        self.update(Some(x as f32))
    }

    pub fn release(&mut self) -> bool {
        self.update(None)
    }

    /// First touch point down becomes the one that drives the sample.
    pub fn touch_down(&mut self, id: i32, x: f64) -> bool {
        match self.touch_id {
            Some(active) if active != id => false,
            _ => {
                self.touch_id = Some(id);
                self.moved(x)
            }
        }
    }

    pub fn touch_motion(&mut self, id: i32, x: f64) -> bool {
        if self.touch_id != Some(id) {
            return false;
        }
        self.moved(x)
    }

    pub fn touch_up(&mut self, id: i32) -> bool {
        if self.touch_id != Some(id) {
            return false;
        }
        self.touch_id = None;
        self.release()
    }

    pub fn touch_cancel(&mut self) -> bool {
        self.touch_id = None;
        self.release()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_absent() {
        assert_eq!(PointerState::default().sample(), None);
    }

    #[test]
    fn identical_samples_are_not_changes() {
        let mut state = PointerState::default();
        assert!(state.moved(120.0));
        assert!(!state.moved(120.0));
        assert!(state.moved(121.5));
        assert_eq!(state.sample(), Some(121.5));
    }

    #[test]
    fn release_clears_once() {
        let mut state = PointerState::default();
        state.moved(10.0);
        assert!(state.release());
        assert!(!state.release());
        assert_eq!(state.sample(), None);
    }

    #[test]
    fn only_primary_touch_drives_sample() {
        let mut state = PointerState::default();
        assert!(state.touch_down(1, 50.0));
        assert!(!state.touch_down(2, 300.0));
        assert!(!state.touch_motion(2, 310.0));
        assert!(state.touch_motion(1, 60.0));
        assert_eq!(state.sample(), Some(60.0));

        assert!(!state.touch_up(2));
        assert!(state.touch_up(1));
        assert_eq!(state.sample(), None);

        assert!(state.touch_down(2, 200.0));
        assert_eq!(state.sample(), Some(200.0));
    }

    #[test]
    fn cancel_drops_touch() {
        let mut state = PointerState::default();
        state.touch_down(4, 80.0);
        assert!(state.touch_cancel());
        assert!(state.touch_down(5, 90.0));
    }
}
