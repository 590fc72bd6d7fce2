//! Every icon has an ideal size derived from the container width. While a
//! pointer is over the dock, each icon is scaled by the reciprocal of a falloff
//! ratio that grows with the pointer's horizontal distance from the icon's
//! centre, so the icon under the pointer is the largest one.

use serde::{Deserialize, Serialize};

use crate::config::DockConfig;
use crate::range::map_range;

/// Ratio used when the pointer is outside the mappable distance range.
const NEUTRAL_RATIO: f32 = 1.0;

/// Target interval for the distance mapping.
///
/// `near` is the ratio at distance zero and `far` the ratio at a distance of
/// one container width. Sizes range from `ideal / far` to `ideal / near`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Falloff {
    pub near: f32,
    pub far: f32,
}

impl Default for Falloff {
    fn default() -> Self {
        Self {
            near: 0.5,
            far: 2.5,
        }
    }
}

impl Falloff {
    pub fn is_valid(&self) -> bool {
        self.near.is_finite() && self.far.is_finite() && self.near > 0.0 && self.near <= self.far
    }

    /// Ratio for an icon `distance` away from the pointer.
    pub fn ratio(&self, distance: f32, container_width: f32) -> f32 {
        map_range(distance, (0.0, container_width), (self.near, self.far)).unwrap_or(NEUTRAL_RATIO)
    }
}

/// Layout constants of one dock instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DockLayout {
    icon_count: usize,
    spacing: f32,
    padding: f32,
    max_icon_size: f32,
    falloff: Falloff,
    min_icon_size: f32,
}

impl DockLayout {
    /// Padding is a quarter of the bar height, the resting icon size at most half of it.
    pub fn new(
        icon_count: usize,
        spacing: f32,
        dock_height: f32,
        falloff: Falloff,
        min_icon_size: f32,
    ) -> Self {
        Self {
            icon_count,
            spacing,
            padding: dock_height / 4.0,
            max_icon_size: dock_height / 2.0,
            falloff,
            min_icon_size,
        }
    }

    pub fn from_config(config: &DockConfig) -> Self {
        Self::new(
            config.icons.len(),
            config.spacing,
            config.dock_height,
            config.falloff,
            config.min_icon_size,
        )
    }

    pub fn icon_count(&self) -> usize {
        self.icon_count
    }

    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    pub fn padding(&self) -> f32 {
        self.padding
    }

    pub fn max_icon_size(&self) -> f32 {
        self.max_icon_size
    }

    pub fn dock_height(&self) -> f32 {
        self.padding * 4.0
    }

    /// Width each icon gets when the container is shared evenly, net of gaps and padding.
    pub fn natural_slot_width(&self, container_width: f32) -> f32 {
        let count = self.icon_count as f32;
        let gaps = (count - 1.0) * self.spacing;
        (container_width - gaps - 2.0 * self.padding) / count
    }

    /// Resting icon size, before magnification and clamping.
    pub fn ideal_size(&self, container_width: f32) -> f32 {
        self.natural_slot_width(container_width).min(self.max_icon_size)
    }

    /// Horizontal centre of the slot at `index`, in container coordinates.
    pub fn icon_center(&self, index: usize, container_width: f32) -> f32 {
        let slot = self.natural_slot_width(container_width);
        let index = index as f32;
        self.padding + (index + 1.0) * slot + index * self.spacing - 0.5 * slot
    }

    /// Display size of the icon at `index`.
    ///
    /// Without a pointer every icon gets the ideal size. With one, the ideal
    /// size is divided by the falloff ratio for the icon's distance to the
    /// pointer. The result never drops below the configured minimum.
    pub fn icon_size(&self, index: usize, container_width: f32, pointer_x: Option<f32>) -> f32 {
        let ideal = self.ideal_size(container_width);

        let size = match pointer_x {
            Some(pointer_x) => {
                let distance = (self.icon_center(index, container_width) - pointer_x).abs();
                ideal / self.falloff.ratio(distance, container_width)
            }
            None => ideal,
        };

        size.max(self.min_icon_size)
    }

    /// Sizes for every icon, in icon order.
    pub fn icon_sizes(&self, container_width: f32, pointer_x: Option<f32>) -> Vec<f32> {
        (0..self.icon_count)
            .map(|index| self.icon_size(index, container_width, pointer_x))
            .collect()
    }

    /// Largest size `icon_size` can return.
    pub fn magnified_max_size(&self) -> f32 {
        (self.max_icon_size / self.falloff.near).max(self.min_icon_size)
    }

    /// Height needed to fit the bar plus fully magnified icons above its padding.
    pub fn surface_height(&self) -> f32 {
        let grown = self.padding * 2.0 + self.magnified_max_size();
        grown.max(self.dock_height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_layout() -> DockLayout {
        DockLayout::new(8, 8.0, 60.0, Falloff::default(), 1.0)
    }

    #[test]
    fn derives_padding_and_max_size_from_height() {
        let layout = reference_layout();
        assert_eq!(layout.padding(), 15.0);
        assert_eq!(layout.max_icon_size(), 30.0);
        assert_eq!(layout.dock_height(), 60.0);
    }

    #[test]
    fn resting_sizes_are_uniform_and_capped() {
        let layout = reference_layout();
        assert_eq!(layout.natural_slot_width(400.0), 39.25);
        assert_eq!(layout.ideal_size(400.0), 30.0);

        let sizes = layout.icon_sizes(400.0, None);
        assert_eq!(sizes.len(), 8);
        assert!(sizes.iter().all(|&size| size == 30.0));
    }

    #[test]
    fn resting_size_follows_slot_width_when_narrow() {
        let layout = reference_layout();
        // (200 - 56 - 30) / 8
        assert_eq!(layout.ideal_size(200.0), 14.25);
        assert!(layout.icon_sizes(200.0, None).iter().all(|&size| size == 14.25));
    }

    #[test]
    fn pointer_on_center_doubles_the_icon() {
        let layout = reference_layout();
        let center = layout.icon_center(0, 400.0);
        assert_eq!(center, 34.625);
        assert_eq!(layout.icon_size(0, 400.0, Some(center)), 60.0);
    }

    #[test]
    fn magnified_size_is_not_clamped_to_max_icon_size() {
        let layout = reference_layout();
        for index in 0..layout.icon_count() {
            let center = layout.icon_center(index, 400.0);
            let size = layout.icon_size(index, 400.0, Some(center));
            assert_eq!(size, 60.0);
            assert!(size > layout.max_icon_size());
        }
        assert_eq!(layout.magnified_max_size(), 60.0);
    }

    #[test]
    fn sizes_fall_off_with_distance() {
        let layout = reference_layout();
        let pointer = layout.icon_center(0, 400.0);
        let sizes = layout.icon_sizes(400.0, Some(pointer));
        for pair in sizes.windows(2) {
            assert!(pair[0] > pair[1], "{sizes:?}");
        }
        let smallest = layout.ideal_size(400.0) / Falloff::default().far;
        assert!(sizes.iter().all(|&size| size >= smallest && size <= 60.0));
    }

    #[test]
    fn far_pointer_falls_back_to_ideal() {
        let layout = reference_layout();
        assert_eq!(layout.icon_size(0, 400.0, Some(450.0)), 30.0);
        assert_eq!(layout.icon_size(7, 400.0, Some(-400.0)), 30.0);
    }

    #[test]
    fn pointer_exactly_one_width_away_uses_far_ratio() {
        let layout = reference_layout();
        let pointer = layout.icon_center(0, 400.0) + 400.0;
        assert_eq!(layout.icon_size(0, 400.0, Some(pointer)), 12.0);
    }

    #[test]
    fn identical_inputs_give_identical_sizes() {
        let layout = reference_layout();
        let first = layout.icon_sizes(400.0, Some(123.4));
        let second = layout.icon_sizes(400.0, Some(123.4));
        assert_eq!(first, second);
    }

    #[test]
    fn crowded_dock_clamps_to_minimum() {
        let layout = reference_layout();
        assert!(layout.natural_slot_width(50.0) < 0.0);
        assert!(layout.icon_sizes(50.0, None).iter().all(|&size| size == 1.0));
        assert!(layout.icon_sizes(50.0, Some(10.0)).iter().all(|&size| size == 1.0));
    }

    #[test]
    fn zero_width_container_stays_positive() {
        let layout = reference_layout();
        for size in layout.icon_sizes(0.0, Some(0.0)) {
            assert!(size > 0.0);
        }
    }

    #[test]
    fn custom_falloff_changes_bounds() {
        let layout = DockLayout::new(8, 8.0, 60.0, Falloff { near: 0.25, far: 1.0 }, 1.0);
        let center = layout.icon_center(3, 400.0);
        assert_eq!(layout.icon_size(3, 400.0, Some(center)), 120.0);
        assert_eq!(layout.magnified_max_size(), 120.0);
    }

    #[test]
    fn surface_fits_magnified_icons() {
        let layout = reference_layout();
        assert_eq!(layout.surface_height(), 90.0);
    }

    #[test]
    fn falloff_validation() {
        assert!(Falloff::default().is_valid());
        assert!(Falloff { near: 1.0, far: 1.0 }.is_valid());
        assert!(!Falloff { near: 0.0, far: 1.0 }.is_valid());
        assert!(!Falloff { near: 2.0, far: 1.0 }.is_valid());
    }
}
