use glam::Vec2;

/// A touch event forwarded from the host: an action code and flat
/// `x, y` coordinate pairs, one per pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct TouchEvent {
    pub action: i32,
    pub points: Vec<Vec2>,
}

impl TouchEvent {
    /// Groups `point_data` into pairs. `point_count` caps the number of
    /// pointers kept; a trailing odd coordinate is dropped.
    pub fn parse(action: i32, point_count: usize, point_data: &[f64]) -> Option<Self> {
        let points: Vec<Vec2> = point_data
            .chunks_exact(2)
            .take(point_count)
            .map(|pair| Vec2::new(pair[0] as f32, pair[1] as f32))
            .collect();
        if points.is_empty() {
            log::warn!(
                "Touch action {action} ignored: need at least one x/y pair, got {} values",
                point_data.len()
            );
            return None;
        }
        Some(Self { action, points })
    }

    pub fn primary(&self) -> Vec2 {
        self.points[0]
    }
}

#[cfg(test)]
mod tests {
    use super::TouchEvent;
    use glam::Vec2;

    #[test]
    fn pairs_are_grouped_and_capped() {
        let event = TouchEvent::parse(0, 1, &[10.0, 20.0, 30.0, 40.0]).unwrap();
        assert_eq!(event.points, vec![Vec2::new(10.0, 20.0)]);
        assert_eq!(event.primary(), Vec2::new(10.0, 20.0));
    }

    #[test]
    fn too_few_coordinates_are_rejected() {
        assert!(TouchEvent::parse(0, 1, &[5.0]).is_none());
        assert!(TouchEvent::parse(1, 0, &[5.0, 6.0]).is_none());
    }
}
