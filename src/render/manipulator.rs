//! Gesture-driven camera controller producing eye/target/up for the view camera.

use crate::engine::FovDirection;
use crate::scene::{Camera, ManipulatorMode};
use glam::{Vec2, Vec3, Vec4};
use std::f32::consts::FRAC_PI_2;

const MIN_DISTANCE: f32 = 0.05;
const MAX_PITCH: f32 = FRAC_PI_2 - 0.01;

#[derive(Debug, Clone, PartialEq)]
pub struct ManipulatorConfig {
    pub viewport: (u32, u32),
    pub target_position: Vec3,
    pub up_vector: Vec3,
    pub zoom_speed: f32,
    pub orbit_home_position: Vec3,
    pub orbit_speed: Vec2,
    pub fov_direction: FovDirection,
    pub fov_degrees: f32,
    pub far_plane: f32,
    /// Width and height of the pannable map around `target_position`,
    /// measured in `ground_plane`. Zero leaves Map pan unbounded.
    pub map_extent: Vec2,
    pub map_min_distance: f32,
    pub flight_start_position: Vec3,
    /// Pitch then yaw, in radians. Zero looks down -Z.
    pub flight_start_orientation: Vec2,
    /// Carried for the native free-flight controller; steps here move undamped.
    pub flight_move_damping: f32,
    pub flight_speed_steps: u32,
    pub flight_max_move_speed: f32,
    /// Plane equation `ax + by + cz + d = 0`; its normal orients `map_extent`.
    pub ground_plane: Vec4,
}

impl Default for ManipulatorConfig {
    fn default() -> Self {
        Self {
            viewport: (1, 1),
            target_position: Vec3::ZERO,
            up_vector: Vec3::Y,
            zoom_speed: 0.01,
            orbit_home_position: Vec3::Z,
            orbit_speed: Vec2::splat(0.01),
            fov_direction: FovDirection::Vertical,
            fov_degrees: 33.0,
            far_plane: 5000.0,
            map_extent: Vec2::ZERO,
            map_min_distance: 0.0,
            flight_start_position: Vec3::ZERO,
            flight_start_orientation: Vec2::ZERO,
            flight_move_damping: 15.0,
            flight_speed_steps: 80,
            flight_max_move_speed: 10.0,
            ground_plane: Vec4::new(0.0, 0.0, 1.0, 0.0),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ManipulatorBuilder {
    config: ManipulatorConfig,
}

impl ManipulatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds every field the camera declares; the rest keep their defaults.
    pub fn from_camera(camera: &Camera) -> Self {
        let mut builder = Self::new();
        let c = &mut builder.config;
        if let Some(v) = camera.target_position {
            c.target_position = v;
        }
        if let Some(v) = camera.up_vector {
            c.up_vector = v;
        }
        if let Some(v) = camera.zoom_speed {
            c.zoom_speed = v;
        }
        if let Some(v) = camera.orbit_home_position {
            c.orbit_home_position = v;
        }
        if let Some(v) = camera.orbit_speed {
            c.orbit_speed = v;
        }
        if let Some(v) = camera.fov_direction {
            c.fov_direction = v;
        }
        if let Some(v) = camera.fov_degrees {
            c.fov_degrees = v;
        }
        if let Some(v) = camera.far_plane {
            c.far_plane = v;
        }
        if let Some(v) = camera.map_extent {
            c.map_extent = v;
        }
        if let Some(v) = camera.map_min_distance {
            c.map_min_distance = v;
        }
        if let Some(v) = camera.flight_start_position {
            c.flight_start_position = v;
        }
        if let Some(v) = camera.flight_start_orientation {
            c.flight_start_orientation = v;
        }
        if let Some(v) = camera.flight_move_damping {
            c.flight_move_damping = v;
        }
        if let Some(v) = camera.flight_speed_steps {
            c.flight_speed_steps = v;
        }
        if let Some(v) = camera.flight_max_move_speed {
            c.flight_max_move_speed = v;
        }
        if let Some(v) = camera.ground_plane {
            c.ground_plane = v;
        }
        builder
    }

    pub fn target_position(mut self, target: Vec3) -> Self {
        self.config.target_position = target;
        self
    }

    pub fn up_vector(mut self, up: Vec3) -> Self {
        self.config.up_vector = up;
        self
    }

    pub fn zoom_speed(mut self, speed: f32) -> Self {
        self.config.zoom_speed = speed;
        self
    }

    pub fn orbit_home_position(mut self, eye: Vec3) -> Self {
        self.config.orbit_home_position = eye;
        self
    }

    pub fn orbit_speed(mut self, speed: Vec2) -> Self {
        self.config.orbit_speed = speed;
        self
    }

    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.config.viewport = (width.max(1), height.max(1));
        self
    }

    pub fn build(self, mode: ManipulatorMode) -> Manipulator {
        Manipulator::new(mode, self.config)
    }
}

#[derive(Debug, Clone, Copy)]
struct Grab {
    x: f32,
    y: f32,
    strafe: bool,
    eye: Vec3,
    target: Vec3,
}

#[derive(Debug, Clone)]
pub struct Manipulator {
    mode: ManipulatorMode,
    config: ManipulatorConfig,
    eye: Vec3,
    target: Vec3,
    grab: Option<Grab>,
}

impl Manipulator {
    fn new(mode: ManipulatorMode, config: ManipulatorConfig) -> Self {
        let (eye, target) = home(mode, &config);
        Self {
            mode,
            config,
            eye,
            target,
            grab: None,
        }
    }

    pub fn mode(&self) -> ManipulatorMode {
        self.mode
    }

    pub fn config(&self) -> &ManipulatorConfig {
        &self.config
    }

    pub fn look_at(&self) -> (Vec3, Vec3, Vec3) {
        (self.eye, self.target, self.config.up_vector)
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.config.viewport = (width.max(1), height.max(1));
    }

    pub fn jump_home(&mut self) {
        let (eye, target) = home(self.mode, &self.config);
        self.eye = eye;
        self.target = target;
        self.grab = None;
    }

    pub fn is_grabbing(&self) -> bool {
        self.grab.is_some()
    }

    /// Starts a drag. `strafe` pans instead of rotating.
    pub fn grab_begin(&mut self, x: f32, y: f32, strafe: bool) {
        self.grab = Some(Grab {
            x,
            y,
            strafe,
            eye: self.eye,
            target: self.target,
        });
    }

    pub fn grab_update(&mut self, x: f32, y: f32) {
        let Some(grab) = self.grab else {
            return;
        };
        let delta = Vec2::new(x - grab.x, y - grab.y);
        match (self.mode, grab.strafe) {
            (ManipulatorMode::Orbit, false) => {
                self.eye = self.orbit(&grab, delta);
                self.target = grab.target;
            }
            (ManipulatorMode::Orbit, true) => {
                let offset = self.pan(&grab, delta);
                self.eye = grab.eye + offset;
                self.target = grab.target + offset;
            }
            (ManipulatorMode::Map, _) => {
                let offset = self.pan(&grab, delta);
                let target = grab.target + offset;
                let offset = offset + self.map_correction(target);
                self.eye = grab.eye + offset;
                self.target = grab.target + offset;
            }
            (ManipulatorMode::FreeFlight, _) => {
                let (yaw, pitch) = forward_to_yaw_pitch(grab.target - grab.eye);
                let yaw = yaw + delta.x * self.config.orbit_speed.x;
                let pitch = (pitch - delta.y * self.config.orbit_speed.y).clamp(-MAX_PITCH, MAX_PITCH);
                self.eye = grab.eye;
                self.target = grab.eye + basis_forward(yaw, pitch);
            }
        }
    }

    pub fn grab_end(&mut self) {
        self.grab = None;
    }

    /// Positive `delta` moves away from the target; free flight steps along the view.
    pub fn scroll(&mut self, _x: f32, _y: f32, delta: f32) {
        if self.mode == ManipulatorMode::FreeFlight {
            let step = self.config.flight_max_move_speed / self.config.flight_speed_steps.max(1) as f32;
            let forward = (self.target - self.eye).normalize_or_zero();
            let offset = forward * (-delta * step);
            self.eye += offset;
            self.target += offset;
            return;
        }
        let offset = self.eye - self.target;
        let distance = offset.length().max(MIN_DISTANCE);
        let min = self.config.map_min_distance.max(MIN_DISTANCE);
        let max = self.config.far_plane.max(min);
        let scaled = (distance * (1.0 + delta * self.config.zoom_speed)).clamp(min, max);
        self.eye = self.target + offset.normalize_or_zero() * scaled;
    }

    fn orbit(&self, grab: &Grab, delta: Vec2) -> Vec3 {
        let offset = grab.eye - grab.target;
        let distance = offset.length().max(MIN_DISTANCE);
        let (yaw, pitch) = forward_to_yaw_pitch(-offset);
        let yaw = yaw + delta.x * self.config.orbit_speed.x;
        let pitch = (pitch - delta.y * self.config.orbit_speed.y).clamp(-MAX_PITCH, MAX_PITCH);
        grab.target - basis_forward(yaw, pitch) * distance
    }

    /// World-space offset that keeps the grabbed point under the pointer.
    /// Shift that brings `target` back inside the map extent.
    fn map_correction(&self, target: Vec3) -> Vec3 {
        let half = self.config.map_extent * 0.5;
        let normal = self.config.ground_plane.truncate().normalize_or_zero();
        if half == Vec2::ZERO || normal == Vec3::ZERO {
            return Vec3::ZERO;
        }
        let u = (Vec3::X - normal * normal.x).normalize_or_zero();
        let u = if u == Vec3::ZERO { Vec3::Y } else { u };
        let v = normal.cross(u);
        let relative = target - self.config.target_position;
        let (a, b) = (relative.dot(u), relative.dot(v));
        u * (a.clamp(-half.x, half.x) - a) + v * (b.clamp(-half.y, half.y) - b)
    }

    fn pan(&self, grab: &Grab, delta: Vec2) -> Vec3 {
        let forward = (grab.target - grab.eye).normalize_or_zero();
        let right = forward.cross(self.config.up_vector).normalize_or_zero();
        let up = right.cross(forward);
        let distance = grab.eye.distance(grab.target).max(MIN_DISTANCE);
        let (width, height) = self.config.viewport;
        let span = match self.config.fov_direction {
            FovDirection::Vertical => height,
            FovDirection::Horizontal => width,
        };
        let half_fov = self.config.fov_degrees.to_radians() * 0.5;
        let units_per_pixel = 2.0 * distance * half_fov.tan() / span.max(1) as f32;
        (-right * delta.x + up * delta.y) * units_per_pixel
    }
}

fn home(mode: ManipulatorMode, config: &ManipulatorConfig) -> (Vec3, Vec3) {
    match mode {
        ManipulatorMode::Orbit | ManipulatorMode::Map => {
            let target = config.target_position;
            let eye = config.orbit_home_position;
            if eye.distance(target) < MIN_DISTANCE {
                (target + Vec3::Z, target)
            } else {
                (eye, target)
            }
        }
        ManipulatorMode::FreeFlight => {
            let eye = config.flight_start_position;
            let orientation = config.flight_start_orientation;
            // yaw zero faces -Z
            let forward = basis_forward(orientation.y - FRAC_PI_2, orientation.x);
            (eye, eye + forward)
        }
    }
}

fn forward_to_yaw_pitch(forward: Vec3) -> (f32, f32) {
    let n = forward.try_normalize().unwrap_or(Vec3::NEG_Z);
    (n.z.atan2(n.x), n.y.clamp(-1.0, 1.0).asin())
}

fn basis_forward(yaw: f32, pitch: f32) -> Vec3 {
    let cos_pitch = pitch.cos();
    Vec3::new(yaw.cos() * cos_pitch, pitch.sin(), yaw.sin() * cos_pitch)
}

#[cfg(test)]
mod tests {
    use super::ManipulatorBuilder;
    use crate::scene::{Camera, ManipulatorMode};
    use glam::{Vec2, Vec3};

    fn close(a: Vec3, b: Vec3) -> bool {
        a.distance(b) < 1e-4
    }

    #[test]
    fn orbit_starts_at_home_and_keeps_distance() {
        let mut manipulator = ManipulatorBuilder::new()
            .target_position(Vec3::new(0.0, 0.0, -4.0))
            .viewport(800, 600)
            .build(ManipulatorMode::Orbit);
        let (eye, target, up) = manipulator.look_at();
        assert_eq!(eye, Vec3::Z);
        assert_eq!(target, Vec3::new(0.0, 0.0, -4.0));
        assert_eq!(up, Vec3::Y);

        manipulator.grab_begin(100.0, 100.0, false);
        manipulator.grab_update(160.0, 80.0);
        let (moved, same_target, _) = manipulator.look_at();
        assert!(!close(moved, eye));
        assert_eq!(same_target, target);
        assert!((moved.distance(target) - 5.0).abs() < 1e-3);

        manipulator.grab_end();
        manipulator.grab_update(0.0, 0.0);
        assert!(close(manipulator.look_at().0, moved));
    }

    #[test]
    fn strafe_moves_eye_and_target_together() {
        let mut manipulator = ManipulatorBuilder::new().viewport(100, 100).build(ManipulatorMode::Orbit);
        manipulator.grab_begin(50.0, 50.0, true);
        manipulator.grab_update(70.0, 50.0);
        let (eye, target, _) = manipulator.look_at();
        assert!(target.x < 0.0);
        assert!(close(eye - target, Vec3::Z));
    }

    #[test]
    fn scroll_zooms_within_limits_and_home_resets() {
        let mut manipulator = ManipulatorBuilder::new().zoom_speed(0.1).build(ManipulatorMode::Orbit);
        manipulator.scroll(0.0, 0.0, -5.0);
        assert!((manipulator.look_at().0.length() - 0.5).abs() < 1e-4);
        for _ in 0..100 {
            manipulator.scroll(0.0, 0.0, -5.0);
        }
        assert!(manipulator.look_at().0.length() >= 0.05 - 1e-6);
        manipulator.jump_home();
        assert_eq!(manipulator.look_at().0, Vec3::Z);
    }

    #[test]
    fn map_pan_stops_at_the_extent() {
        let camera = Camera {
            map_extent: Some(Vec2::new(2.0, 2.0)),
            ..Camera::default()
        };
        let mut manipulator = ManipulatorBuilder::from_camera(&camera)
            .viewport(100, 100)
            .build(ManipulatorMode::Map);
        manipulator.grab_begin(0.0, 0.0, false);
        manipulator.grab_update(10.0, 0.0);
        let (_, inside, _) = manipulator.look_at();
        assert!(inside.x < 0.0 && inside.x > -1.0);

        manipulator.grab_update(1000.0, 0.0);
        let (eye, target, _) = manipulator.look_at();
        assert!(close(target, Vec3::new(-1.0, 0.0, 0.0)));
        assert!(close(eye - target, Vec3::Z));
    }

    #[test]
    fn free_flight_rotates_in_place() {
        let camera = Camera {
            flight_start_position: Some(Vec3::new(1.0, 2.0, 3.0)),
            orbit_speed: Some(Vec2::splat(0.01)),
            ..Camera::default()
        };
        let mut manipulator = ManipulatorBuilder::from_camera(&camera).build(ManipulatorMode::FreeFlight);
        let (eye, target, _) = manipulator.look_at();
        assert!(close(target - eye, Vec3::NEG_Z));
        manipulator.grab_begin(0.0, 0.0, false);
        manipulator.grab_update(30.0, 0.0);
        let (same_eye, turned, _) = manipulator.look_at();
        assert_eq!(same_eye, eye);
        assert!(!close(turned - eye, Vec3::NEG_Z));
    }

    #[test]
    fn builder_takes_camera_fields() {
        let camera = Camera {
            target_position: Some(Vec3::new(0.0, 1.0, 0.0)),
            orbit_home_position: Some(Vec3::new(0.0, 1.0, 6.0)),
            far_plane: Some(50.0),
            ..Camera::default()
        };
        let manipulator = ManipulatorBuilder::from_camera(&camera).build(ManipulatorMode::Map);
        assert_eq!(manipulator.config().far_plane, 50.0);
        assert_eq!(manipulator.look_at().0, Vec3::new(0.0, 1.0, 6.0));
        assert_eq!(manipulator.mode(), ManipulatorMode::Map);
    }
}
