use glam::{EulerRot, Mat4, Vec3};

/// View and projection for one effect.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Camera {
    /// Fixed `[-1, 1]` box looking down -z from `z = 1`.
    Orthographic,
    Perspective {
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
        eye: Vec3,
    },
}

impl Camera {
    pub fn perspective(aspect: f32) -> Self {
        Camera::Perspective {
            fov_y: 45f32.to_radians(),
            aspect,
            near: 0.1,
            far: 100.0,
            eye: Vec3::new(0.0, 0.0, 8.0),
        }
    }

    pub fn set_aspect(&mut self, value: f32) {
        if let Camera::Perspective { aspect, .. } = self {
            *aspect = value;
        }
    }

    pub fn set_eye(&mut self, value: Vec3) {
        if let Camera::Perspective { eye, .. } = self {
            *eye = value;
        }
    }

    pub fn view(&self) -> Mat4 {
        match *self {
            Camera::Orthographic => Mat4::from_translation(Vec3::new(0.0, 0.0, -1.0)),
            Camera::Perspective { eye, .. } => Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y),
        }
    }

    pub fn projection(&self) -> Mat4 {
        match *self {
            Camera::Orthographic => Mat4::orthographic_rh_gl(-1.0, 1.0, -1.0, 1.0, 0.1, 1000.0),
            Camera::Perspective {
                fov_y,
                aspect,
                near,
                far,
                ..
            } => Mat4::perspective_rh_gl(fov_y, aspect, near, far),
        }
    }
}

/// Euler rotation (XYZ order) applied to the effect's mesh.
pub fn model_matrix(rotation: Vec3) -> Mat4 {
    Mat4::from_euler(EulerRot::XYZ, rotation.x, rotation.y, rotation.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orthographic_keeps_plane_in_clip_space() {
        let cam = Camera::Orthographic;
        let clip = cam.projection() * cam.view() * glam::Vec4::new(1.0, -1.0, 0.0, 1.0);
        assert!((clip.x - 1.0).abs() < 1e-5);
        assert!((clip.y + 1.0).abs() < 1e-5);
        assert!(clip.z.abs() < 1.0);
    }

    #[test]
    fn perspective_puts_origin_in_front() {
        let cam = Camera::perspective(16.0 / 9.0);
        let view_pos = cam.view() * glam::Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!((view_pos.z + 8.0).abs() < 1e-5);
    }

    #[test]
    fn aspect_and_eye_ignored_for_orthographic() {
        let mut cam = Camera::Orthographic;
        cam.set_aspect(3.0);
        cam.set_eye(Vec3::ONE);
        assert_eq!(cam, Camera::Orthographic);
    }
}
