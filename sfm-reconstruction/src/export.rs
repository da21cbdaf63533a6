use cv_core::nalgebra::{Point3, Vector3};
use ply_rs::{
    ply::{
        Addable, DefaultElement, ElementDef, Encoding, Ply, Property, PropertyDef, PropertyType,
        ScalarType,
    },
    writer::Writer,
};
use std::io::Write;

const FRUSTUM_COLOR: [u8; 3] = [255, 0, 255];

/// A camera drawn as a pyramid with its apex at the optical center.
#[derive(Debug, Clone, Copy)]
pub struct ExportCamera {
    pub optical_center: Point3<f64>,
    pub up_direction: Vector3<f64>,
    pub forward_direction: Vector3<f64>,
    /// Distance from the apex to the base of the pyramid, which is twice as wide.
    pub focal_length: f64,
}

/// Collects the vertices and faces of a colored point cloud.
#[derive(Default)]
struct PlyBuilder {
    vertices: Vec<DefaultElement>,
    faces: Vec<DefaultElement>,
}

impl PlyBuilder {
    fn vertex(&mut self, position: Point3<f64>, [red, green, blue]: [u8; 3]) -> i32 {
        let mut vertex = DefaultElement::new();
        for (key, value) in [("x", position.x), ("y", position.y), ("z", position.z)] {
            vertex.insert(key.to_owned(), Property::Double(value));
        }
        for (key, value) in [("red", red), ("green", green), ("blue", blue)] {
            vertex.insert(key.to_owned(), Property::UChar(value));
        }
        self.vertices.push(vertex);
        self.vertices.len() as i32 - 1
    }

    fn face(&mut self, corners: [i32; 3]) {
        let mut face = DefaultElement::new();
        face.insert("vertex_index".to_owned(), Property::ListInt(corners.to_vec()));
        self.faces.push(face);
    }

    fn frustum(&mut self, camera: &ExportCamera, with_faces: bool) {
        let ExportCamera {
            optical_center,
            up_direction,
            forward_direction,
            focal_length,
        } = *camera;
        let right_direction = forward_direction.cross(&up_direction);
        let apex = self.vertex(optical_center, FRUSTUM_COLOR);
        let base_center = optical_center + forward_direction * focal_length;
        let corners = [(1.0, 1.0), (1.0, -1.0), (-1.0, -1.0), (-1.0, 1.0)].map(|(up, right)| {
            let corner = base_center
                + up_direction * (up * focal_length)
                + right_direction * (right * focal_length);
            self.vertex(corner, FRUSTUM_COLOR)
        });
        if with_faces {
            for side in 0..4 {
                self.face([apex, corners[(side + 3) % 4], corners[side]]);
            }
        }
    }

    fn write(self, mut writer: impl Write, with_faces: bool) -> std::io::Result<()> {
        let scalar = |name: &str, scalar: ScalarType| {
            PropertyDef::new(name.to_owned(), PropertyType::Scalar(scalar))
        };
        let mut ply = Ply::<DefaultElement>::new();
        ply.header.encoding = Encoding::Ascii;
        ply.header
            .comments
            .push("Exported from cityslam-mapping".to_owned());

        let mut vertex = ElementDef::new("vertex".to_owned());
        for axis in ["x", "y", "z"] {
            vertex.properties.add(scalar(axis, ScalarType::Double));
        }
        for channel in ["red", "green", "blue"] {
            vertex.properties.add(scalar(channel, ScalarType::UChar));
        }
        ply.header.elements.add(vertex);
        ply.payload.insert("vertex".to_owned(), self.vertices);

        if with_faces {
            let mut face = ElementDef::new("face".to_owned());
            face.properties.add(PropertyDef::new(
                "vertex_index".to_owned(),
                PropertyType::List(ScalarType::UChar, ScalarType::Int),
            ));
            ply.header.elements.add(face);
            ply.payload.insert("face".to_owned(), self.faces);
        }

        Writer::new().write_ply(&mut writer, &mut ply)?;
        writer.flush()
    }
}

/// Writes an ASCII PLY holding the camera frusta followed by the colored points.
///
/// With `camera_faces` the sides of every frustum are written as triangles.
pub fn export(
    writer: impl Write,
    points_and_colors: Vec<(Point3<f64>, [u8; 3])>,
    cameras: Vec<ExportCamera>,
    camera_faces: bool,
) -> std::io::Result<()> {
    let mut builder = PlyBuilder::default();
    for camera in &cameras {
        builder.frustum(camera, camera_faces);
    }
    for (point, color) in points_and_colors {
        builder.vertex(point, color);
    }
    builder.write(writer, camera_faces)
}
