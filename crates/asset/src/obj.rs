//! Wavefront OBJ loader: positions, normals, triangulated faces, and the
//! interleaved position+normal buffer the renderer uploads verbatim.

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};

use crate::mesh::{MeshData, MeshVertex};

/// Errors surfaced by [`ObjLoader::load`] and the data accessors.
#[derive(Debug, thiserror::Error)]
pub enum ObjError {
    #[error("failed to open OBJ file {path}: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read OBJ line {line}: {source}")]
    Read {
        line: usize,
        #[source]
        source: io::Error,
    },
    #[error("OBJ parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("OBJ index error on line {line}: {message}")]
    IndexRange { line: usize, message: String },
}

impl ObjError {
    fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    fn index(line: usize, message: impl Into<String>) -> Self {
        Self::IndexRange {
            line,
            message: message.into(),
        }
    }
}

/// One triangle after triangulation. Indices are 0-based and already
/// validated against the position/normal arrays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Face {
    vertices: [usize; 3],
    /// `None` when the face line carried no normal indices at all.
    normals: Option<[usize; 3]>,
    /// 1-based source line, kept for error reporting.
    line: usize,
}

/// Load-then-query OBJ mesh loader.
///
/// `load` parses exactly one file and fully replaces prior state; the
/// accessors are pure projections over that state and return empty data
/// until a load has succeeded.
#[derive(Debug, Default)]
pub struct ObjLoader {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    faces: Vec<Face>,
}

impl ObjLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an OBJ file from a filesystem path.
    ///
    /// On failure the loader is left empty, never half-populated.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), ObjError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ObjError::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_from_reader(BufReader::new(file))
    }

    /// Parse an OBJ document from any [`BufRead`] source.
    pub fn load_from_reader<R: BufRead>(&mut self, reader: R) -> Result<(), ObjError> {
        // Parse into temporaries so a failed load discards the old state
        // instead of exposing a partial mix of two files.
        self.positions.clear();
        self.normals.clear();
        self.faces.clear();

        let mut parsed = Parser::default();
        parsed.run(reader)?;

        self.positions = parsed.positions;
        self.normals = parsed.normals;
        self.faces = parsed.faces;
        log::debug!(
            "OBJ loaded: {} positions, {} normals, {} triangles",
            self.positions.len(),
            self.normals.len(),
            self.faces.len()
        );
        Ok(())
    }

    /// Convenience entry point for string literals (mainly tests).
    pub fn load_from_str(&mut self, contents: &str) -> Result<(), ObjError> {
        self.load_from_reader(io::Cursor::new(contents))
    }

    /// Number of triangles after quad splitting.
    pub fn triangle_count(&self) -> usize {
        self.faces.len()
    }

    /// Face-order-expanded positions, 3 floats per triangle corner.
    pub fn vertex_data(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.faces.len() * 9);
        for face in &self.faces {
            for &vi in &face.vertices {
                out.extend_from_slice(&self.positions[vi]);
            }
        }
        out
    }

    /// Face-order-expanded normals, 3 floats per triangle corner.
    /// Faces without normal indices contribute nothing.
    pub fn normal_data(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.faces.len() * 9);
        for face in &self.faces {
            if let Some(normals) = &face.normals {
                for &ni in normals {
                    out.extend_from_slice(&self.normals[ni]);
                }
            }
        }
        out
    }

    /// Interleaved position+normal buffer: 6 floats per corner, position
    /// first. This is the layout the mesh pipeline binds at stride 24 with
    /// attribute offsets 0 and 12.
    ///
    /// Errors if any stored face has no normal indices; emitting positions
    /// without their paired normals would silently corrupt the stride.
    pub fn interleaved_data(&self) -> Result<Vec<f32>, ObjError> {
        let mut out = Vec::with_capacity(self.faces.len() * 18);
        for face in &self.faces {
            let normals = face.normals.as_ref().ok_or_else(|| {
                ObjError::index(face.line, "face has vertex indices but no normal indices")
            })?;
            for (&vi, &ni) in face.vertices.iter().zip(normals) {
                out.extend_from_slice(&self.positions[vi]);
                out.extend_from_slice(&self.normals[ni]);
            }
        }
        Ok(out)
    }

    /// The interleaved expansion typed as [`MeshVertex`] records.
    pub fn mesh(&self) -> Result<MeshData, ObjError> {
        let mut vertices = Vec::with_capacity(self.faces.len() * 3);
        for face in &self.faces {
            let normals = face.normals.as_ref().ok_or_else(|| {
                ObjError::index(face.line, "face has vertex indices but no normal indices")
            })?;
            for (&vi, &ni) in face.vertices.iter().zip(normals) {
                vertices.push(MeshVertex::new(self.positions[vi], self.normals[ni]));
            }
        }
        Ok(MeshData::new(vertices))
    }
}

#[derive(Default)]
struct Parser {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    faces: Vec<Face>,
}

impl Parser {
    fn run<R: BufRead>(&mut self, reader: R) -> Result<(), ObjError> {
        for (idx, line) in reader.lines().enumerate() {
            let line_no = idx + 1;
            let line = line.map_err(|source| ObjError::Read {
                line: line_no,
                source,
            })?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let mut parts = trimmed.split_whitespace();
            // Non-empty after trim, so a first token always exists.
            let tag = parts.next().unwrap_or_default();
            match tag {
                "v" => {
                    let v = parse_vec3(&mut parts, line_no, "vertex position")?;
                    self.positions.push(v);
                }
                "vn" => {
                    let n = parse_vec3(&mut parts, line_no, "vertex normal")?;
                    self.normals.push(n);
                }
                "f" => self.parse_face(parts, line_no)?,
                // vt/g/o/s/usemtl/mtllib and anything else: skipped.
                _ => {}
            }
        }
        Ok(())
    }

    fn parse_face<'a>(
        &mut self,
        tokens: impl Iterator<Item = &'a str>,
        line_no: usize,
    ) -> Result<(), ObjError> {
        let mut vertex_indices: Vec<usize> = Vec::with_capacity(4);
        let mut normal_indices: Vec<usize> = Vec::with_capacity(4);

        for token in tokens {
            let (vi, ni) = self.parse_face_vertex(token, line_no)?;
            vertex_indices.push(vi);
            if let Some(ni) = ni {
                normal_indices.push(ni);
            }
        }

        // Normals are all-or-nothing per face; a partial set means the
        // vertex and normal streams would walk out of lockstep.
        if !normal_indices.is_empty() && normal_indices.len() != vertex_indices.len() {
            return Err(ObjError::index(
                line_no,
                format!(
                    "face has {} vertex indices but {} normal indices",
                    vertex_indices.len(),
                    normal_indices.len()
                ),
            ));
        }
        let has_normals = !normal_indices.is_empty();
        let normals_for = |a: usize, b: usize, c: usize| {
            has_normals.then(|| [normal_indices[a], normal_indices[b], normal_indices[c]])
        };

        match vertex_indices.len() {
            3 => self.faces.push(Face {
                vertices: [vertex_indices[0], vertex_indices[1], vertex_indices[2]],
                normals: normals_for(0, 1, 2),
                line: line_no,
            }),
            4 => {
                // Quad split (0,1,2) + (2,3,0), same pairing for normals.
                self.faces.push(Face {
                    vertices: [vertex_indices[0], vertex_indices[1], vertex_indices[2]],
                    normals: normals_for(0, 1, 2),
                    line: line_no,
                });
                self.faces.push(Face {
                    vertices: [vertex_indices[2], vertex_indices[3], vertex_indices[0]],
                    normals: normals_for(2, 3, 0),
                    line: line_no,
                });
            }
            n => {
                return Err(ObjError::parse(
                    line_no,
                    format!("unsupported face with {n} vertices (expected 3 or 4)"),
                ));
            }
        }
        Ok(())
    }

    /// Split a face token on `/`: field 1 = vertex index, field 3 (when
    /// present) = normal index. The texcoord field is ignored.
    fn parse_face_vertex(
        &self,
        token: &str,
        line_no: usize,
    ) -> Result<(usize, Option<usize>), ObjError> {
        let mut fields = token.split('/');
        let vertex_field = fields.next().unwrap_or_default();
        if vertex_field.is_empty() {
            return Err(ObjError::parse(
                line_no,
                format!("face element '{token}' has no vertex index"),
            ));
        }
        let vi = resolve_index(vertex_field, self.positions.len(), line_no, "vertex")?;

        let _texcoord = fields.next();
        let ni = match fields.next() {
            Some(field) if !field.is_empty() => {
                Some(resolve_index(field, self.normals.len(), line_no, "normal")?)
            }
            _ => None,
        };
        Ok((vi, ni))
    }
}

fn parse_vec3<'a>(
    parts: &mut impl Iterator<Item = &'a str>,
    line_no: usize,
    what: &str,
) -> Result<[f32; 3], ObjError> {
    let mut out = [0.0f32; 3];
    for (axis, slot) in ["x", "y", "z"].into_iter().zip(&mut out) {
        let token = parts
            .next()
            .ok_or_else(|| ObjError::parse(line_no, format!("missing {axis} field in {what}")))?;
        *slot = token
            .parse::<f32>()
            .map_err(|_| ObjError::parse(line_no, format!("invalid float '{token}' in {what}")))?;
    }
    // Extra fields (e.g. a w coordinate) are allowed and ignored.
    Ok(out)
}

/// Resolve a 1-based (or negative, relative-to-end) OBJ index against the
/// elements declared so far. Returns a 0-based array offset.
fn resolve_index(token: &str, len: usize, line_no: usize, what: &str) -> Result<usize, ObjError> {
    let raw = token
        .parse::<i64>()
        .map_err(|_| ObjError::parse(line_no, format!("invalid {what} index '{token}'")))?;
    if raw == 0 {
        return Err(ObjError::index(
            line_no,
            format!("{what} indices are 1-based; found 0"),
        ));
    }
    let idx = if raw > 0 { raw - 1 } else { len as i64 + raw };
    if idx < 0 || idx as usize >= len {
        return Err(ObjError::index(
            line_no,
            format!("{what} index {raw} out of bounds (declared so far: {len})"),
        ));
    }
    Ok(idx as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRI_WITH_NORMALS: &str = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
vn 0.0 0.0 1.0
f 1//1 2//1 3//1
";

    fn loaded(src: &str) -> ObjLoader {
        let mut loader = ObjLoader::new();
        loader.load_from_str(src).expect("parse OBJ");
        loader
    }

    #[test]
    fn triangle_round_trip_without_normals() {
        let loader = loaded("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");
        assert_eq!(
            loader.vertex_data(),
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
        );
        assert!(loader.normal_data().is_empty());
    }

    #[test]
    fn one_based_index_resolves_to_offset_zero() {
        let loader = loaded("v 7.0 8.0 9.0\nv 0 0 0\nv 0 0 0\nf 1 2 3\n");
        // Index 1 must name the first declared vertex, never the second.
        assert_eq!(&loader.vertex_data()[..3], &[7.0, 8.0, 9.0]);
    }

    #[test]
    fn interleaved_layout_is_position_then_normal() {
        let loader = loaded(TRI_WITH_NORMALS);
        let data = loader.interleaved_data().expect("interleave");
        assert_eq!(data.len(), 6 * 3);
        assert_eq!(&data[0..6], &[0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(&data[6..12], &[1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn interleaved_length_for_triangle_only_input() {
        let src = "\
v 0 0 0
v 1 0 0
v 0 1 0
v 1 1 0
vn 0 0 1
f 1//1 2//1 3//1
f 2//1 4//1 3//1
f 1//1 4//1 2//1
";
        let loader = loaded(src);
        assert_eq!(loader.interleaved_data().unwrap().len(), 6 * 3 * 3);
    }

    #[test]
    fn quad_splits_into_two_triangles() {
        let src = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vn 0 0 1
vn 0 0 1
vn 0 0 1
vn 0 0 1
f 1//1 2//2 3//3 4//4
";
        let loader = loaded(src);
        assert_eq!(loader.triangle_count(), 2);
        assert_eq!(loader.faces[0].vertices, [0, 1, 2]);
        assert_eq!(loader.faces[1].vertices, [2, 3, 0]);
        // Normal indices follow the same (0,1,2)/(2,3,0) pairing.
        assert_eq!(loader.faces[0].normals, Some([0, 1, 2]));
        assert_eq!(loader.faces[1].normals, Some([2, 3, 0]));
    }

    #[test]
    fn accessors_are_idempotent() {
        let loader = loaded(TRI_WITH_NORMALS);
        let first = loader.interleaved_data().unwrap();
        let second = loader.interleaved_data().unwrap();
        assert_eq!(first, second);
        assert_eq!(loader.vertex_data(), loader.vertex_data());
    }

    #[test]
    fn reload_discards_previous_file() {
        let mut loader = ObjLoader::new();
        loader.load_from_str(TRI_WITH_NORMALS).unwrap();
        loader
            .load_from_str("v 5 5 5\nv 6 6 6\nv 7 7 7\nf 1 2 3\n")
            .unwrap();
        assert_eq!(loader.triangle_count(), 1);
        assert_eq!(
            loader.vertex_data(),
            vec![5.0, 5.0, 5.0, 6.0, 6.0, 6.0, 7.0, 7.0, 7.0]
        );
        assert!(loader.normal_data().is_empty());
    }

    #[test]
    fn failed_reload_leaves_loader_empty() {
        let mut loader = ObjLoader::new();
        loader.load_from_str(TRI_WITH_NORMALS).unwrap();
        let err = loader.load_from_str("v 0 0 0\nf 1 oops 1\n");
        assert!(matches!(err, Err(ObjError::Parse { .. })));
        assert!(loader.vertex_data().is_empty());
        assert_eq!(loader.triangle_count(), 0);
    }

    #[test]
    fn empty_before_load() {
        let loader = ObjLoader::new();
        assert!(loader.vertex_data().is_empty());
        assert!(loader.normal_data().is_empty());
        assert!(loader.interleaved_data().unwrap().is_empty());
    }

    #[test]
    fn two_vertex_face_is_rejected() {
        let mut loader = ObjLoader::new();
        let err = loader.load_from_str("v 0 0 0\nv 1 0 0\nf 1 2\n");
        assert!(matches!(err, Err(ObjError::Parse { line: 3, .. })));
    }

    #[test]
    fn five_vertex_face_is_rejected() {
        let mut loader = ObjLoader::new();
        let src = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nv 2 2 0\nf 1 2 3 4 5\n";
        assert!(matches!(
            loader.load_from_str(src),
            Err(ObjError::Parse { .. })
        ));
    }

    #[test]
    fn malformed_float_is_a_parse_error() {
        let mut loader = ObjLoader::new();
        assert!(matches!(
            loader.load_from_str("v 0.0 nope 0.0\n"),
            Err(ObjError::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn index_zero_is_rejected() {
        let mut loader = ObjLoader::new();
        let err = loader.load_from_str("v 0 0 0\nf 0 1 1\n");
        assert!(matches!(err, Err(ObjError::IndexRange { line: 2, .. })));
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut loader = ObjLoader::new();
        let err = loader.load_from_str("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 4\n");
        assert!(matches!(err, Err(ObjError::IndexRange { line: 4, .. })));
    }

    #[test]
    fn negative_indices_resolve_from_the_end() {
        let loader = loaded("v 1 0 0\nv 2 0 0\nv 3 0 0\nf -3 -2 -1\n");
        assert_eq!(
            loader.vertex_data(),
            vec![1.0, 0.0, 0.0, 2.0, 0.0, 0.0, 3.0, 0.0, 0.0]
        );
    }

    #[test]
    fn partial_normals_on_a_face_are_rejected() {
        let mut loader = ObjLoader::new();
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2 3\n";
        assert!(matches!(
            loader.load_from_str(src),
            Err(ObjError::IndexRange { line: 5, .. })
        ));
    }

    #[test]
    fn interleave_without_normals_fails_loudly() {
        let loader = loaded("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");
        assert!(matches!(
            loader.interleaved_data(),
            Err(ObjError::IndexRange { .. })
        ));
        assert!(matches!(loader.mesh(), Err(ObjError::IndexRange { .. })));
    }

    #[test]
    fn comments_texcoords_and_groups_are_skipped() {
        let src = "\
# a comment
g lesson
usemtl none
v 0 0 0
vt 0.5 0.5
v 1 0 0
v 0 1 0
vn 0 0 1
f 1/1/1 2/1/1 3/1/1
";
        let loader = loaded(src);
        assert_eq!(loader.triangle_count(), 1);
        assert_eq!(loader.interleaved_data().unwrap().len(), 18);
    }

    #[test]
    fn extra_vertex_fields_are_ignored() {
        let loader = loaded("v 1 2 3 1.0\nv 0 0 0\nv 0 0 0\nf 1 2 3\n");
        assert_eq!(&loader.vertex_data()[..3], &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn missing_file_is_a_file_access_error() {
        let mut loader = ObjLoader::new();
        let err = loader.load("definitely/not/here.obj");
        assert!(matches!(err, Err(ObjError::FileAccess { .. })));
    }

    #[test]
    fn mesh_matches_interleaved_expansion() {
        let loader = loaded(TRI_WITH_NORMALS);
        let mesh = loader.mesh().expect("mesh");
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.vertices[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(mesh.vertices[1].normal, [0.0, 0.0, 1.0]);
    }
}
