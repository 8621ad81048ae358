use crate::geometry::Triangle;
use crate::math::{Point3, Vec3};
use log::info;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use thiserror::Error;

/// Errors from the mesh adapters. These surface during scene setup and
/// abort startup; the render core never sees them.
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("ASCII STL is not supported, re-export the mesh as binary STL")]
    AsciiStl,
    #[error("malformed mesh data: {0}")]
    Malformed(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

// ─── Binary STL ─────────────────────────────────────────────────────────────

/// Loads a binary STL file as flat-shaded triangles.
///
/// Layout: an 80-byte header (ignored), a little-endian u32 triangle count,
/// then per triangle one f32 normal, three f32 vertex positions, and a u16
/// attribute (ignored). Files whose first five bytes read "solid" are the
/// ASCII variant and are rejected up front.
pub fn load_stl(path: &Path) -> Result<Vec<Triangle>, MeshError> {
    let mut reader = BufReader::new(File::open(path)?);
    read_stl(&mut reader)
}

pub fn read_stl<R: Read + Seek>(reader: &mut R) -> Result<Vec<Triangle>, MeshError> {
    let mut magic = [0u8; 5];
    reader.read_exact(&mut magic)?;
    if &magic == b"solid" {
        return Err(MeshError::AsciiStl);
    }

    reader.seek(SeekFrom::Start(80))?;
    let count = read_u32(reader)?;
    let mut triangles = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let header_normal = read_vec3(reader)?;
        let p0 = read_vec3(reader)?;
        let p1 = read_vec3(reader)?;
        let p2 = read_vec3(reader)?;
        let mut attribute = [0u8; 2];
        reader.read_exact(&mut attribute)?;

        // Some exporters zero the normal slot; fall back to the winding.
        let mut normal = header_normal;
        if normal.near_zero() {
            normal = (p1 - p0).cross(p2 - p0);
        }
        let normal = if normal.near_zero() {
            // Degenerate sliver; it will never raycast anyway.
            Vec3::unit_y()
        } else {
            normal.normalized()
        };
        triangles.push(Triangle::flat(p0, p1, p2, normal));
    }
    info!("loaded STL mesh: {count} triangles");
    Ok(triangles)
}

/// Writes triangles as binary STL with a zeroed header. The first vertex
/// normal is emitted as the face normal.
pub fn write_stl(path: &Path, triangles: &[Triangle]) -> Result<(), MeshError> {
    let mut writer = BufWriter::new(File::create(path)?);
    emit_stl(&mut writer, triangles)?;
    Ok(())
}

pub fn emit_stl<W: Write>(writer: &mut W, triangles: &[Triangle]) -> io::Result<()> {
    writer.write_all(&[0u8; 80])?;
    writer.write_all(&(triangles.len() as u32).to_le_bytes())?;
    for triangle in triangles {
        write_vec3(writer, triangle.n0)?;
        write_vec3(writer, triangle.p0)?;
        write_vec3(writer, triangle.p1)?;
        write_vec3(writer, triangle.p2)?;
        writer.write_all(&0u16.to_le_bytes())?;
    }
    writer.flush()
}

// ─── Vertex Normal Smoothing ────────────────────────────────────────────────

/// Squared distance under which two triangle corners count as the same
/// vertex when averaging normals.
pub const VERTEX_MERGE_TOLERANCE: f32 = 1e-6;

/// Replaces each vertex normal with the normalized mean of the face normals
/// of every triangle touching that vertex, turning a flat-shaded triangle
/// soup into a smooth-shaded mesh.
///
/// Corners are clustered on a uniform grid with neighbor lookup, so meshes
/// whose shared vertices drifted apart by float noise still merge.
pub fn merge_vertex_normals(triangles: &mut [Triangle]) {
    let cell_size = VERTEX_MERGE_TOLERANCE.sqrt();
    let cell = move |p: Point3| -> (i64, i64, i64) {
        (
            (p.x / cell_size).floor() as i64,
            (p.y / cell_size).floor() as i64,
            (p.z / cell_size).floor() as i64,
        )
    };

    // One entry per distinct vertex: representative position + normal sum.
    let mut clusters: Vec<(Point3, Vec3)> = Vec::new();
    let mut grid: HashMap<(i64, i64, i64), Vec<usize>> = HashMap::new();

    let find = |grid: &HashMap<(i64, i64, i64), Vec<usize>>,
                clusters: &[(Point3, Vec3)],
                p: Point3|
     -> Option<usize> {
        let (cx, cy, cz) = cell(p);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(ids) = grid.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    for &id in ids {
                        if (clusters[id].0 - p).length_squared() <= VERTEX_MERGE_TOLERANCE {
                            return Some(id);
                        }
                    }
                }
            }
        }
        None
    };

    for triangle in triangles.iter() {
        let face = triangle.face_normal();
        if face.near_zero() {
            continue;
        }
        let face = face.normalized();
        for p in [triangle.p0, triangle.p1, triangle.p2] {
            match find(&grid, &clusters, p) {
                Some(id) => clusters[id].1 += face,
                None => {
                    clusters.push((p, face));
                    grid.entry(cell(p)).or_default().push(clusters.len() - 1);
                }
            }
        }
    }

    for triangle in triangles.iter_mut() {
        let resolve = |p: Point3, current: Vec3| -> Vec3 {
            match find(&grid, &clusters, p) {
                Some(id) if !clusters[id].1.near_zero() => clusters[id].1.normalized(),
                _ => current,
            }
        };
        triangle.n0 = resolve(triangle.p0, triangle.n0);
        triangle.n1 = resolve(triangle.p1, triangle.n1);
        triangle.n2 = resolve(triangle.p2, triangle.n2);
    }
}

// ─── Marching-Cubes Frame Stream ────────────────────────────────────────────

/// One frame pulled out of a marching-cubes simulation dump.
pub struct MarchFrame {
    pub time: f32,
    pub triangles: Vec<Triangle>,
}

/// Reads the first frame with `time ≥ t_min` from a marching-cubes stream.
///
/// The stream is a sequence of frames, each `(f32 time, i32 nvert,
/// i32 ntri, f32[3·nvert] positions, f32[3·nvert] normals,
/// u32[3·ntri] indices)`; earlier frames are skipped by seeking past their
/// payload without decoding it.
pub fn load_march_frame(path: &Path, t_min: f32) -> Result<MarchFrame, MeshError> {
    let mut reader = BufReader::new(File::open(path)?);
    read_march_frame(&mut reader, t_min)
}

pub fn read_march_frame<R: Read + Seek>(
    reader: &mut R,
    t_min: f32,
) -> Result<MarchFrame, MeshError> {
    loop {
        let time = match read_f32(reader) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(MeshError::Malformed(format!(
                    "stream ended before any frame reached t = {t_min}"
                )));
            }
            Err(e) => return Err(e.into()),
        };
        let nvert = read_i32(reader)?;
        let ntri = read_i32(reader)?;
        if nvert < 0 || ntri < 0 {
            return Err(MeshError::Malformed(format!(
                "negative counts in frame header (nvert {nvert}, ntri {ntri})"
            )));
        }
        let (nvert, ntri) = (nvert as usize, ntri as usize);

        if time < t_min {
            let payload = 4 * (3 * nvert * 2 + 3 * ntri) as i64;
            reader.seek(SeekFrom::Current(payload))?;
            continue;
        }

        let positions = read_f32_slice(reader, 3 * nvert)?;
        let normals = read_f32_slice(reader, 3 * nvert)?;
        let indices = read_u32_slice(reader, 3 * ntri)?;

        let vertex = |i: usize| Point3::new(positions[3 * i], positions[3 * i + 1], positions[3 * i + 2]);
        let normal = |i: usize| Vec3::new(normals[3 * i], normals[3 * i + 1], normals[3 * i + 2]);

        let mut triangles = Vec::with_capacity(ntri);
        for tri in indices.chunks_exact(3) {
            let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            if i0 >= nvert || i1 >= nvert || i2 >= nvert {
                return Err(MeshError::Malformed(format!(
                    "triangle index out of range ({i0}, {i1}, {i2}) with {nvert} vertices"
                )));
            }
            triangles.push(Triangle::new(
                vertex(i0),
                vertex(i1),
                vertex(i2),
                normal(i0),
                normal(i1),
                normal(i2),
            ));
        }
        info!("loaded marching-cubes frame t = {time}: {ntri} triangles");
        return Ok(MarchFrame { time, triangles });
    }
}

// ─── Little-Endian Helpers ──────────────────────────────────────────────────

fn read_f32<R: Read>(reader: &mut R) -> io::Result<f32> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(f32::from_le_bytes(bytes))
}

fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

fn read_i32<R: Read>(reader: &mut R) -> io::Result<i32> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(i32::from_le_bytes(bytes))
}

fn read_vec3<R: Read>(reader: &mut R) -> io::Result<Vec3> {
    Ok(Vec3::new(read_f32(reader)?, read_f32(reader)?, read_f32(reader)?))
}

fn write_vec3<W: Write>(writer: &mut W, v: Vec3) -> io::Result<()> {
    writer.write_all(&v.x.to_le_bytes())?;
    writer.write_all(&v.y.to_le_bytes())?;
    writer.write_all(&v.z.to_le_bytes())
}

fn read_f32_slice<R: Read>(reader: &mut R, count: usize) -> io::Result<Vec<f32>> {
    let mut bytes = vec![0u8; count * 4];
    reader.read_exact(&mut bytes)?;
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

fn read_u32_slice<R: Read>(reader: &mut R, count: usize) -> io::Result<Vec<u32>> {
    let mut bytes = vec![0u8; count * 4];
    reader.read_exact(&mut bytes)?;
    Ok(bytes
        .chunks_exact(4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}
