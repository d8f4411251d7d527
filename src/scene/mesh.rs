//! Mesh ingestion into [`Object`]s.
//!
//! Text format, one record per line, `#` starts a comment:
//!
//! ```text
//! name vertex_count polygon_count
//! x y z                              (vertex_count lines)
//! descriptor vertex_count v0 v1 v2 [v3]  (polygon_count lines)
//! ```
//!
//! The descriptor is decimal or `0x` hex. Its low 24 bits are the RGB base
//! color, bit 24 marks the polygon two-sided and bits 25-26 select the shade
//! mode (0 constant, 1 flat, 2 Gouraud).

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use obj::{load_obj, Obj, Position};

use super::object::{default_polygon, Object, Polygon, ShadeMode};
use crate::color::Color;
use crate::error::RenderError;
use crate::math::Vec3;

const TWO_SIDED_BIT: u32 = 1 << 24;
const SHADE_SHIFT: u32 = 25;
const SHADE_MASK: u32 = 0b11;

fn parse_error(line: usize, message: impl Into<String>) -> RenderError {
    return RenderError::MeshParse { line, message: message.into() };
}

/// Parses a polygon descriptor written as decimal or `0x`-prefixed hex.
pub fn parse_descriptor(field: &str) -> Option<u32> {
    if let Some(hex) = field.strip_prefix("0x").or_else(|| field.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16).ok();
    }
    return field.parse().ok();
}

fn polygon_from_descriptor(descriptor: u32, indices: &[usize]) -> Result<Polygon, RenderError> {
    let shading = match (descriptor >> SHADE_SHIFT) & SHADE_MASK {
        0 => ShadeMode::Constant,
        1 => ShadeMode::Flat,
        _ => ShadeMode::Gouraud,
    };
    return Ok(Polygon::new(indices, Color::from_packed(descriptor))?
        .with_shading(shading)
        .with_two_sided(descriptor & TWO_SIDED_BIT != 0));
}

/// Parses the text mesh format, scaling every vertex uniformly.
///
/// The object gets one spare polygon slot per two-sided polygon so it can
/// be mirrored later.
pub fn parse_mesh(text: &str, scale: f32) -> Result<Object, RenderError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.split('#').next().unwrap_or("").trim()))
        .filter(|(_, l)| !l.is_empty());

    let (header_line, header) = lines.next().ok_or_else(|| parse_error(0, "missing header"))?;
    let fields: Vec<&str> = header.split_whitespace().collect();
    if fields.len() != 3 {
        return Err(parse_error(header_line, "header needs name, vertex count and polygon count"));
    }
    let vertex_count: usize = fields[1]
        .parse()
        .map_err(|_| parse_error(header_line, format!("bad vertex count '{}'", fields[1])))?;
    let polygon_count: usize = fields[2]
        .parse()
        .map_err(|_| parse_error(header_line, format!("bad polygon count '{}'", fields[2])))?;

    // Counts come from the file, so nothing is sized from them up front.
    let mut last_line = header_line;
    let mut vertices = Vec::new();
    for _ in 0..vertex_count {
        let (line, record) = lines
            .next()
            .ok_or_else(|| parse_error(last_line, "unexpected end of vertex list"))?;
        last_line = line;
        let coords: Vec<f32> = record
            .split_whitespace()
            .map(|f| f.parse::<f32>())
            .collect::<Result<_, _>>()
            .map_err(|_| parse_error(line, format!("bad vertex '{record}'")))?;
        if coords.len() != 3 {
            return Err(parse_error(line, format!("vertex needs 3 coordinates, got {}", coords.len())));
        }
        vertices.push(Vec3::new(coords[0], coords[1], coords[2]) * scale);
    }

    let mut polygons = Vec::new();
    for _ in 0..polygon_count {
        let (line, record) = lines
            .next()
            .ok_or_else(|| parse_error(last_line, "unexpected end of polygon list"))?;
        last_line = line;
        let fields: Vec<&str> = record.split_whitespace().collect();
        if fields.len() < 2 {
            return Err(parse_error(line, "polygon needs a descriptor and a vertex count"));
        }
        let descriptor = parse_descriptor(fields[0])
            .ok_or_else(|| parse_error(line, format!("bad descriptor '{}'", fields[0])))?;
        let count: usize = fields[1]
            .parse()
            .map_err(|_| parse_error(line, format!("bad vertex count '{}'", fields[1])))?;
        let given = fields.len() - 2;
        if given != count {
            return Err(parse_error(line, format!("expected {count} vertex indices, got {given}")));
        }
        let indices: Vec<usize> = fields[2..]
            .iter()
            .map(|f| f.parse::<usize>())
            .collect::<Result<_, _>>()
            .map_err(|_| parse_error(line, format!("bad vertex index in '{record}'")))?;
        let polygon = polygon_from_descriptor(descriptor, &indices)
            .map_err(|e| parse_error(line, e.to_string()))?;
        polygons.push(polygon);
    }

    let spare = polygons.iter().filter(|p| p.two_sided).count();
    let mut object = Object::new(fields_name(header), vertices.len(), polygons.len() + spare);
    for v in vertices {
        object.add_vertex(v)?;
    }
    for polygon in polygons {
        object.add_polygon(polygon)?;
    }
    object.compute_bounding_radius();

    log::info!(
        "parsed mesh '{}': {} vertices, {} polygons, radius {:.3}",
        object.name,
        object.local.len(),
        object.polygons.len(),
        object.bounding_radius
    );
    return Ok(object);
}

fn fields_name(header: &str) -> &str {
    return header.split_whitespace().next().unwrap_or("mesh");
}

/// Loads a `.mesh` text file, or a Wavefront `.obj` by extension.
pub fn load_mesh(path: &Path, scale: f32) -> Result<Object, RenderError> {
    let file = File::open(path).map_err(|source| RenderError::Io { path: path.to_path_buf(), source })?;
    let mut reader = BufReader::new(file);

    let is_obj = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("obj"))
        .unwrap_or(false);
    if is_obj {
        let model: Obj<Position, u32> = load_obj(reader)?;
        let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("obj");
        return object_from_obj(name, &model, scale);
    }

    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|source| RenderError::Io { path: path.to_path_buf(), source })?;
    return parse_mesh(&text, scale);
}

/// Converts an OBJ model into a white flat-shaded object.
///
/// OBJ is right-handed with counterclockwise front faces. Negating z moves
/// the geometry into left-handed space, and reversing each triangle keeps
/// front faces clockwise.
pub fn object_from_obj(name: &str, model: &Obj<Position, u32>, scale: f32) -> Result<Object, RenderError> {
    let triangle_count = model.indices.len() / 3;
    let mut object = Object::new(name, model.vertices.len(), triangle_count);
    for vertex in &model.vertices {
        let [x, y, z] = vertex.position;
        object.add_vertex(Vec3::new(x, y, -z) * scale)?;
    }
    for triangle in model.indices.chunks_exact(3) {
        let indices = [triangle[0] as usize, triangle[2] as usize, triangle[1] as usize];
        object.add_polygon(default_polygon(&indices)?)?;
    }
    object.compute_bounding_radius();

    log::info!("Number of vertices - {}", object.local.len());
    log::info!("Number of polygons - {}", object.polygons.len());
    return Ok(object);
}
