use anyhow::{bail, Context, Result};
use std::path::Path;

/// A vertex that can be read from a `[points]` line of a mesh file.
pub trait MeshVertex: bytemuck::Pod {
    /// Number of floats expected on each `[points]` line.
    const COMPONENTS: usize;

    fn from_components(components: &[f32]) -> Self;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Points,
    Indices,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh<V> {
    pub vertices: Vec<V>,
    pub indices: Vec<u16>,
}

impl<V: MeshVertex> Mesh<V> {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read mesh file: {}", path.display()))?;
        Self::parse(&source).with_context(|| format!("Failed to parse mesh file: {}", path.display()))
    }

    /// Parses the `[points]` / `[indices]` text format.
    pub fn parse(source: &str) -> Result<Self> {
        let mut vertices = Vec::new();
        let mut triangles = Vec::new();
        let mut section = None;

        for (number, line) in source.lines().enumerate() {
            let number = number + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') {
                section = match line {
                    "[points]" => Some(Section::Points),
                    "[indices]" => Some(Section::Indices),
                    _ => bail!("line {number}: unknown section header '{line}'"),
                };
                continue;
            }

            match section {
                Some(Section::Points) => vertices.push(Self::parse_point(number, line)?),
                Some(Section::Indices) => {
                    triangles.push((number, Self::parse_triangle(number, line)?))
                }
                None => bail!("line {number}: data outside of a section"),
            }
        }

        // Indices may precede the points they refer to
        let mut indices = Vec::with_capacity(triangles.len() * 3);
        for (number, triangle) in triangles {
            if let Some(index) = triangle
                .iter()
                .find(|index| usize::from(**index) >= vertices.len())
            {
                bail!(
                    "line {number}: index {index} is out of range for {} vertices",
                    vertices.len()
                );
            }
            indices.extend(triangle);
        }

        Ok(Self { vertices, indices })
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    fn parse_point(number: usize, line: &str) -> Result<V> {
        let components = line
            .split_whitespace()
            .map(|value| {
                value
                    .parse::<f32>()
                    .with_context(|| format!("line {number}: invalid float '{value}'"))
            })
            .collect::<Result<Vec<_>>>()?;

        if components.len() != V::COMPONENTS {
            bail!(
                "line {number}: expected {} components per point, found {}",
                V::COMPONENTS,
                components.len()
            );
        }

        Ok(V::from_components(&components))
    }

    fn parse_triangle(number: usize, line: &str) -> Result<[u16; 3]> {
        let values = line
            .split_whitespace()
            .map(|value| {
                value
                    .parse::<u16>()
                    .with_context(|| format!("line {number}: invalid index '{value}'"))
            })
            .collect::<Result<Vec<_>>>()?;

        match values.as_slice() {
            [a, b, c] => Ok([*a, *b, *c]),
            _ => bail!(
                "line {number}: expected 3 indices per triangle, found {}",
                values.len()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(C)]
    #[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
    struct ColoredPoint {
        position: [f32; 2],
        color: [f32; 3],
    }

    impl MeshVertex for ColoredPoint {
        const COMPONENTS: usize = 5;

        fn from_components(components: &[f32]) -> Self {
            Self {
                position: [components[0], components[1]],
                color: [components[2], components[3], components[4]],
            }
        }
    }

    const TRIANGLE: &str = "
# x y r g b
[points]
-0.5 -0.5   1.0 0.0 0.0
+0.5 -0.5   0.0 1.0 0.0
+0.0 +0.5   0.0 0.0 1.0

[indices]
0 1 2
";

    #[test]
    fn test_parse_counts() {
        let mesh = Mesh::<ColoredPoint>::parse(TRIANGLE).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.index_count(), 3);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(
            mesh.vertices[1],
            ColoredPoint {
                position: [0.5, -0.5],
                color: [0.0, 1.0, 0.0],
            }
        );
    }

    #[test]
    fn test_parse_windows_line_endings() {
        let source = TRIANGLE.replace('\n', "\r\n");
        let mesh = Mesh::<ColoredPoint>::parse(&source).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.index_count(), 3);
    }

    #[test]
    fn test_parse_empty_source() {
        let mesh = Mesh::<ColoredPoint>::parse("# nothing here\n\n").unwrap();
        assert_eq!(mesh.vertex_count(), 0);
        assert_eq!(mesh.index_count(), 0);
    }

    #[test]
    fn test_wrong_component_count() {
        let source = "[points]\n0.0 0.0 1.0\n";
        let error = Mesh::<ColoredPoint>::parse(source).unwrap_err();
        assert!(error.to_string().contains("line 2"));
    }

    #[test]
    fn test_invalid_float() {
        let source = "[points]\n0.0 zero 1.0 1.0 1.0\n";
        assert!(Mesh::<ColoredPoint>::parse(source).is_err());
    }

    #[test]
    fn test_incomplete_triangle() {
        let source = "[points]\n0 0 1 1 1\n1 0 1 1 1\n0 1 1 1 1\n[indices]\n0 1\n";
        let error = Mesh::<ColoredPoint>::parse(source).unwrap_err();
        assert!(error.to_string().contains("expected 3 indices"));
    }

    #[test]
    fn test_index_out_of_range() {
        let source = "[points]\n0 0 1 1 1\n[indices]\n0 0 1\n";
        let error = Mesh::<ColoredPoint>::parse(source).unwrap_err();
        assert!(error.to_string().contains("out of range"));
        assert!(error.to_string().contains("line 4"));
    }

    #[test]
    fn test_index_out_of_range_reports_its_line() {
        let source = "[points]\n0 0 1 1 1\n0 1 1 1 1\n1 0 1 1 1\n[indices]\n0 1 2\n0 1 7\n";
        let error = Mesh::<ColoredPoint>::parse(source).unwrap_err();
        assert_eq!(
            error.to_string(),
            "line 7: index 7 is out of range for 3 vertices"
        );
    }

    #[test]
    fn test_indices_before_points() {
        let source = "[indices]\n0 1 2\n[points]\n0 0 1 1 1\n0 1 1 1 1\n1 0 1 1 1\n";
        let mesh = Mesh::<ColoredPoint>::parse(source).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.vertex_count(), 3);
    }

    #[test]
    fn test_data_outside_section() {
        let source = "0 0 1 1 1\n[points]\n";
        let error = Mesh::<ColoredPoint>::parse(source).unwrap_err();
        assert!(error.to_string().contains("outside of a section"));
    }

    #[test]
    fn test_unknown_section() {
        let source = "[normals]\n0 0 1\n";
        assert!(Mesh::<ColoredPoint>::parse(source).is_err());
    }

    #[test]
    fn test_missing_file() {
        let error = Mesh::<ColoredPoint>::from_file("does/not/exist.txt").unwrap_err();
        assert!(error.to_string().contains("exist.txt"));
    }
}
