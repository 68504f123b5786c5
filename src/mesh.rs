//! Section profile and extruded solid of an optimised unit.
//!
//! The profile lies in the x–y plane with the toe at the origin, x running along the
//! base towards the heel and y running up the upstand. The solid is the profile swept
//! along z for the unit length.

use std::fmt::Display;
use std::io::{self, Write};

use nalgebra::{Point2, Point3, Vector3};

use crate::errors::GeometryError;
use crate::geometry::DesignVariables;

/// Closed outline of the unit cross-section, counter-clockwise, without a repeated
/// closing vertex.
#[derive(Clone, Debug, PartialEq)]
pub struct Profile {
    /// Outline vertices in metres.
    vertices: Vec<Point2<f64>>,
}

impl Profile {
    /// Build the outline for `variables` with an inner chamfer of leg length `chamfer`.
    ///
    /// A zero chamfer produces a plain six-vertex L.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] when a dimension is not positive, when the upstand
    /// covers the whole base or when the chamfer does not fit.
    ///
    /// # Examples
    /// ```
    /// use lunitx::{DesignVariables, Profile};
    ///
    /// let section = DesignVariables::new(2.0, 0.3, 1.7, 0.3, 0.05, 2.0);
    /// let profile = Profile::new(&section, 0.15).expect("chamfer fits");
    /// assert_eq!(profile.vertices().len(), 7);
    /// ```
    pub fn new(variables: &DesignVariables, chamfer: f64) -> Result<Self, GeometryError> {
        for (dimension, value) in [
            ("base width", variables.bw),
            ("base thickness", variables.bt),
            ("upstand height", variables.uh),
            ("upstand thickness", variables.ut),
            ("length", variables.l),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(GeometryError::InvalidDimension { dimension, value });
            }
        }
        if !(chamfer.is_finite() && chamfer >= 0.0) {
            return Err(GeometryError::InvalidDimension {
                dimension: "chamfer",
                value: chamfer,
            });
        }
        if variables.heel_width() <= 0.0 {
            return Err(GeometryError::NoHeel {
                base_width: variables.bw,
                upstand_thickness: variables.ut,
            });
        }
        let limit = variables.heel_width().min(variables.uh);
        if chamfer >= limit {
            return Err(GeometryError::ChamferTooLarge { chamfer, limit });
        }

        let DesignVariables { bw, bt, uh, ut, .. } = *variables;
        let mut vertices = vec![
            Point2::new(0.0, 0.0),
            Point2::new(bw, 0.0),
            Point2::new(bw, bt),
        ];
        if chamfer > 0.0 {
            vertices.push(Point2::new(ut + chamfer, bt));
            vertices.push(Point2::new(ut, bt + chamfer));
        } else {
            vertices.push(Point2::new(ut, bt));
        }
        vertices.push(Point2::new(ut, bt + uh));
        vertices.push(Point2::new(0.0, bt + uh));
        Ok(Self { vertices })
    }

    /// Outline vertices in order.
    #[must_use]
    pub fn vertices(&self) -> &[Point2<f64>] {
        &self.vertices
    }

    /// Enclosed area in square metres (shoelace formula).
    #[must_use]
    pub fn area(&self) -> f64 {
        let n = self.vertices.len();
        let twice: f64 = (0..n)
            .map(|i| {
                let a = self.vertices[i];
                let b = self.vertices[(i + 1) % n];
                a.x * b.y - b.x * a.y
            })
            .sum();
        0.5 * twice
    }

    /// Write the outline as a closed `LWPOLYLINE` in a minimal ASCII DXF document.
    ///
    /// Coordinates are in metres on layer `layer`.
    ///
    /// # Errors
    ///
    /// Propagates any error raised by `writer`.
    pub fn write_dxf<W: Write>(&self, layer: &str, writer: &mut W) -> io::Result<()> {
        for (code, value) in [
            ("0", "SECTION"),
            ("2", "HEADER"),
            ("9", "$ACADVER"),
            ("1", "AC1015"),
            ("9", "$INSUNITS"),
            ("70", "6"),
            ("0", "ENDSEC"),
            ("0", "SECTION"),
            ("2", "ENTITIES"),
            ("0", "LWPOLYLINE"),
            ("100", "AcDbEntity"),
            ("8", layer),
            ("100", "AcDbPolyline"),
        ] {
            write_group(writer, code, value)?;
        }
        write_group(writer, "90", self.vertices.len())?;
        // Flag 1 closes the polyline back to its first vertex.
        write_group(writer, "70", 1)?;
        for vertex in &self.vertices {
            write_group(writer, "10", vertex.x)?;
            write_group(writer, "20", vertex.y)?;
        }
        write_group(writer, "0", "ENDSEC")?;
        write_group(writer, "0", "EOF")
    }
}

/// One DXF group: the code line followed by the value line.
fn write_group<W: Write>(writer: &mut W, code: &str, value: impl Display) -> io::Result<()> {
    writeln!(writer, "{code:>3}")?;
    writeln!(writer, "{value}")
}

/// Closed polyhedron obtained by extruding a [`Profile`].
#[derive(Clone, Debug, PartialEq)]
pub struct Solid {
    /// Front face vertices (z = 0) followed by back face vertices (z = length).
    vertices: Vec<Point3<f64>>,
    /// Polygonal faces as vertex indices, wound so normals point outwards.
    ///
    /// Each face starts at a vertex that sees the whole face; the caps start at the
    /// toe, from which every corner of the L is visible.
    faces: Vec<Vec<usize>>,
}

impl Solid {
    /// Sweep `profile` along z for `length` metres.
    #[must_use]
    pub fn extrude(profile: &Profile, length: f64) -> Self {
        let n = profile.vertices().len();
        let vertices: Vec<Point3<f64>> = profile
            .vertices()
            .iter()
            .map(|p| Point3::new(p.x, p.y, 0.0))
            .chain(profile.vertices().iter().map(|p| Point3::new(p.x, p.y, length)))
            .collect();

        let mut faces: Vec<Vec<usize>> = Vec::with_capacity(n + 2);
        faces.push(std::iter::once(0).chain((1..n).rev()).collect());
        faces.push((n..2 * n).collect());
        for i in 0..n {
            let j = (i + 1) % n;
            faces.push(vec![i, j, n + j, n + i]);
        }

        Self { vertices, faces }
    }

    /// Profile the design with `chamfer` and extrude it over the unit length.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] when the profile cannot be built.
    pub fn from_design(variables: &DesignVariables, chamfer: f64) -> Result<Self, GeometryError> {
        let profile = Profile::new(variables, chamfer)?;
        Ok(Self::extrude(&profile, variables.l))
    }

    /// Vertex positions in metres.
    #[must_use]
    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    /// Polygonal faces as indices into [`Solid::vertices`].
    #[must_use]
    pub fn faces(&self) -> &[Vec<usize>] {
        &self.faces
    }

    /// Faces split into triangles, each fanned from its first vertex.
    #[must_use]
    pub fn triangles(&self) -> Vec<[usize; 3]> {
        self.faces
            .iter()
            .flat_map(|face| (1..face.len() - 1).map(move |k| [face[0], face[k], face[k + 1]]))
            .collect()
    }

    /// Enclosed volume in cubic metres, summed over the triangulated boundary.
    #[must_use]
    pub fn volume(&self) -> f64 {
        self.triangles()
            .into_iter()
            .map(|[a, b, c]| {
                let a = self.vertices[a].coords;
                let b = self.vertices[b].coords;
                let c = self.vertices[c].coords;
                a.dot(&b.cross(&c))
            })
            .sum::<f64>()
            / 6.0
    }

    /// Write the solid as an ASCII STL document named `name`.
    ///
    /// # Errors
    ///
    /// Propagates any error raised by `writer`.
    pub fn write_stl<W: Write>(&self, name: &str, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "solid {name}")?;
        for [a, b, c] in self.triangles() {
            let (a, b, c) = (self.vertices[a], self.vertices[b], self.vertices[c]);
            let normal = facet_normal(&a, &b, &c);
            writeln!(
                writer,
                "  facet normal {:e} {:e} {:e}",
                normal.x, normal.y, normal.z
            )?;
            writeln!(writer, "    outer loop")?;
            for vertex in [a, b, c] {
                writeln!(
                    writer,
                    "      vertex {:e} {:e} {:e}",
                    vertex.x, vertex.y, vertex.z
                )?;
            }
            writeln!(writer, "    endloop")?;
            writeln!(writer, "  endfacet")?;
        }
        writeln!(writer, "endsolid {name}")
    }
}

/// Unit normal of a triangle, zero for a degenerate one.
fn facet_normal(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Vector3<f64> {
    (b - a)
        .cross(&(c - a))
        .try_normalize(f64::EPSILON)
        .unwrap_or_else(Vector3::zeros)
}
