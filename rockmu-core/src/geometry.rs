//! Active-volume geometry: local-frame points and entry-face classification.

use std::fmt;
use std::ops::{Add, Sub};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A point in 3D space.
///
/// Used both for raw detector-frame positions (mm) and for positions in the
/// active volume's local frame (cm); [`FrameTransform`] converts between them.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point3 {
    /// X coordinate (horizontal, transverse to the beam).
    pub x: f64,
    /// Y coordinate (vertical).
    pub y: f64,
    /// Z coordinate (along the beam).
    pub z: f64,
}

impl Point3 {
    /// Creates a new point.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Multiplies every component by `factor`.
    #[inline]
    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }
}

impl Add for Point3 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point3 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// Conversion from the raw detector frame (mm) into the active volume's
/// local frame (cm).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FrameTransform {
    /// Position of the active volume's local origin, in local units (cm).
    pub offset: Point3,
    /// Raw units per local unit (10 mm per cm).
    pub units_per_cm: f64,
}

impl Default for FrameTransform {
    fn default() -> Self {
        Self {
            // Origin at the center of the upstream face of the LAr active volume.
            offset: Point3::new(0.0, 5.0, 410.0),
            units_per_cm: 10.0,
        }
    }
}

impl FrameTransform {
    /// Creates a transform with the given offset and the default mm→cm scale.
    #[must_use]
    pub fn with_offset(offset: Point3) -> Self {
        Self {
            offset,
            ..Self::default()
        }
    }

    /// Converts a raw-frame point into the local frame.
    #[inline]
    #[must_use]
    pub fn to_local(&self, raw: Point3) -> Point3 {
        let s = self.units_per_cm;
        Point3::new(raw.x / s, raw.y / s, raw.z / s) - self.offset
    }

    /// Converts a local-frame point back into the raw frame.
    #[inline]
    #[must_use]
    pub fn to_raw(&self, local: Point3) -> Point3 {
        (local + self.offset).scaled(self.units_per_cm)
    }
}

/// Face of the active volume a muon entered through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Face {
    /// Upstream face (z = 0).
    Front,
    /// Either of the two lateral faces (x = ±half width).
    Side,
    /// Top face (y = +half height).
    Top,
    /// Bottom face (y = -half height).
    Bottom,
}

impl Face {
    /// All faces in tie-breaking precedence order.
    pub const ALL: [Face; 4] = [Face::Front, Face::Side, Face::Top, Face::Bottom];

    /// Position of this face in [`Face::ALL`].
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Face::Front => 0,
            Face::Side => 1,
            Face::Top => 2,
            Face::Bottom => 3,
        }
    }

    /// Lowercase label used in accumulator names.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Face::Front => "front",
            Face::Side => "side",
            Face::Top => "top",
            Face::Bottom => "bottom",
        }
    }
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Boundary planes of the active volume in the local frame (cm).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DetectorBoundary {
    /// Z of the upstream (front) face.
    pub front_z: f64,
    /// Distance from the center to either side face.
    pub half_width: f64,
    /// Distance from the center to the top/bottom faces.
    pub half_height: f64,
    /// Threshold policy: minimum entry z for a top/side classification.
    pub threshold_z: f64,
    /// Threshold policy: |y| cut separating top from side entries.
    pub threshold_y: f64,
}

impl Default for DetectorBoundary {
    fn default() -> Self {
        Self {
            front_z: 0.0,
            half_width: 357.0,
            half_height: 150.0,
            threshold_z: 10.0,
            threshold_y: 140.0,
        }
    }
}

/// Rule used to assign an entry face to a muon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ClassificationPolicy {
    /// Nearest boundary plane wins; ties go to front, side, top, bottom in
    /// that order. Every point is classified.
    #[default]
    NearestFace,
    /// Ordered cuts on (z, y): top, then side. Front and bottom are never
    /// assigned and points failing both cuts stay unclassified.
    Threshold,
}

/// Entry-face classifier for a fixed boundary and policy.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FaceClassifier {
    boundary: DetectorBoundary,
    policy: ClassificationPolicy,
}

impl FaceClassifier {
    /// Creates a classifier.
    #[must_use]
    pub fn new(boundary: DetectorBoundary, policy: ClassificationPolicy) -> Self {
        Self { boundary, policy }
    }

    /// Returns the active policy.
    #[must_use]
    pub fn policy(&self) -> ClassificationPolicy {
        self.policy
    }

    /// Returns the boundary planes.
    #[must_use]
    pub fn boundary(&self) -> &DetectorBoundary {
        &self.boundary
    }

    /// Distances from `p` to each face, indexed like [`Face::ALL`].
    #[must_use]
    pub fn face_distances(&self, p: Point3) -> [f64; 4] {
        let b = &self.boundary;
        [
            (p.z - b.front_z).abs(),
            (p.x + b.half_width).abs().min((p.x - b.half_width).abs()),
            (p.y - b.half_height).abs(),
            (p.y + b.half_height).abs(),
        ]
    }

    /// Classifies a local-frame point.
    ///
    /// Always `Some` under [`ClassificationPolicy::NearestFace`].
    #[must_use]
    pub fn classify(&self, p: Point3) -> Option<Face> {
        match self.policy {
            ClassificationPolicy::NearestFace => Some(self.nearest_face(p)),
            ClassificationPolicy::Threshold => self.threshold_face(p),
        }
    }

    fn nearest_face(&self, p: Point3) -> Face {
        let distances = self.face_distances(p);
        let mut best = 0;
        for (i, &d) in distances.iter().enumerate().skip(1) {
            // Strict comparison keeps the earlier face on ties.
            if d < distances[best] {
                best = i;
            }
        }
        Face::ALL[best]
    }

    fn threshold_face(&self, p: Point3) -> Option<Face> {
        let b = &self.boundary;
        if p.z > b.threshold_z && p.y > b.threshold_y {
            Some(Face::Top)
        } else if p.z > b.threshold_z && p.y.abs() < b.threshold_y {
            Some(Face::Side)
        } else {
            None
        }
    }
}
