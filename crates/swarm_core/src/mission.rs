//! Mission descriptions.
//!
//! A [`MissionFile`] names the robots, the debris layout and the tuning for
//! one run. Debris is either listed explicitly or generated from a seeded
//! [`FieldConfig`].
//!
//! **Note:** This module contains no IO. It parses and produces RON text;
//! reading files is handled by `swarm_headless`.

use serde::{Deserialize, Serialize};

use crate::components::{Debris, Material};
use crate::config::{SimConfig, TickParams};
use crate::error::{Result, SwarmError};
use crate::math::{Fixed, Vec2Fixed};
use crate::placement::{generate_debris_field, FieldConfig};
use crate::registry::EntityRegistry;

/// One hand-placed debris piece.
///
/// # Example RON
///
/// ```ron
/// DebrisSpec(id: "DB-001", x: 20.0, y: 30.0, material: titanium, size: 2.5)
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebrisSpec {
    /// Unique debris identifier.
    pub id: String,
    /// X coordinate on the 0-100 plane.
    pub x: f64,
    /// Y coordinate on the 0-100 plane.
    pub y: f64,
    /// What the piece is made of.
    pub material: Material,
    /// Relative size.
    #[serde(default = "default_size")]
    pub size: f64,
}

const fn default_size() -> f64 {
    1.0
}

/// A complete mission layout.
///
/// # Example RON
///
/// ```ron
/// MissionFile(
///     name: "Low orbit sweep",
///     home: (50.0, 50.0),
///     robots: ["SR-01", "SR-02"],
///     debris: [
///         DebrisSpec(id: "DB-001", x: 20.0, y: 30.0, material: aluminum, size: 1.5),
///     ],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionFile {
    /// Display name.
    pub name: String,
    /// Tick tuning.
    #[serde(default)]
    pub config: SimConfig,
    /// Mother-station position.
    pub home: (f64, f64),
    /// Robot identifiers, all spawned at home.
    pub robots: Vec<String>,
    /// Hand-placed debris.
    #[serde(default)]
    pub debris: Vec<DebrisSpec>,
    /// Seeded random debris, appended after the hand-placed pieces.
    #[serde(default)]
    pub field: Option<FieldConfig>,
}

impl MissionFile {
    /// Parse a mission from RON text.
    ///
    /// `origin` names the source in error messages (usually a file path).
    pub fn from_ron(source: &str, origin: &str) -> Result<Self> {
        ron::from_str(source).map_err(|e| SwarmError::DataParseError {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    /// Render the mission as pretty RON.
    pub fn to_ron(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| SwarmError::InvalidState(format!("Failed to render mission: {e}")))
    }

    /// Validate the mission and produce tick parameters plus a registry.
    pub fn build(&self) -> Result<(TickParams, EntityRegistry)> {
        let params = self.config.to_params()?;
        let home = plane_point("mother station", self.home.0, self.home.1)?;

        let mut debris = self
            .debris
            .iter()
            .map(DebrisSpec::to_debris)
            .collect::<Result<Vec<_>>>()?;
        if let Some(field) = &self.field {
            debris.extend(generate_debris_field(field, home)?);
        }

        let registry = EntityRegistry::with_robot_ids(home, &self.robots, debris)?;
        Ok((params, registry))
    }

    /// Total debris the mission will contain once built.
    #[must_use]
    pub fn debris_count(&self) -> usize {
        self.debris.len() + self.field.as_ref().map_or(0, |f| f.count as usize)
    }

    /// The built-in demo mission: three robots around a central station.
    #[must_use]
    pub fn default_mission() -> Self {
        let piece = |id: &str, x: f64, y: f64, material: Material, size: f64| DebrisSpec {
            id: id.to_string(),
            x,
            y,
            material,
            size,
        };

        Self {
            name: "Default sweep".to_string(),
            config: SimConfig::default(),
            home: (50.0, 50.0),
            robots: vec!["SR-01".into(), "SR-02".into(), "SR-03".into()],
            debris: vec![
                piece("DB-001", 20.0, 30.0, Material::Aluminum, 1.5),
                piece("DB-002", 75.0, 20.0, Material::Titanium, 2.0),
                piece("DB-003", 85.0, 70.0, Material::SolarPanel, 4.0),
                piece("DB-004", 30.0, 80.0, Material::Electronics, 1.0),
                piece("DB-005", 60.0, 40.0, Material::CarbonComposite, 2.5),
                piece("DB-006", 10.0, 60.0, Material::Aluminum, 3.0),
                piece("DB-007", 45.0, 15.0, Material::Titanium, 1.25),
                piece("DB-008", 90.0, 45.0, Material::Electronics, 0.75),
            ],
            field: None,
        }
    }
}

impl DebrisSpec {
    fn to_debris(&self) -> Result<Debris> {
        let position = plane_point(&format!("debris {}", self.id), self.x, self.y)?;
        let size = Fixed::checked_from_num(self.size)
            .filter(|s| *s > Fixed::ZERO)
            .ok_or_else(|| {
                SwarmError::InvalidConfig(format!(
                    "debris {} size must be positive, got {}",
                    self.id, self.size
                ))
            })?;
        Ok(Debris::new(self.id.clone(), position, self.material, size))
    }
}

fn plane_point(what: &str, x: f64, y: f64) -> Result<Vec2Fixed> {
    let out_of_bounds = || SwarmError::OutOfBounds {
        what: what.to_string(),
        x,
        y,
    };
    let fx = Fixed::checked_from_num(x).ok_or_else(out_of_bounds)?;
    let fy = Fixed::checked_from_num(y).ok_or_else(out_of_bounds)?;
    let point = Vec2Fixed::new(fx, fy);
    if point.in_plane() {
        Ok(point)
    } else {
        Err(out_of_bounds())
    }
}
