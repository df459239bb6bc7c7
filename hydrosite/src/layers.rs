//! The ten-layer suitability catalog.
//!
//! Each definition pairs static presentation metadata (name, units,
//! palette, legend bounds, pixel scale) with a pure recipe from a region
//! to a derived raster expression. The index layers, scored 0-100, also
//! carry a three-class discretization (score / 33.34, floored, clamped to
//! [0, 2]) that feeds the classification summary.
//!
//! Source datasets are fixed, published collections, versioned by the
//! remote catalog rather than by this crate:
//!
//! - `USGS/SRTMGL1_003` — elevation
//! - `WWF/HydroSHEDS/15ACC` — flow accumulation
//! - `UCSB-CHG/CHIRPS/DAILY` — rainfall, 2020-2023 mean
//! - `COPERNICUS/S2` — reflectance composite, 2023, cloud < 30%
//! - `OpenLandMap/SOL/*` — clay/sand fractions, organic carbon

use std::fmt;

use crate::expr::Filter;
use crate::image::{Geometry, Image, ImageCollection};

/// Identifier for one catalog layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerId {
    SoilStability,
    RockPresence,
    WaterAvailability,
    FloodRisk,
    SoilWaterRetention,
    Elevation,
    Slope,
    Rainfall,
    Vegetation,
    SurfaceWater,
}

impl LayerId {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerId::SoilStability => "soil_stability",
            LayerId::RockPresence => "rock_presence",
            LayerId::WaterAvailability => "water_availability",
            LayerId::FloodRisk => "flood_risk",
            LayerId::SoilWaterRetention => "soil_water_retention",
            LayerId::Elevation => "elevation",
            LayerId::Slope => "slope",
            LayerId::Rainfall => "rainfall",
            LayerId::Vegetation => "vegetation",
            LayerId::SurfaceWater => "surface_water",
        }
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of a layer recipe: the derived raster, plus the three-class
/// image for layers that publish a classification summary.
pub struct ComputedLayer {
    pub image: Image,
    pub classification: Option<Image>,
}

/// One catalog entry: static metadata plus the compute recipe.
pub struct LayerDefinition {
    pub id: LayerId,
    pub name: &'static str,
    pub description: &'static str,
    pub units: &'static str,
    pub palette: &'static [&'static str],
    pub legend_min: f64,
    pub legend_max: f64,
    /// Target pixel resolution in meters for region reductions.
    pub scale: u32,
    pub compute: fn(&Geometry) -> ComputedLayer,
}

/// The catalog, in declared response order.
pub fn catalog() -> &'static [LayerDefinition] {
    &CATALOG
}

const SUITABILITY_PALETTE: &[&str] = &["d7191c", "fdae61", "ffffbf", "a6d96a", "1a9641"];
const RISK_PALETTE: &[&str] = &["1a9641", "a6d96a", "ffffbf", "fdae61", "d7191c"];
const ELEVATION_PALETTE: &[&str] = &["006633", "e5ffcc", "662a00", "d8d8d8", "f5f5f5"];
const SLOPE_PALETTE: &[&str] = &["ffffcc", "a1dab4", "41b6c4", "2c7fb8", "253494"];
const RAINFALL_PALETTE: &[&str] = &["ffffd9", "c7e9b4", "41b6c4", "225ea8", "081d58"];
const VEGETATION_PALETTE: &[&str] = &["ffffe5", "d9f0a3", "78c679", "238443", "004529"];
const WATER_PALETTE: &[&str] = &["f7fbff", "c6dbef", "6baed6", "2171b5", "08306b"];

static CATALOG: [LayerDefinition; 10] = [
    LayerDefinition {
        id: LayerId::SoilStability,
        name: "Soil Stability",
        description: "Foundation suitability from clay/sand balance of the topsoil",
        units: "index",
        palette: SUITABILITY_PALETTE,
        legend_min: 0.0,
        legend_max: 100.0,
        scale: 250,
        compute: soil_stability,
    },
    LayerDefinition {
        id: LayerId::RockPresence,
        name: "Rock Presence",
        description: "Likelihood of exposed bedrock from slope and bare-ground signal",
        units: "index",
        palette: SUITABILITY_PALETTE,
        legend_min: 0.0,
        legend_max: 100.0,
        scale: 30,
        compute: rock_presence,
    },
    LayerDefinition {
        id: LayerId::WaterAvailability,
        name: "Water Availability",
        description: "Combined rainfall climatology and upstream flow accumulation",
        units: "index",
        palette: SUITABILITY_PALETTE,
        legend_min: 0.0,
        legend_max: 100.0,
        scale: 500,
        compute: water_availability,
    },
    LayerDefinition {
        id: LayerId::FloodRisk,
        name: "Flood Risk",
        description: "Inundation exposure from drainage concentration on flat terrain",
        units: "index",
        palette: RISK_PALETTE,
        legend_min: 0.0,
        legend_max: 100.0,
        scale: 500,
        compute: flood_risk,
    },
    LayerDefinition {
        id: LayerId::SoilWaterRetention,
        name: "Soil Water Retention",
        description: "Capacity of the soil to hold water, from clay and organic carbon",
        units: "index",
        palette: SUITABILITY_PALETTE,
        legend_min: 0.0,
        legend_max: 100.0,
        scale: 250,
        compute: soil_water_retention,
    },
    LayerDefinition {
        id: LayerId::Elevation,
        name: "Elevation",
        description: "SRTM terrain elevation",
        units: "m",
        palette: ELEVATION_PALETTE,
        legend_min: 0.0,
        legend_max: 2500.0,
        scale: 30,
        compute: elevation,
    },
    LayerDefinition {
        id: LayerId::Slope,
        name: "Slope",
        description: "Terrain slope derived from SRTM elevation",
        units: "degrees",
        palette: SLOPE_PALETTE,
        legend_min: 0.0,
        legend_max: 45.0,
        scale: 30,
        compute: slope,
    },
    LayerDefinition {
        id: LayerId::Rainfall,
        name: "Rainfall",
        description: "Mean daily precipitation, CHIRPS 2020-2023",
        units: "mm/day",
        palette: RAINFALL_PALETTE,
        legend_min: 0.0,
        legend_max: 5.0,
        scale: 5000,
        compute: rainfall,
    },
    LayerDefinition {
        id: LayerId::Vegetation,
        name: "Vegetation",
        description: "NDVI from the Sentinel-2 annual composite",
        units: "NDVI",
        palette: VEGETATION_PALETTE,
        legend_min: 0.0,
        legend_max: 0.8,
        scale: 10,
        compute: vegetation,
    },
    LayerDefinition {
        id: LayerId::SurfaceWater,
        name: "Surface Water",
        description: "NDWI from the Sentinel-2 annual composite",
        units: "NDWI",
        palette: WATER_PALETTE,
        legend_min: -0.5,
        legend_max: 0.5,
        scale: 10,
        compute: surface_water,
    },
];

// --- Source datasets ---

fn srtm() -> Image {
    Image::load("USGS/SRTMGL1_003").select("elevation")
}

fn flow_accumulation() -> Image {
    Image::load("WWF/HydroSHEDS/15ACC")
        .select_index(0)
        .rename("accumulation")
}

fn rainfall_climatology() -> Image {
    ImageCollection::load("UCSB-CHG/CHIRPS/DAILY")
        .filter_date("2020-01-01", "2023-12-31")
        .mean()
        .select("precipitation")
}

fn sentinel2(region: &Geometry) -> Image {
    ImageCollection::load("COPERNICUS/S2")
        .filter_date("2023-01-01", "2023-12-31")
        .filter(Filter::less_than("CLOUDY_PIXEL_PERCENTAGE", 30.0))
        .filter_bounds(region)
        .median()
}

fn clay() -> Image {
    Image::load("OpenLandMap/SOL/SOL_CLAY-WFRACTION_USDA-3A1A1A_M/v02")
        .select_index(0)
        .rename("clay")
}

fn sand() -> Image {
    Image::load("OpenLandMap/SOL/SOL_SAND-WFRACTION_USDA-3A1A1A_M/v02")
        .select_index(0)
        .rename("sand")
}

fn organic_carbon() -> Image {
    Image::load("OpenLandMap/SOL/SOL_ORGANIC-CARBON_USDA-6A1C_M/v02")
        .select_index(0)
        .rename("organic")
}

fn slope_degrees() -> Image {
    Image::terrain_slope(&srtm())
}

/// Three suitability classes: score / 33.34, floored, clamped to [0, 2].
fn classified(score: &Image) -> Image {
    score
        .divide(&Image::constant(33.34))
        .floor()
        .clamp(0.0, 2.0)
}

/// Weighted sum of `[0, 1]` terms, rescaled to a 0-100 index.
fn weighted_index(terms: &[(Image, f64)], band: &str) -> Image {
    let mut acc = Image::constant(0.0);
    for (term, weight) in terms {
        acc = acc.add(&term.multiply(&Image::constant(*weight)));
    }
    acc.multiply(&Image::constant(100.0)).rename(band)
}

fn inverted(term: &Image) -> Image {
    Image::constant(1.0).subtract(term)
}

// --- Recipes ---

/// Clay binds, sand drains: high clay and low sand fractions score well.
fn soil_stability(_region: &Geometry) -> ComputedLayer {
    let score = weighted_index(
        &[
            (clay().unit_scale(0.0, 50.0), 0.6),
            (inverted(&sand().unit_scale(0.0, 100.0)), 0.4),
        ],
        "soil_stability",
    );
    ComputedLayer {
        classification: Some(classified(&score)),
        image: score,
    }
}

/// Steep terrain with little vegetation cover reads as exposed rock.
fn rock_presence(region: &Geometry) -> ComputedLayer {
    let ndvi = sentinel2(region).normalized_difference("B8", "B4");
    let score = weighted_index(
        &[
            (slope_degrees().unit_scale(0.0, 45.0), 0.7),
            (inverted(&ndvi.unit_scale(0.0, 0.6)), 0.3),
        ],
        "rock_presence",
    );
    ComputedLayer {
        classification: Some(classified(&score)),
        image: score,
    }
}

/// Rainfall supply plus upstream catchment concentration.
fn water_availability(_region: &Geometry) -> ComputedLayer {
    let score = weighted_index(
        &[
            (rainfall_climatology().unit_scale(0.0, 5.0), 0.5),
            (flow_accumulation().unit_scale(0.0, 5000.0), 0.5),
        ],
        "water_availability",
    );
    ComputedLayer {
        classification: Some(classified(&score)),
        image: score,
    }
}

/// Drainage concentration on flat ground marks inundation-prone cells.
fn flood_risk(_region: &Geometry) -> ComputedLayer {
    let score = weighted_index(
        &[
            (flow_accumulation().unit_scale(0.0, 5000.0), 0.6),
            (inverted(&slope_degrees().unit_scale(0.0, 15.0)), 0.4),
        ],
        "flood_risk",
    );
    ComputedLayer {
        classification: Some(classified(&score)),
        image: score,
    }
}

/// Clay fraction and organic carbon both raise field capacity.
fn soil_water_retention(_region: &Geometry) -> ComputedLayer {
    let score = weighted_index(
        &[
            (clay().unit_scale(0.0, 50.0), 0.5),
            (organic_carbon().unit_scale(0.0, 120.0), 0.5),
        ],
        "soil_water_retention",
    );
    ComputedLayer {
        classification: Some(classified(&score)),
        image: score,
    }
}

fn elevation(_region: &Geometry) -> ComputedLayer {
    ComputedLayer {
        image: srtm(),
        classification: None,
    }
}

fn slope(_region: &Geometry) -> ComputedLayer {
    ComputedLayer {
        image: slope_degrees().rename("slope"),
        classification: None,
    }
}

fn rainfall(_region: &Geometry) -> ComputedLayer {
    ComputedLayer {
        image: rainfall_climatology(),
        classification: None,
    }
}

fn vegetation(region: &Geometry) -> ComputedLayer {
    ComputedLayer {
        image: sentinel2(region)
            .normalized_difference("B8", "B4")
            .rename("ndvi"),
        classification: None,
    }
}

fn surface_water(region: &Geometry) -> ComputedLayer {
    ComputedLayer {
        image: sentinel2(region)
            .normalized_difference("B3", "B8")
            .rename("ndwi"),
        classification: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn test_region() -> Geometry {
        Geometry::point(1.66, 28.03).buffer(10_000.0)
    }

    #[test]
    fn test_catalog_has_ten_unique_ordered_layers() {
        let layers = catalog();
        assert_eq!(layers.len(), 10);

        let ids: Vec<&str> = layers.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids[0], "soil_stability");
        assert_eq!(ids[3], "flood_risk");
        assert_eq!(ids[9], "surface_water");

        let unique: HashSet<&str> = ids.iter().copied().collect();
        assert_eq!(unique.len(), 10);
    }

    #[test]
    fn test_metadata_is_well_formed() {
        for definition in catalog() {
            assert!(!definition.palette.is_empty(), "{}", definition.id);
            assert!(
                definition.legend_min < definition.legend_max,
                "{}",
                definition.id
            );
            assert!(definition.scale > 0, "{}", definition.id);
            assert!(!definition.units.is_empty(), "{}", definition.id);
        }
    }

    #[test]
    fn test_index_layers_carry_classification() {
        let region = test_region();
        for definition in catalog() {
            let computed = (definition.compute)(&region);
            let expect_classes = matches!(
                definition.id,
                LayerId::SoilStability
                    | LayerId::RockPresence
                    | LayerId::WaterAvailability
                    | LayerId::FloodRisk
                    | LayerId::SoilWaterRetention
            );
            assert_eq!(
                computed.classification.is_some(),
                expect_classes,
                "{}",
                definition.id
            );
        }
    }

    #[test]
    fn test_classification_discretizes_into_three_classes() {
        let region = test_region();
        let computed = soil_stability(&region);
        let text = computed
            .classification
            .unwrap()
            .expr()
            .serialize()
            .to_string();

        assert!(text.contains("33.34"));
        assert!(text.contains("Image.floor"));
        assert!(text.contains("Image.clamp"));
    }

    #[test]
    fn test_recipes_reference_their_datasets() {
        let region = test_region();

        let text = water_availability(&region).image.expr().serialize().to_string();
        assert!(text.contains("UCSB-CHG/CHIRPS/DAILY"));
        assert!(text.contains("WWF/HydroSHEDS/15ACC"));

        let text = rock_presence(&region).image.expr().serialize().to_string();
        assert!(text.contains("COPERNICUS/S2"));
        assert!(text.contains("USGS/SRTMGL1_003"));
        assert!(text.contains("CLOUDY_PIXEL_PERCENTAGE"));

        let text = soil_water_retention(&region).image.expr().serialize().to_string();
        assert!(text.contains("SOL_CLAY-WFRACTION"));
        assert!(text.contains("SOL_ORGANIC-CARBON"));
    }

    #[test]
    fn test_layer_id_display() {
        assert_eq!(LayerId::FloodRisk.to_string(), "flood_risk");
        assert_eq!(LayerId::SoilWaterRetention.to_string(), "soil_water_retention");
    }
}
