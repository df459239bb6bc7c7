//! Typed wrappers over [`Expr`] for images, collections and geometries.
//!
//! These mirror the small slice of the Earth Engine algebra the layer
//! recipes need. Every method is pure expression-building; evaluation
//! happens remotely when the graph is posted by the client.

use serde_json::json;

use crate::expr::{Expr, Filter};

/// Pixel budget for region reductions. Above this the service coarsens the
/// sampling scale (best effort) instead of failing the reduction.
pub const MAX_REDUCTION_PIXELS: u64 = 1_000_000;

/// A lazy single- or multi-band raster expression.
#[derive(Debug, Clone)]
pub struct Image(Expr);

impl Image {
    /// Reference a published image asset.
    pub fn load(asset_id: &str) -> Self {
        Image(Expr::call("Image.load", [("id", Expr::constant(asset_id))]))
    }

    /// A raster with the given value in every pixel.
    pub fn constant(value: f64) -> Self {
        Image(Expr::call(
            "Image.constant",
            [("value", Expr::constant(value))],
        ))
    }

    /// Slope in degrees derived from a digital elevation model.
    pub fn terrain_slope(dem: &Image) -> Self {
        Image(Expr::call("Terrain.slope", [("input", dem.0.clone())]))
    }

    /// Borrow the underlying expression node.
    pub fn expr(&self) -> &Expr {
        &self.0
    }

    /// Select a band by name.
    pub fn select(&self, band: &str) -> Self {
        Image(Expr::call(
            "Image.select",
            [
                ("input", self.0.clone()),
                ("bandSelectors", Expr::constant(json!([band]))),
            ],
        ))
    }

    /// Select a band by index.
    pub fn select_index(&self, index: u32) -> Self {
        Image(Expr::call(
            "Image.select",
            [
                ("input", self.0.clone()),
                ("bandSelectors", Expr::constant(json!([index]))),
            ],
        ))
    }

    /// Rename the (single) band.
    pub fn rename(&self, name: &str) -> Self {
        Image(Expr::call(
            "Image.rename",
            [
                ("input", self.0.clone()),
                ("names", Expr::constant(json!([name]))),
            ],
        ))
    }

    pub fn add(&self, other: &Image) -> Self {
        self.binary("Image.add", other)
    }

    pub fn subtract(&self, other: &Image) -> Self {
        self.binary("Image.subtract", other)
    }

    pub fn multiply(&self, other: &Image) -> Self {
        self.binary("Image.multiply", other)
    }

    pub fn divide(&self, other: &Image) -> Self {
        self.binary("Image.divide", other)
    }

    fn binary(&self, function: &str, other: &Image) -> Self {
        Image(Expr::call(
            function,
            [("image1", self.0.clone()), ("image2", other.0.clone())],
        ))
    }

    /// Linearly map `[low, high]` to `[0, 1]`.
    pub fn unit_scale(&self, low: f64, high: f64) -> Self {
        Image(Expr::call(
            "Image.unitScale",
            [
                ("input", self.0.clone()),
                ("low", Expr::constant(low)),
                ("high", Expr::constant(high)),
            ],
        ))
    }

    pub fn clamp(&self, low: f64, high: f64) -> Self {
        Image(Expr::call(
            "Image.clamp",
            [
                ("input", self.0.clone()),
                ("low", Expr::constant(low)),
                ("high", Expr::constant(high)),
            ],
        ))
    }

    pub fn floor(&self) -> Self {
        Image(Expr::call("Image.floor", [("input", self.0.clone())]))
    }

    /// `(b1 - b2) / (b1 + b2)` over the named bands.
    pub fn normalized_difference(&self, band1: &str, band2: &str) -> Self {
        Image(Expr::call(
            "Image.normalizedDifference",
            [
                ("input", self.0.clone()),
                ("bandNames", Expr::constant(json!([band1, band2]))),
            ],
        ))
    }

    /// Restrict the image to a region; pixels outside become masked.
    pub fn clip(&self, region: &Geometry) -> Self {
        Image(Expr::call(
            "Image.clip",
            [("input", self.0.clone()), ("geometry", region.0.clone())],
        ))
    }

    /// Render with a fixed palette and legend bounds, for tiles/thumbnails.
    pub fn visualize(&self, min: f64, max: f64, palette: &[&str]) -> Self {
        Image(Expr::call(
            "Image.visualize",
            [
                ("image", self.0.clone()),
                ("min", Expr::constant(json!([min]))),
                ("max", Expr::constant(json!([max]))),
                ("palette", Expr::constant(json!(palette))),
            ],
        ))
    }

    /// Reduce the image over `region` at `scale` meters per pixel.
    ///
    /// Always best-effort with the [`MAX_REDUCTION_PIXELS`] budget, so
    /// oversized regions degrade to an approximation instead of erroring.
    pub fn reduce_region(&self, reducer: Expr, region: &Geometry, scale: u32) -> Expr {
        Expr::call(
            "Image.reduceRegion",
            [
                ("image", self.0.clone()),
                ("reducer", reducer),
                ("geometry", region.0.clone()),
                ("scale", Expr::constant(scale)),
                ("bestEffort", Expr::constant(true)),
                ("maxPixels", Expr::constant(MAX_REDUCTION_PIXELS)),
            ],
        )
    }
}

/// A lazy image collection expression.
#[derive(Debug, Clone)]
pub struct ImageCollection(Expr);

impl ImageCollection {
    /// Reference a published image collection.
    pub fn load(asset_id: &str) -> Self {
        ImageCollection(Expr::call(
            "ImageCollection.load",
            [("id", Expr::constant(asset_id))],
        ))
    }

    /// Keep images acquired in `[start, end)`.
    pub fn filter_date(&self, start: &str, end: &str) -> Self {
        self.filter(Filter::date_range(start, end))
    }

    /// Keep images whose footprint intersects `region`.
    pub fn filter_bounds(&self, region: &Geometry) -> Self {
        self.filter(Filter::bounds(region.0.clone()))
    }

    pub fn filter(&self, filter: Expr) -> Self {
        ImageCollection(Expr::call(
            "Collection.filter",
            [("collection", self.0.clone()), ("filter", filter)],
        ))
    }

    /// Per-pixel mean across the collection.
    pub fn mean(&self) -> Image {
        self.reduce("reduce.mean")
    }

    /// Per-pixel median across the collection.
    pub fn median(&self) -> Image {
        self.reduce("reduce.median")
    }

    fn reduce(&self, function: &str) -> Image {
        let expr = Expr::call(function, [("collection", self.0.clone())]);
        Image(expr)
    }
}

/// A lazy geometry expression.
#[derive(Debug, Clone)]
pub struct Geometry(Expr);

impl Geometry {
    /// A point in WGS84 (`lon`, `lat`).
    pub fn point(lon: f64, lat: f64) -> Self {
        Geometry(Expr::call(
            "GeometryConstructors.Point",
            [("coordinates", Expr::constant(json!([lon, lat])))],
        ))
    }

    /// Footprint of a table asset (used for the study-area polygon).
    pub fn table_footprint(asset_id: &str) -> Self {
        let table = Expr::call(
            "Collection.loadTable",
            [("tableId", Expr::constant(asset_id))],
        );
        Geometry(Expr::call("Collection.geometry", [("collection", table)]))
    }

    /// Borrow the underlying expression node.
    pub fn expr(&self) -> &Expr {
        &self.0
    }

    /// Circular buffer of `meters` around the geometry.
    pub fn buffer(&self, meters: f64) -> Self {
        Geometry(Expr::call(
            "Geometry.buffer",
            [
                ("geometry", self.0.clone()),
                ("distance", Expr::constant(meters)),
            ],
        ))
    }

    /// Intersection with another geometry. Empty when they are disjoint.
    pub fn intersection(&self, other: &Geometry) -> Self {
        Geometry(Expr::call(
            "Geometry.intersection",
            [
                ("geometry", self.0.clone()),
                ("right", other.0.clone()),
                ("maxError", Expr::constant(1.0)),
            ],
        ))
    }

    /// Server-side area in square meters.
    pub fn area(&self) -> Expr {
        Expr::call(
            "Geometry.area",
            [
                ("geometry", self.0.clone()),
                ("maxError", Expr::constant(1.0)),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_math_chain() {
        let srtm = Image::load("USGS/SRTMGL1_003").select("elevation");
        let scaled = srtm.unit_scale(0.0, 2500.0).multiply(&Image::constant(100.0));
        let text = scaled.expr().serialize().to_string();

        assert!(text.contains("Image.load"));
        assert!(text.contains("Image.select"));
        assert!(text.contains("Image.unitScale"));
        assert!(text.contains("Image.multiply"));
        assert!(text.contains("USGS/SRTMGL1_003"));
    }

    #[test]
    fn test_reduce_region_carries_pixel_budget() {
        let region = Geometry::point(1.66, 28.03).buffer(10_000.0);
        let expr = Image::load("A").reduce_region(
            crate::expr::Reducer::combined_stats(),
            &region,
            90,
        );
        let text = expr.serialize().to_string();

        assert!(text.contains("Image.reduceRegion"));
        assert!(text.contains("\"bestEffort\":{\"constantValue\":true}"));
        assert!(text.contains("1000000"));
        assert!(text.contains("\"scale\":{\"constantValue\":90}"));
    }

    #[test]
    fn test_region_construction() {
        let study_area = Geometry::table_footprint("projects/p/assets/Algeria");
        let region = Geometry::point(1.66, 28.03)
            .buffer(10_000.0)
            .intersection(&study_area);
        let text = region.expr().serialize().to_string();

        assert!(text.contains("GeometryConstructors.Point"));
        assert!(text.contains("Geometry.buffer"));
        assert!(text.contains("Geometry.intersection"));
        assert!(text.contains("Collection.loadTable"));
    }

    #[test]
    fn test_collection_composite() {
        let composite = ImageCollection::load("COPERNICUS/S2")
            .filter_date("2023-01-01", "2023-12-31")
            .filter(crate::expr::Filter::less_than("CLOUDY_PIXEL_PERCENTAGE", 30.0))
            .median();
        let text = composite.expr().serialize().to_string();

        assert!(text.contains("ImageCollection.load"));
        assert!(text.contains("Collection.filter"));
        assert!(text.contains("Filter.lessThan"));
        assert!(text.contains("reduce.median"));
    }

    #[test]
    fn test_area_in_meters() {
        let text = Geometry::point(0.0, 0.0)
            .buffer(1_000.0)
            .area()
            .serialize()
            .to_string();
        assert!(text.contains("Geometry.area"));
        assert!(text.contains("maxError"));
    }
}
