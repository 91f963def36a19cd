//! Pixel geometry for media transforms
//!
//! Two transform families over a decoded image of width `W` and height `H`:
//!
//! - **Directional crop**: removes `P`% from one edge. Removing from the right
//!   keeps columns `[0, W*(100-P)/100)`, from the left keeps
//!   `[W*P/100, W)`; top and bottom mirror this on rows.
//! - **Corner mask**: paints an opaque `W*w%/100 × H*h%/100` rectangle flush
//!   into one corner. Dimensions never change.
//!
//! All bounds use truncating integer division. Region math is kept in pure
//! functions ([`crop_region`], [`mask_region`]) so it can be tested without
//! pixel buffers.

use std::fmt;
use std::str::FromStr;

use image::{DynamicImage, GenericImage, GenericImageView, Rgba};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by geometry transforms
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    /// Percentage outside the accepted 1..=90 range
    #[error("Percentage {0} is out of range (expected 1..=90)")]
    PercentOutOfRange(u32),

    /// Percentage that is not a whole number
    #[error("'{0}' is not a whole percentage")]
    InvalidPercent(String),

    /// Unknown edge, corner or color name
    #[error("Unknown {kind} '{value}'")]
    UnknownName { kind: &'static str, value: String },

    /// The crop would leave no pixels behind
    #[error("Cropping {percent}% from the {from} of a {width}x{height} image leaves nothing")]
    EmptyCrop {
        width: u32,
        height: u32,
        from: Edge,
        percent: u8,
    },
}

/// A validated percentage in 1..=90
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Percent(u8);

impl Percent {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 90;
    pub const DEFAULT: Percent = Percent(35);

    /// Validate a percentage
    pub fn new(value: u32) -> Result<Self, GeometryError> {
        if (Self::MIN as u32..=Self::MAX as u32).contains(&value) {
            Ok(Percent(value as u8))
        } else {
            Err(GeometryError::PercentOutOfRange(value))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// `floor(extent * self / 100)`
    fn share_of(self, extent: u32) -> u32 {
        (u64::from(extent) * u64::from(self.0) / 100) as u32
    }

    /// `floor(extent * (100 - self) / 100)`
    fn remainder_of(self, extent: u32) -> u32 {
        (u64::from(extent) * u64::from(100 - self.0) / 100) as u32
    }
}

impl TryFrom<u32> for Percent {
    type Error = GeometryError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Percent::new(value)
    }
}

impl From<Percent> for u32 {
    fn from(percent: Percent) -> Self {
        u32::from(percent.0)
    }
}

/// Accepts `35` or `35%`
impl FromStr for Percent {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
        let value: u32 = digits
            .parse()
            .map_err(|_| GeometryError::InvalidPercent(s.to_string()))?;
        Percent::new(value)
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Edge a crop removes pixels from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Edge {
    Right,
    Left,
    Top,
    Bottom,
}

impl Edge {
    pub fn as_str(&self) -> &'static str {
        match self {
            Edge::Right => "right",
            Edge::Left => "left",
            Edge::Top => "top",
            Edge::Bottom => "bottom",
        }
    }
}

impl FromStr for Edge {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "right" => Ok(Edge::Right),
            "left" => Ok(Edge::Left),
            "top" => Ok(Edge::Top),
            "bottom" => Ok(Edge::Bottom),
            other => Err(GeometryError::UnknownName {
                kind: "edge",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Corner a mask is painted into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Corner {
    #[serde(alias = "top_left")]
    TopLeft,
    #[serde(alias = "top_right")]
    TopRight,
    #[serde(alias = "bottom_left")]
    BottomLeft,
    #[serde(alias = "bottom_right")]
    BottomRight,
}

impl Corner {
    pub fn as_str(&self) -> &'static str {
        match self {
            Corner::TopLeft => "top-left",
            Corner::TopRight => "top-right",
            Corner::BottomLeft => "bottom-left",
            Corner::BottomRight => "bottom-right",
        }
    }
}

impl FromStr for Corner {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "top-left" => Ok(Corner::TopLeft),
            "top-right" => Ok(Corner::TopRight),
            "bottom-left" => Ok(Corner::BottomLeft),
            "bottom-right" => Ok(Corner::BottomRight),
            other => Err(GeometryError::UnknownName {
                kind: "corner",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Corner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fill color for masks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MaskColor {
    Black,
    White,
}

impl MaskColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaskColor::Black => "black",
            MaskColor::White => "white",
        }
    }

    /// Fully opaque RGBA value
    pub fn rgba(&self) -> Rgba<u8> {
        match self {
            MaskColor::Black => Rgba([0, 0, 0, 255]),
            MaskColor::White => Rgba([255, 255, 255, 255]),
        }
    }
}

impl FromStr for MaskColor {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "black" => Ok(MaskColor::Black),
            "white" => Ok(MaskColor::White),
            other => Err(GeometryError::UnknownName {
                kind: "color",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for MaskColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for a directional crop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropSpec {
    pub from: Edge,
    pub percent: Percent,
}

/// Parameters for a corner mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskSpec {
    pub corner: Corner,
    pub width: Percent,
    pub height: Percent,
    pub color: MaskColor,
}

/// A rectangle of pixels, `[x, x+width) × [y, y+height)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// Region kept by a directional crop
pub fn crop_region(width: u32, height: u32, spec: &CropSpec) -> Region {
    let p = spec.percent;
    match spec.from {
        Edge::Right => Region {
            x: 0,
            y: 0,
            width: p.remainder_of(width),
            height,
        },
        Edge::Left => {
            let start = p.share_of(width);
            Region {
                x: start,
                y: 0,
                width: width - start,
                height,
            }
        }
        Edge::Top => {
            let start = p.share_of(height);
            Region {
                x: 0,
                y: start,
                width,
                height: height - start,
            }
        }
        Edge::Bottom => Region {
            x: 0,
            y: 0,
            width,
            height: p.remainder_of(height),
        },
    }
}

/// Region painted by a corner mask
pub fn mask_region(width: u32, height: u32, spec: &MaskSpec) -> Region {
    let mask_width = spec.width.share_of(width);
    let mask_height = spec.height.share_of(height);

    let (x, y) = match spec.corner {
        Corner::TopLeft => (0, 0),
        Corner::TopRight => (width - mask_width, 0),
        Corner::BottomLeft => (0, height - mask_height),
        Corner::BottomRight => (width - mask_width, height - mask_height),
    };

    Region {
        x,
        y,
        width: mask_width,
        height: mask_height,
    }
}

/// Crop an image, returning a new buffer with the kept region
pub fn crop(image: &DynamicImage, spec: &CropSpec) -> Result<DynamicImage, GeometryError> {
    let (width, height) = image.dimensions();
    let region = crop_region(width, height, spec);

    if region.is_empty() {
        return Err(GeometryError::EmptyCrop {
            width,
            height,
            from: spec.from,
            percent: spec.percent.get(),
        });
    }

    Ok(image.crop_imm(region.x, region.y, region.width, region.height))
}

/// Paint the mask rectangle over the image in place
///
/// Alpha-carrying buffers receive a fully opaque fill; color conversion to
/// the buffer's own representation is done per pixel.
pub fn mask(image: &mut DynamicImage, spec: &MaskSpec) -> Region {
    let (width, height) = image.dimensions();
    let region = mask_region(width, height, spec);
    let fill = spec.color.rgba();

    for y in region.y..region.y + region.height {
        for x in region.x..region.x + region.width {
            image.put_pixel(x, y, fill);
        }
    }

    region
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, RgbImage, RgbaImage};

    fn pct(value: u32) -> Percent {
        Percent::new(value).unwrap()
    }

    fn crop_spec(from: Edge, percent: u32) -> CropSpec {
        CropSpec {
            from,
            percent: pct(percent),
        }
    }

    fn mask_spec(corner: Corner, width: u32, height: u32) -> MaskSpec {
        MaskSpec {
            corner,
            width: pct(width),
            height: pct(height),
            color: MaskColor::Black,
        }
    }

    #[test]
    fn test_percent_bounds() {
        assert!(Percent::new(0).is_err());
        assert!(Percent::new(1).is_ok());
        assert!(Percent::new(90).is_ok());
        assert_eq!(Percent::new(91), Err(GeometryError::PercentOutOfRange(91)));
    }

    #[test]
    fn test_percent_parse() {
        assert_eq!("35".parse::<Percent>().unwrap().get(), 35);
        assert_eq!(" 20% ".parse::<Percent>().unwrap().get(), 20);
        assert_eq!(
            "95".parse::<Percent>(),
            Err(GeometryError::PercentOutOfRange(95))
        );
        assert!(matches!(
            "half".parse::<Percent>(),
            Err(GeometryError::InvalidPercent(_))
        ));
    }

    #[test]
    fn test_crop_widths_over_full_range() {
        for width in [1u32, 7, 99, 640, 1000, 4095] {
            for p in 1..=90u32 {
                let right = crop_region(width, 10, &crop_spec(Edge::Right, p));
                assert_eq!(right.width, width * (100 - p) / 100);
                assert_eq!(right.x, 0);

                let left = crop_region(width, 10, &crop_spec(Edge::Left, p));
                assert_eq!(left.width, width - width * p / 100);
                assert_eq!(left.x + left.width, width);
            }
        }
    }

    #[test]
    fn test_crop_rows() {
        let top = crop_region(100, 600, &crop_spec(Edge::Top, 35));
        assert_eq!(top, Region { x: 0, y: 210, width: 100, height: 390 });

        let bottom = crop_region(100, 600, &crop_spec(Edge::Bottom, 35));
        assert_eq!(bottom, Region { x: 0, y: 0, width: 100, height: 390 });
    }

    #[test]
    fn test_crop_truncates() {
        // 333 * 65 / 100 = 216.45
        let region = crop_region(333, 1, &crop_spec(Edge::Right, 35));
        assert_eq!(region.width, 216);

        // 333 * 35 / 100 = 116.55 -> starts at 116
        let region = crop_region(333, 1, &crop_spec(Edge::Left, 35));
        assert_eq!(region.x, 116);
        assert_eq!(region.width, 217);
    }

    #[test]
    fn test_crop_left_keeps_rightmost_columns() {
        let mut img = RgbImage::new(1000, 2);
        for x in 0..1000 {
            img.put_pixel(x, 0, image::Rgb([(x % 256) as u8, (x / 256) as u8, 0]));
        }
        let cropped = crop(&DynamicImage::ImageRgb8(img), &crop_spec(Edge::Left, 35)).unwrap();

        assert_eq!(cropped.dimensions(), (650, 2));
        let first = cropped.get_pixel(0, 0);
        assert_eq!((first[0], first[1]), ((350 % 256) as u8, 1));
        let last = cropped.get_pixel(649, 0);
        assert_eq!((last[0], last[1]), ((999 % 256) as u8, 3));
    }

    #[test]
    fn test_crop_to_nothing_is_an_error() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(1, 5));
        let err = crop(&img, &crop_spec(Edge::Right, 35)).unwrap_err();
        assert!(matches!(err, GeometryError::EmptyCrop { width: 1, .. }));
    }

    #[test]
    fn test_mask_regions_stay_in_bounds() {
        let corners = [
            Corner::TopLeft,
            Corner::TopRight,
            Corner::BottomLeft,
            Corner::BottomRight,
        ];
        for (w, h) in [(1u32, 1u32), (10, 3), (1000, 600), (17, 401)] {
            for corner in corners {
                for p in [1u32, 35, 90] {
                    let region = mask_region(w, h, &mask_spec(corner, p, 90 - p + 1));
                    assert!(region.x + region.width <= w);
                    assert!(region.y + region.height <= h);
                    assert_eq!(region.width, w * p / 100);
                    assert_eq!(region.height, h * (90 - p + 1) / 100);
                }
            }
        }
    }

    #[test]
    fn test_mask_region_corners() {
        let br = mask_region(1000, 600, &mask_spec(Corner::BottomRight, 35, 20));
        assert_eq!(br, Region { x: 650, y: 480, width: 350, height: 120 });

        let tr = mask_region(1000, 600, &mask_spec(Corner::TopRight, 35, 20));
        assert_eq!(tr, Region { x: 650, y: 0, width: 350, height: 120 });

        let bl = mask_region(1000, 600, &mask_spec(Corner::BottomLeft, 35, 20));
        assert_eq!(bl, Region { x: 0, y: 480, width: 350, height: 120 });

        let tl = mask_region(1000, 600, &mask_spec(Corner::TopLeft, 35, 20));
        assert_eq!(tl, Region { x: 0, y: 0, width: 350, height: 120 });
    }

    #[test]
    fn test_mask_paints_only_the_region() {
        let mut img = DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 10, image::Rgb([9, 9, 9])));
        let spec = MaskSpec {
            color: MaskColor::White,
            ..mask_spec(Corner::BottomRight, 50, 50)
        };

        let region = mask(&mut img, &spec);

        assert_eq!(img.dimensions(), (20, 10));
        for y in 0..10 {
            for x in 0..20 {
                let px = img.get_pixel(x, y);
                if region.contains(x, y) {
                    assert_eq!(px, Rgba([255, 255, 255, 255]));
                } else {
                    assert_eq!(px, Rgba([9, 9, 9, 255]));
                }
            }
        }
    }

    #[test]
    fn test_mask_forces_opaque_alpha() {
        let mut img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 0])));
        mask(&mut img, &mask_spec(Corner::TopLeft, 50, 50));

        assert_eq!(img.get_pixel(0, 0), Rgba([0, 0, 0, 255]));
        assert_eq!(img.get_pixel(3, 3), Rgba([1, 2, 3, 0]));
    }

    #[test]
    fn test_mask_on_grayscale_keeps_representation() {
        let mut img = DynamicImage::ImageLuma8(GrayImage::from_pixel(10, 10, Luma([128])));
        let spec = MaskSpec {
            color: MaskColor::White,
            ..mask_spec(Corner::TopLeft, 30, 30)
        };
        mask(&mut img, &spec);

        let gray = img.as_luma8().unwrap();
        assert_eq!(gray.get_pixel(0, 0), &Luma([255]));
        assert_eq!(gray.get_pixel(9, 9), &Luma([128]));
    }

    #[test]
    fn test_names_parse() {
        assert_eq!("Right".parse::<Edge>().unwrap(), Edge::Right);
        assert_eq!("bottom_right".parse::<Corner>().unwrap(), Corner::BottomRight);
        assert_eq!("top-left".parse::<Corner>().unwrap(), Corner::TopLeft);
        assert_eq!("WHITE".parse::<MaskColor>().unwrap(), MaskColor::White);
        assert!("middle".parse::<Edge>().is_err());
    }
}
