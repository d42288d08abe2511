//! Region locator.
//!
//! Cuts the five text/icon zones out of a card image using fixed fractional
//! boxes. No rotation or scale correction is attempted; the card is assumed
//! to be upright and to fill the image.

use anyhow::{anyhow, Result};
use image::{ImageBuffer, Rgba, RgbaImage};
use std::fmt;

use crate::config::{ZoneBox, ZoneLayout};

/// One of the five fixed card zones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Zone {
    Name,
    Attribute,
    Type,
    Description,
    AtkDef,
}

impl Zone {
    /// All zones in their declared order.
    pub const ALL: [Zone; 5] = [
        Zone::Name,
        Zone::Attribute,
        Zone::Type,
        Zone::Description,
        Zone::AtkDef,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Zone::Name => "name",
            Zone::Attribute => "attribute",
            Zone::Type => "type",
            Zone::Description => "description",
            Zone::AtkDef => "atkdef",
        }
    }

    fn zone_box(self, layout: &ZoneLayout) -> ZoneBox {
        match self {
            Zone::Name => layout.name,
            Zone::Attribute => layout.attribute,
            Zone::Type => layout.monster_type,
            Zone::Description => layout.description,
            Zone::AtkDef => layout.atkdef,
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A crop rectangle in absolute pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelBox {
    /// Converts a fractional box to pixels for a `w` x `h` image.
    ///
    /// Edges are truncated toward zero and clamped to the image. The result
    /// always covers at least one pixel in each direction, so tiny images
    /// still produce non-empty crops.
    pub fn from_fractions(zone_box: &ZoneBox, w: u32, h: u32) -> Self {
        Self::build(zone_box, w, h, false)
    }

    /// The pixel box of one card zone.
    ///
    /// The type zone's right edge is rounded to the nearest column (ties to
    /// even) instead of truncated; the layout was tuned with that edge.
    pub fn for_zone(zone: Zone, layout: &ZoneLayout, w: u32, h: u32) -> Self {
        Self::build(&zone.zone_box(layout), w, h, zone == Zone::Type)
    }

    fn build(zone_box: &ZoneBox, w: u32, h: u32, round_right: bool) -> Self {
        let (x, width) = span(zone_box.left, zone_box.right, w, round_right);
        let (y, height) = span(zone_box.top, zone_box.bottom, h, false);
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

fn span(start: f64, end: f64, extent: u32, round_end: bool) -> (u32, u32) {
    let lo = ((start * extent as f64) as u32).min(extent.saturating_sub(1));
    let end = end * extent as f64;
    let end = if round_end { end.round_ties_even() } else { end };
    let hi = (end as u32).min(extent).max(lo + 1);
    (lo, hi - lo)
}

/// The five zone crops of one card image.
#[derive(Clone, Debug)]
pub struct RegionSet {
    pub name: RgbaImage,
    pub attribute: RgbaImage,
    pub monster_type: RgbaImage,
    pub description: RgbaImage,
    pub atkdef: RgbaImage,
}

impl RegionSet {
    pub fn get(&self, zone: Zone) -> &RgbaImage {
        match zone {
            Zone::Name => &self.name,
            Zone::Attribute => &self.attribute,
            Zone::Type => &self.monster_type,
            Zone::Description => &self.description,
            Zone::AtkDef => &self.atkdef,
        }
    }

    /// Iterates zones in declared order.
    pub fn iter(&self) -> impl Iterator<Item = (Zone, &RgbaImage)> {
        Zone::ALL.into_iter().map(move |zone| (zone, self.get(zone)))
    }
}

/// Crops a sub-region from an image using a fractional box.
pub fn crop_zone(img: &ImageBuffer<Rgba<u8>, Vec<u8>>, zone_box: &ZoneBox) -> RgbaImage {
    let (w, h) = img.dimensions();
    crop_box(img, PixelBox::from_fractions(zone_box, w, h))
}

fn crop_box(img: &RgbaImage, b: PixelBox) -> RgbaImage {
    image::imageops::crop_imm(img, b.x, b.y, b.width, b.height).to_image()
}

/// Crops all five zones of a card.
///
/// Returns an error for an image with zero width or height.
pub fn crop_regions(img: &RgbaImage, layout: &ZoneLayout) -> Result<RegionSet> {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return Err(anyhow!("Cannot crop regions from a {}x{} image", w, h));
    }

    let crop = |zone: Zone| crop_box(img, PixelBox::for_zone(zone, layout, w, h));
    Ok(RegionSet {
        name: crop(Zone::Name),
        attribute: crop(Zone::Attribute),
        monster_type: crop(Zone::Type),
        description: crop(Zone::Description),
        atkdef: crop(Zone::AtkDef),
    })
}
