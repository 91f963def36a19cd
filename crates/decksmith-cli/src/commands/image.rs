//! Crop and mask command handlers

use std::path::Path;

use anyhow::Result;

use decksmith_core::deck;
use decksmith_core::{
    Config, Corner, CropSpec, Edge, ImageDefaults, MaskColor, MaskSpec, MediaTransform, Percent,
};

use crate::output::Output;

/// Mask flags as given on the command line; unset ones fall back to config
#[derive(Debug, Default, Clone, Copy)]
pub struct MaskArgs {
    pub corner: Option<Corner>,
    pub width: Option<Percent>,
    pub height: Option<Percent>,
    pub color: Option<MaskColor>,
}

/// Crop every image of a package
pub fn crop(
    input: &Path,
    output_path: Option<&Path>,
    from: Option<Edge>,
    percent: Option<Percent>,
    config: &Config,
    output: &Output,
) -> Result<()> {
    let transform = crop_transform(&config.image, from, percent);
    run(input, output_path, &transform, config, output)
}

/// Mask one corner of every image of a package
pub fn mask(
    input: &Path,
    output_path: Option<&Path>,
    args: MaskArgs,
    config: &Config,
    output: &Output,
) -> Result<()> {
    let transform = mask_transform(&config.image, args);
    run(input, output_path, &transform, config, output)
}

fn run(
    input: &Path,
    output_path: Option<&Path>,
    transform: &MediaTransform,
    config: &Config,
    output: &Output,
) -> Result<()> {
    tracing::info!("Running {} on {:?}", transform.describe(), input);
    let outcome = deck::transform_deck_media(input, output_path, transform, config)?;
    output.print_media(&outcome)
}

fn crop_transform(
    defaults: &ImageDefaults,
    from: Option<Edge>,
    percent: Option<Percent>,
) -> MediaTransform {
    MediaTransform::Crop(CropSpec {
        from: from.unwrap_or(defaults.crop_from),
        percent: percent.unwrap_or(defaults.crop_percent),
    })
}

fn mask_transform(defaults: &ImageDefaults, args: MaskArgs) -> MediaTransform {
    MediaTransform::Mask(MaskSpec {
        corner: args.corner.unwrap_or(defaults.mask_corner),
        width: args.width.unwrap_or(defaults.mask_width_percent),
        height: args.height.unwrap_or(defaults.mask_height_percent),
        color: args.color.unwrap_or(defaults.mask_color),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pct(value: u32) -> Percent {
        Percent::new(value).unwrap()
    }

    #[test]
    fn test_crop_defaults_from_config() {
        let defaults = ImageDefaults {
            crop_from: Edge::Bottom,
            crop_percent: pct(12),
            ..ImageDefaults::default()
        };

        assert_eq!(
            crop_transform(&defaults, None, None),
            MediaTransform::Crop(CropSpec {
                from: Edge::Bottom,
                percent: pct(12),
            })
        );
        assert_eq!(
            crop_transform(&defaults, Some(Edge::Left), Some(pct(50))),
            MediaTransform::Crop(CropSpec {
                from: Edge::Left,
                percent: pct(50),
            })
        );
    }

    #[test]
    fn test_mask_flags_override_config() {
        let defaults = ImageDefaults::default();
        let args = MaskArgs {
            width: Some(pct(20)),
            color: Some(MaskColor::White),
            ..MaskArgs::default()
        };

        assert_eq!(
            mask_transform(&defaults, args),
            MediaTransform::Mask(MaskSpec {
                corner: Corner::BottomRight,
                width: pct(20),
                height: Percent::DEFAULT,
                color: MaskColor::White,
            })
        );
    }
}
