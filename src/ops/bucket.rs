use image::Rgba;

use crate::canvas::{BoundedImage, CompositeMode, IntRect, TRANSPARENT, premultiply};
use crate::components::layers::LayerStack;
use crate::components::tools::{FillMode, FillProperties, ReferenceMode};
use crate::ops::color_match::{ComparisonCache, colors_match};
use crate::ops::flood_fill::{clamp_seed, flood_fill_image};

/// Reported around every fill that actually changes the target, so the
/// caller can snapshot for undo before and redraw after.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BucketProgress {
    WillFillTarget,
    DidFillTarget,
}

/// One bucket-fill gesture: the first click plus any drag continuation.
///
/// Everything that must stay fixed for the gesture (reference image, start
/// colour, drag eligibility) is captured in [`BucketFill::new`]. Build a new
/// engine for every new click.
pub struct BucketFill {
    properties: FillProperties,
    max_fill_region: IntRect,
    layer_index: usize,
    frame_index: i32,
    reference_image: BoundedImage,
    start_reference_color: Rgba<u8>,
    /// Straight-alpha colour as picked.
    color: Rgba<u8>,
    /// Premultiplied colour written into the target.
    bucket_color: Rgba<u8>,
    squared_tolerance: u32,
    drag_cache: ComparisonCache,
    use_drag_to_fill: bool,
    filled_once: bool,
}

impl BucketFill {
    /// Start a gesture at `seed` on `layer_index`/`frame_index` with the
    /// straight-alpha `color`.
    pub fn new(
        stack: &LayerStack,
        layer_index: usize,
        frame_index: i32,
        seed: (i32, i32),
        color: Rgba<u8>,
        properties: FillProperties,
    ) -> Self {
        let max_fill_region = stack.canvas();
        let reference_image = match properties.reference_mode {
            ReferenceMode::AllVisibleLayers => stack.flatten_visible_bitmaps(frame_index),
            ReferenceMode::CurrentLayer => {
                let mut img = stack
                    .bitmap_at(layer_index, frame_index)
                    .cloned()
                    .unwrap_or_default();
                // Seeds on the blank canvas around a small layer must stay put
                if !max_fill_region.is_empty() {
                    img.extend(max_fill_region);
                }
                img
            }
        };

        let seed = clamp_seed(reference_image.bounds(), seed);
        let start_reference_color = reference_image.pixel(seed.0, seed.1);
        let bucket_color = premultiply(color);
        let use_drag_to_fill =
            Self::can_use_drag_to_fill(properties.fill_mode, start_reference_color, color);

        Self {
            properties,
            max_fill_region,
            layer_index,
            frame_index,
            reference_image,
            start_reference_color,
            color,
            bucket_color,
            squared_tolerance: properties.squared_tolerance(),
            drag_cache: ComparisonCache::new(),
            use_drag_to_fill,
            filled_once: false,
        }
    }

    /// May the gesture keep filling while dragging?
    ///
    /// Not in Over mode when the seed already shows the opaque bucket colour
    /// or the bucket is fully transparent, and not in Behind mode over an
    /// opaque seed.
    pub fn can_use_drag_to_fill(
        fill_mode: FillMode,
        reference_pixel: Rgba<u8>,
        color: Rgba<u8>,
    ) -> bool {
        match fill_mode {
            FillMode::Over => {
                let opaque = Rgba([color[0], color[1], color[2], 255]);
                reference_pixel != opaque && color[3] != 0
            }
            FillMode::Behind => reference_pixel[3] != 255,
            FillMode::Replace => true,
        }
    }

    /// Is `target_pixel` exactly the bucket colour already? Over and Behind
    /// only count opaque pixels; Replace writes the exact opacity and counts
    /// any alpha.
    fn already_filled(&self, target_pixel: Rgba<u8>) -> bool {
        target_pixel == self.bucket_color
            && (self.properties.fill_mode == FillMode::Replace || target_pixel[3] == 255)
    }

    /// Gate for a fill at `point` whose current target pixel is `target_pixel`.
    /// The first fill of a gesture always passes.
    pub fn allow_fill(&mut self, point: (i32, i32), target_pixel: Rgba<u8>) -> bool {
        if !self.filled_once {
            return true;
        }
        if !self.use_drag_to_fill || self.already_filled(target_pixel) {
            return false;
        }

        let reference_pixel = self.reference_image.pixel(point.0, point.1);
        if !colors_match(
            reference_pixel,
            self.start_reference_color,
            self.squared_tolerance,
            &mut self.drag_cache,
        ) {
            return false;
        }
        target_pixel == TRANSPARENT
            || colors_match(
                target_pixel,
                self.start_reference_color,
                self.squared_tolerance,
                &mut self.drag_cache,
            )
    }

    /// Fill at `point` on the gesture's layer and frame.
    ///
    /// Returns `true` when the target changed. Every refusal (no bitmap at
    /// the frame, drag gate closed, nothing to fill) leaves the stack alone
    /// and skips `on_progress`.
    pub fn paint<F>(
        &mut self,
        stack: &mut LayerStack,
        point: (i32, i32),
        mut on_progress: F,
    ) -> bool
    where
        F: FnMut(BucketProgress, usize, i32),
    {
        let Some(target) = stack.bitmap_at(self.layer_index, self.frame_index) else {
            crate::log_info!(
                "Bucket fill skipped: no bitmap on layer {} at frame {}",
                self.layer_index,
                self.frame_index
            );
            return false;
        };

        let point = clamp_seed(self.reference_image.bounds(), point);
        let target_pixel = target.pixel(point.0, point.1);
        let target_bounds = target.bounds();

        if !self.allow_fill(point, target_pixel) {
            return false;
        }

        // Replace punches the hole with an opaque stamp, then lays the exact colour back in
        let stamp_color = match self.properties.fill_mode {
            FillMode::Replace => Rgba([self.color[0], self.color[1], self.color[2], 255]),
            FillMode::Over | FillMode::Behind => self.bucket_color,
        };

        let Some(fill) = flood_fill_image(
            &self.reference_image,
            self.max_fill_region,
            target_bounds,
            point,
            stamp_color,
            self.squared_tolerance,
            self.properties.effective_expand(),
        ) else {
            crate::log_info!("Bucket fill at ({}, {}) matched nothing", point.0, point.1);
            return false;
        };

        on_progress(BucketProgress::WillFillTarget, self.layer_index, self.frame_index);

        let Some(target) = stack.bitmap_at_mut(self.layer_index, self.frame_index) else {
            return false;
        };
        match self.properties.fill_mode {
            FillMode::Over => target.paste(&fill, CompositeMode::SourceOver),
            FillMode::Behind => target.paste(&fill, CompositeMode::DestinationOver),
            FillMode::Replace => {
                target.paste(&fill, CompositeMode::DestinationOut);
                let mut solid = BoundedImage::new_filled(fill.bounds(), self.bucket_color);
                solid.paste(&fill, CompositeMode::DestinationIn);
                target.paste(&solid, CompositeMode::SourceOver);
            }
        }
        target.set_modified(true);

        on_progress(BucketProgress::DidFillTarget, self.layer_index, self.frame_index);
        self.filled_once = true;
        true
    }

    pub fn properties(&self) -> &FillProperties {
        &self.properties
    }

    pub fn layer_index(&self) -> usize {
        self.layer_index
    }

    pub fn frame_index(&self) -> i32 {
        self.frame_index
    }

    pub fn reference_image(&self) -> &BoundedImage {
        &self.reference_image
    }

    pub fn start_reference_color(&self) -> Rgba<u8> {
        self.start_reference_color
    }

    pub fn bucket_color(&self) -> Rgba<u8> {
        self.bucket_color
    }

    pub fn uses_drag_to_fill(&self) -> bool {
        self.use_drag_to_fill
    }

    pub fn filled_once(&self) -> bool {
        self.filled_once
    }
}
