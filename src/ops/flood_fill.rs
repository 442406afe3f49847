use std::collections::VecDeque;

use image::Rgba;

use crate::canvas::{BoundedImage, IntRect};
use crate::ops::color_match::{ComparisonCache, colors_match};
use crate::ops::expand::{MAX_EXPAND, expand_mask};
use crate::ops::grid::FillMask;

/// Result of a scanline fill: which cells were reached and the tight
/// rectangle around them.
#[derive(Clone, Debug)]
pub struct FloodFill {
    pub mask: FillMask,
    pub bounds: IntRect,
}

impl FloodFill {
    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }
}

/// Move a seed that falls outside `bounds` to its top-left corner. Seeds are
/// never rejected; an empty `bounds` leaves the seed alone.
pub fn clamp_seed(bounds: IntRect, seed: (i32, i32)) -> (i32, i32) {
    if bounds.is_empty() || bounds.contains_point(seed.0, seed.1) {
        seed
    } else {
        bounds.top_left()
    }
}

/// Rectangle a fill may explore: everything the canvas, the reference and
/// the caller's extra rectangle cover, plus a 1px margin, plus room for the
/// dilation (capped at [`MAX_EXPAND`]).
pub fn search_bounds(
    max_fill_region: IntRect,
    reference_bounds: IntRect,
    extra_bounds: IntRect,
    expand: u32,
) -> IntRect {
    let expand = i32::try_from(expand.min(MAX_EXPAND)).unwrap_or(i32::MAX);
    max_fill_region
        .union(&reference_bounds)
        .union(&extra_bounds)
        .expanded(1)
        .expanded(expand)
}

/// Four-way span fill of the region connected to `seed` whose colours match
/// the seed colour of `reference` within `squared_tolerance`.
///
/// Pixels of `search` that lie outside the reference read as transparent,
/// so a transparent seed region leaks into the margin around the image.
pub fn scanline_flood_fill(
    reference: &BoundedImage,
    search: IntRect,
    seed: (i32, i32),
    squared_tolerance: u32,
    cache: &mut ComparisonCache,
) -> FloodFill {
    let mut mask = FillMask::new(search, false);
    if !search.contains_point(seed.0, seed.1) {
        return FloodFill {
            mask,
            bounds: IntRect::default(),
        };
    }

    let old_color = reference.pixel(seed.0, seed.1);
    let matches = |x: i32, y: i32, cache: &mut ComparisonCache| {
        colors_match(reference.pixel(x, y), old_color, squared_tolerance, cache)
    };

    let mut corners: Option<(i32, i32, i32, i32)> = None;
    let mut queue: VecDeque<(i32, i32)> = VecDeque::new();
    queue.push_back(seed);

    while let Some((x, y)) = queue.pop_front() {
        if mask.is_set(x, y) {
            continue;
        }

        let mut x_left = x;
        while x_left - 1 >= search.left() && matches(x_left - 1, y, cache) {
            x_left -= 1;
        }

        let mut span_up = false;
        let mut span_down = false;
        let mut cx = x_left;
        while cx < search.right() && matches(cx, y, cache) {
            mask.set(cx, y, true);
            corners = Some(match corners {
                Some((x0, y0, x1, y1)) => (x0.min(cx), y0.min(y), x1.max(cx), y1.max(y)),
                None => (cx, y, cx, y),
            });

            if y - 1 >= search.top() {
                let open = !mask.is_set(cx, y - 1) && matches(cx, y - 1, cache);
                if open && !span_up {
                    queue.push_back((cx, y - 1));
                    span_up = true;
                } else if !open {
                    span_up = false;
                }
            }
            if y + 1 < search.bottom() {
                let open = !mask.is_set(cx, y + 1) && matches(cx, y + 1, cache);
                if open && !span_down {
                    queue.push_back((cx, y + 1));
                    span_down = true;
                } else if !open {
                    span_down = false;
                }
            }
            cx += 1;
        }
    }

    let bounds = corners
        .map(|(x0, y0, x1, y1)| IntRect::from_corners(x0, y0, x1, y1))
        .unwrap_or_default();
    FloodFill { mask, bounds }
}

/// Flood fill `reference` from `seed` and return a transparent image sized to
/// the fill with `fill_color` (premultiplied) stamped into every filled pixel.
///
/// Returns `None` when the seed lies outside the search area, when the seed
/// colour already matches `fill_color`, or when nothing was filled.
/// `expand` is capped at [`MAX_EXPAND`].
pub fn flood_fill_image(
    reference: &BoundedImage,
    max_fill_region: IntRect,
    extra_bounds: IntRect,
    seed: (i32, i32),
    fill_color: Rgba<u8>,
    squared_tolerance: u32,
    expand: u32,
) -> Option<BoundedImage> {
    let expand = expand.min(MAX_EXPAND);
    let search = search_bounds(max_fill_region, reference.bounds(), extra_bounds, expand);
    if !search.contains_point(seed.0, seed.1) {
        return None;
    }

    let seed_color = reference.pixel(seed.0, seed.1);
    if colors_match(fill_color, seed_color, squared_tolerance, &mut ComparisonCache::new()) {
        return None;
    }

    let mut cache = ComparisonCache::new();
    let FloodFill { mut mask, bounds } =
        scanline_flood_fill(reference, search, seed, squared_tolerance, &mut cache);
    if bounds.is_empty() {
        return None;
    }

    let mut fill_bounds = bounds;
    if expand > 0 {
        expand_mask(&mut mask, expand);
        let grow = i32::try_from(expand).unwrap_or(i32::MAX);
        fill_bounds = bounds.expanded(grow).intersect(&search);
    }

    let mut image = BoundedImage::new_transparent(fill_bounds);
    for y in fill_bounds.top()..fill_bounds.bottom() {
        for x in fill_bounds.left()..fill_bounds.right() {
            if mask.is_set(x, y) {
                image.set_pixel(x, y, fill_color);
            }
        }
    }
    // Every edge of the fill rectangle touches a filled cell.
    if fill_color[3] > 0 {
        image.assume_minimal_bounds();
    }
    Some(image)
}
