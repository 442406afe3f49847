use image::{Rgba, RgbaImage};
use rayon::prelude::*;

/// Fully transparent premultiplied pixel, returned for every read outside a buffer.
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

// ============================================================================
// GEOMETRY
// ============================================================================

/// Integer rectangle in canvas space. `right()` and `bottom()` are exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct IntRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl IntRect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub const fn from_size(width: i32, height: i32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Rectangle spanning the inclusive pixel corners `(x0, y0)` and `(x1, y1)`.
    pub fn from_corners(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self::new(
            x0.min(x1),
            y0.min(y1),
            (x1 - x0).abs() + 1,
            (y1 - y0).abs() + 1,
        )
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    #[inline]
    pub fn left(&self) -> i32 { self.x }

    #[inline]
    pub fn top(&self) -> i32 { self.y }

    #[inline]
    pub fn right(&self) -> i32 { self.x.saturating_add(self.width) }

    #[inline]
    pub fn bottom(&self) -> i32 { self.y.saturating_add(self.height) }

    pub fn top_left(&self) -> (i32, i32) { (self.x, self.y) }

    /// Number of pixels covered (0 for empty rectangles).
    pub fn area(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.width as usize * self.height as usize
        }
    }

    #[inline]
    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && x < self.right() && y < self.bottom()
    }

    /// `true` when `other` lies entirely inside `self`. Empty rectangles are
    /// never contained, and an empty rectangle contains nothing.
    pub fn contains_rect(&self, other: &IntRect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Smallest rectangle enclosing both. Empty operands are ignored.
    pub fn union(&self, other: &IntRect) -> IntRect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let left = self.x.min(other.x);
        let top = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        IntRect::new(left, top, right - left, bottom - top)
    }

    /// Overlapping area, or the default (empty) rectangle when there is none.
    pub fn intersect(&self, other: &IntRect) -> IntRect {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return IntRect::default();
        }
        IntRect::new(left, top, right - left, bottom - top)
    }

    /// Flip negative extents so width and height are non-negative.
    pub fn normalized(&self) -> IntRect {
        let mut r = *self;
        if r.width < 0 {
            r.x += r.width;
            r.width = -r.width;
        }
        if r.height < 0 {
            r.y += r.height;
            r.height = -r.height;
        }
        r
    }

    /// Move each edge outward by the given amounts (negative moves inward).
    /// Edges saturate at the `i32` range instead of wrapping.
    pub fn adjusted(&self, left: i32, top: i32, right: i32, bottom: i32) -> IntRect {
        IntRect::new(
            self.x.saturating_add(left),
            self.y.saturating_add(top),
            self.width.saturating_sub(left).saturating_add(right),
            self.height.saturating_sub(top).saturating_add(bottom),
        )
    }

    /// Grow every edge outward by `amount` pixels.
    pub fn expanded(&self, amount: i32) -> IntRect {
        self.adjusted(-amount, -amount, amount, amount)
    }

    pub fn translated(&self, dx: i32, dy: i32) -> IntRect {
        IntRect::new(self.x.saturating_add(dx), self.y.saturating_add(dy), self.width, self.height)
    }
}

// ============================================================================
// PREMULTIPLIED COLOR
// ============================================================================

#[inline(always)]
fn mul_div_255(a: u32, b: u32) -> u32 {
    (a * b + 127) / 255
}

/// Scale RGB by alpha. Input is straight (unassociated) RGBA.
pub fn premultiply(color: Rgba<u8>) -> Rgba<u8> {
    let a = color[3] as u32;
    match a {
        255 => color,
        0 => TRANSPARENT,
        _ => Rgba([
            mul_div_255(color[0] as u32, a) as u8,
            mul_div_255(color[1] as u32, a) as u8,
            mul_div_255(color[2] as u32, a) as u8,
            color[3],
        ]),
    }
}

/// Inverse of [`premultiply`]. Alpha 0 yields transparent black.
pub fn unpremultiply(color: Rgba<u8>) -> Rgba<u8> {
    let a = color[3] as u32;
    let channel = |c: u8| ((c as u32 * 255 + a / 2) / a).min(255) as u8;
    match a {
        255 => color,
        0 => TRANSPARENT,
        _ => Rgba([channel(color[0]), channel(color[1]), channel(color[2]), color[3]]),
    }
}

// ============================================================================
// COMPOSITING
// ============================================================================

/// Porter-Duff compositing rules on premultiplied pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CompositeMode {
    Clear,
    Source,
    Destination,
    #[default]
    SourceOver,
    DestinationOver,
    SourceIn,
    DestinationIn,
    SourceOut,
    DestinationOut,
    SourceAtop,
    DestinationAtop,
    Xor,
    Plus,
}

impl CompositeMode {
    pub fn all() -> &'static [CompositeMode] {
        &[
            CompositeMode::Clear,
            CompositeMode::Source,
            CompositeMode::Destination,
            CompositeMode::SourceOver,
            CompositeMode::DestinationOver,
            CompositeMode::SourceIn,
            CompositeMode::DestinationIn,
            CompositeMode::SourceOut,
            CompositeMode::DestinationOut,
            CompositeMode::SourceAtop,
            CompositeMode::DestinationAtop,
            CompositeMode::Xor,
            CompositeMode::Plus,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            CompositeMode::Clear => "clear",
            CompositeMode::Source => "source",
            CompositeMode::Destination => "destination",
            CompositeMode::SourceOver => "source-over",
            CompositeMode::DestinationOver => "destination-over",
            CompositeMode::SourceIn => "source-in",
            CompositeMode::DestinationIn => "destination-in",
            CompositeMode::SourceOut => "source-out",
            CompositeMode::DestinationOut => "destination-out",
            CompositeMode::SourceAtop => "source-atop",
            CompositeMode::DestinationAtop => "destination-atop",
            CompositeMode::Xor => "xor",
            CompositeMode::Plus => "plus",
        }
    }

    /// Source and destination weights `(Fa, Fb)` on a 0..=255 scale.
    #[inline]
    fn factors(self, src_a: u32, dst_a: u32) -> (u32, u32) {
        match self {
            CompositeMode::Clear => (0, 0),
            CompositeMode::Source => (255, 0),
            CompositeMode::Destination => (0, 255),
            CompositeMode::SourceOver => (255, 255 - src_a),
            CompositeMode::DestinationOver => (255 - dst_a, 255),
            CompositeMode::SourceIn => (dst_a, 0),
            CompositeMode::DestinationIn => (0, src_a),
            CompositeMode::SourceOut => (255 - dst_a, 0),
            CompositeMode::DestinationOut => (0, 255 - src_a),
            CompositeMode::SourceAtop => (dst_a, 255 - src_a),
            CompositeMode::DestinationAtop => (255 - dst_a, src_a),
            CompositeMode::Xor => (255 - dst_a, 255 - src_a),
            CompositeMode::Plus => (255, 255),
        }
    }

    /// Whether compositing with this rule can never lower the alpha of a
    /// destination or source pixel that ends up on the union's edge.
    fn preserves_edges(self) -> bool {
        matches!(
            self,
            CompositeMode::SourceOver
                | CompositeMode::DestinationOver
                | CompositeMode::Source
                | CompositeMode::Plus
        )
    }
}

/// Composite one premultiplied pixel onto another.
pub fn composite_pixel(dst: Rgba<u8>, src: Rgba<u8>, mode: CompositeMode) -> Rgba<u8> {
    // Fast paths for the common brush/fill cases
    match mode {
        CompositeMode::SourceOver if src[3] == 255 => return src,
        CompositeMode::SourceOver if src[3] == 0 => return dst,
        CompositeMode::Source => return src,
        CompositeMode::Destination => return dst,
        CompositeMode::Clear => return TRANSPARENT,
        _ => {}
    }

    let (fa, fb) = mode.factors(src[3] as u32, dst[3] as u32);
    let mut out = [0u8; 4];
    for (i, channel) in out.iter_mut().enumerate() {
        let v = (src[i] as u32 * fa + dst[i] as u32 * fb + 127) / 255;
        *channel = v.min(255) as u8;
    }
    Rgba(out)
}

// ============================================================================
// BOUNDED IMAGE – premultiplied pixel grid that sits somewhere on an infinite canvas
// ============================================================================

/// An owned premultiplied RGBA buffer plus the canvas rectangle it occupies.
///
/// The rectangle grows as content is composited in and can be shrunk back to
/// the smallest rectangle holding every non-transparent pixel with
/// [`BoundedImage::auto_crop`]. `bounds.size == pixels.size` always holds.
///
/// `minimally_bounded` is a cached fact: when `true`, every edge row and
/// column holds at least one pixel with alpha > 0 (or the image is empty),
/// so `auto_crop` can skip its scan.
#[derive(Clone, Debug)]
pub struct BoundedImage {
    bounds: IntRect,
    pixels: RgbaImage,
    minimally_bounded: bool,
    modified: bool,
}

impl Default for BoundedImage {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundedImage {
    // ---- construction -------------------------------------------------------

    /// Empty image with no bounds.
    pub fn new() -> Self {
        Self {
            bounds: IntRect::default(),
            pixels: RgbaImage::new(0, 0),
            minimally_bounded: true,
            modified: false,
        }
    }

    /// Fully transparent image covering `rect`.
    pub fn new_transparent(rect: IntRect) -> Self {
        let bounds = Self::canonical(rect);
        Self {
            bounds,
            pixels: Self::blank(bounds),
            minimally_bounded: bounds.is_empty(),
            modified: false,
        }
    }

    /// Image covering `rect`, every pixel set to the premultiplied `color`.
    pub fn new_filled(rect: IntRect, color: Rgba<u8>) -> Self {
        let bounds = Self::canonical(rect);
        let pixels = if bounds.is_empty() {
            RgbaImage::new(0, 0)
        } else {
            RgbaImage::from_pixel(bounds.width as u32, bounds.height as u32, color)
        };
        Self {
            bounds,
            pixels,
            minimally_bounded: bounds.is_empty() || color[3] > 0,
            modified: false,
        }
    }

    /// Wrap an already premultiplied buffer whose top-left sits at `(x, y)`.
    pub fn from_premultiplied(x: i32, y: i32, pixels: RgbaImage) -> Self {
        let (w, h) = pixels.dimensions();
        if w == 0 || h == 0 {
            return Self::new();
        }
        Self {
            bounds: IntRect::new(x, y, w as i32, h as i32),
            pixels,
            minimally_bounded: false,
            modified: false,
        }
    }

    /// Import a straight-alpha image (as decoded from a file) at `(x, y)`.
    /// Premultiplication runs in parallel over pixels.
    pub fn from_straight_rgba(x: i32, y: i32, src: &RgbaImage) -> Self {
        let mut pixels = src.clone();
        let raw: &mut [u8] = &mut pixels;
        raw.par_chunks_mut(4).for_each(|px| {
            let p = premultiply(Rgba([px[0], px[1], px[2], px[3]]));
            px.copy_from_slice(&p.0);
        });
        Self::from_premultiplied(x, y, pixels)
    }

    /// Empty rectangles all collapse to the default rectangle.
    fn canonical(rect: IntRect) -> IntRect {
        let rect = rect.normalized();
        if rect.is_empty() { IntRect::default() } else { rect }
    }

    fn blank(bounds: IntRect) -> RgbaImage {
        if bounds.is_empty() {
            RgbaImage::new(0, 0)
        } else {
            RgbaImage::new(bounds.width as u32, bounds.height as u32)
        }
    }

    // ---- accessors ----------------------------------------------------------

    pub fn bounds(&self) -> IntRect { self.bounds }

    pub fn width(&self) -> i32 { self.bounds.width }

    pub fn height(&self) -> i32 { self.bounds.height }

    pub fn is_empty(&self) -> bool { self.bounds.is_empty() }

    pub fn is_minimally_bounded(&self) -> bool { self.minimally_bounded }

    pub fn is_modified(&self) -> bool { self.modified }

    pub fn set_modified(&mut self, modified: bool) {
        self.modified = modified;
    }

    /// The premultiplied pixel grid, indexed relative to `bounds().top_left()`.
    pub fn as_rgba_image(&self) -> &RgbaImage { &self.pixels }

    /// Caller guarantees every edge row/column holds a non-transparent pixel.
    pub(crate) fn assume_minimal_bounds(&mut self) {
        self.minimally_bounded = true;
    }

    // ---- pixel access -------------------------------------------------------

    #[inline]
    fn local(&self, x: i32, y: i32) -> Option<(u32, u32)> {
        if !self.bounds.contains_point(x, y) {
            return None;
        }
        Some(((x - self.bounds.x) as u32, (y - self.bounds.y) as u32))
    }

    /// Read a premultiplied pixel in canvas coordinates. Outside the bounds
    /// every pixel is transparent.
    #[inline]
    pub fn pixel(&self, x: i32, y: i32) -> Rgba<u8> {
        match self.local(x, y) {
            Some((lx, ly)) => *self.pixels.get_pixel(lx, ly),
            None => TRANSPARENT,
        }
    }

    /// Overwrite a pixel inside the current bounds. Writes outside are
    /// dropped; grow the image first (see [`BoundedImage::draw_pixel`]).
    #[inline]
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Rgba<u8>) {
        if let Some((lx, ly)) = self.local(x, y) {
            self.pixels.put_pixel(lx, ly, color);
            if color[3] == 0 {
                self.minimally_bounded = false;
            }
            self.modified = true;
        }
    }

    /// Source-over a single premultiplied pixel, growing the bounds if needed.
    pub fn draw_pixel(&mut self, x: i32, y: i32, color: Rgba<u8>) {
        self.set_composition_mode_bounds(
            IntRect::new(x, y, 1, 1),
            color[3] > 0,
            CompositeMode::SourceOver,
        );
        if let Some((lx, ly)) = self.local(x, y) {
            let dst = self.pixels.get_pixel_mut(lx, ly);
            *dst = composite_pixel(*dst, color, CompositeMode::SourceOver);
            self.modified = true;
        }
    }

    // ---- bounds management --------------------------------------------------

    /// Reallocate to `new_bounds`, keeping the pixels of the overlapping area.
    fn reallocate(&mut self, new_bounds: IntRect) {
        let mut pixels = Self::blank(new_bounds);
        let overlap = self.bounds.intersect(&new_bounds);
        if !overlap.is_empty() {
            let row_bytes = overlap.width as usize * 4;
            let src_stride = self.bounds.width as usize * 4;
            let dst_stride = new_bounds.width as usize * 4;
            let src_x = (overlap.x - self.bounds.x) as usize * 4;
            let dst_x = (overlap.x - new_bounds.x) as usize * 4;
            let src: &[u8] = &self.pixels;
            let dst: &mut [u8] = &mut pixels;
            for row in 0..overlap.height {
                let sy = (overlap.y - self.bounds.y + row) as usize;
                let dy = (overlap.y - new_bounds.y + row) as usize;
                let s = sy * src_stride + src_x;
                let d = dy * dst_stride + dst_x;
                dst[d..d + row_bytes].copy_from_slice(&src[s..s + row_bytes]);
            }
        }
        self.pixels = pixels;
        self.bounds = new_bounds;
    }

    /// Grow the bounds to include `rect`. Zero-sized extents count as one
    /// pixel. Returns `true` when the buffer was reallocated.
    pub fn extend(&mut self, rect: IntRect) -> bool {
        let mut rect = rect.normalized();
        if rect.width == 0 {
            rect.width = 1;
        }
        if rect.height == 0 {
            rect.height = 1;
        }
        if self.bounds.contains_rect(&rect) {
            return false;
        }
        let new_bounds = self.bounds.union(&rect);
        self.reallocate(new_bounds);
        // The new margin is transparent
        self.minimally_bounded = false;
        self.modified = true;
        true
    }

    /// Move and resize to exactly `new_bounds`. Pixels in the overlap are
    /// kept, everything else becomes transparent.
    pub fn update_bounds(&mut self, new_bounds: IntRect) {
        let new_bounds = Self::canonical(new_bounds);
        if new_bounds == self.bounds {
            return;
        }
        self.reallocate(new_bounds);
        self.minimally_bounded = false;
        self.modified = true;
    }

    /// Resize ahead of compositing a source covering `source_bounds` with
    /// `mode`. Must be called before the pixels are written.
    pub fn set_composition_mode_bounds(
        &mut self,
        source_bounds: IntRect,
        source_is_minimal: bool,
        mode: CompositeMode,
    ) {
        match mode {
            // Result never reaches past the destination
            CompositeMode::Destination | CompositeMode::SourceAtop => {}
            // Result is no larger than the destination but may gain transparent edges
            CompositeMode::SourceIn
            | CompositeMode::DestinationIn
            | CompositeMode::Clear
            | CompositeMode::DestinationOut => {
                self.minimally_bounded = false;
            }
            _ => {
                let minimal = self.minimally_bounded
                    && (source_is_minimal || source_bounds.is_empty())
                    && mode.preserves_edges();
                let union = self.bounds.union(&source_bounds);
                self.update_bounds(union);
                self.minimally_bounded = minimal;
            }
        }
    }

    /// Shrink the bounds to the smallest rectangle containing every pixel
    /// with alpha > 0. Collapses to empty when nothing is left.
    pub fn auto_crop(&mut self) {
        if self.minimally_bounded || self.bounds.is_empty() {
            return;
        }

        let w = self.bounds.width as u32;
        let h = self.bounds.height as u32;
        let pixels = &self.pixels;
        let opaque = |x: u32, y: u32| pixels.get_pixel(x, y)[3] != 0;
        let row_has_content = |y: u32| (0..w).any(|x| opaque(x, y));

        let mut top = 0;
        while top < h && !row_has_content(top) {
            top += 1;
        }
        if top == h {
            self.update_bounds(IntRect::default());
            self.minimally_bounded = true;
            return;
        }

        let mut bottom = h - 1;
        while bottom > top && !row_has_content(bottom) {
            bottom -= 1;
        }

        // Columns only need checking across the rows that survived
        let col_has_content = |x: u32| (top..=bottom).any(|y| opaque(x, y));
        let mut left = 0;
        while left < w - 1 && !col_has_content(left) {
            left += 1;
        }
        let mut right = w - 1;
        while right > left && !col_has_content(right) {
            right -= 1;
        }

        let cropped = IntRect::new(
            self.bounds.x + left as i32,
            self.bounds.y + top as i32,
            (right - left + 1) as i32,
            (bottom - top + 1) as i32,
        );
        self.update_bounds(cropped);
        self.minimally_bounded = true;
    }

    /// Translate without touching pixels.
    pub fn move_top_left(&mut self, x: i32, y: i32) {
        if self.bounds.is_empty() {
            return;
        }
        self.bounds.x = x;
        self.bounds.y = y;
        self.modified = true;
    }

    // ---- drawing --------------------------------------------------------------

    /// Composite `source` onto this image at its canvas position.
    pub fn paste(&mut self, source: &BoundedImage, mode: CompositeMode) {
        if source.bounds.is_empty() {
            return;
        }
        self.set_composition_mode_bounds(source.bounds, source.minimally_bounded, mode);

        let overlap = self.bounds.intersect(&source.bounds);
        if overlap.is_empty() {
            return;
        }

        let dst_stride = self.bounds.width as usize * 4;
        let src_stride = source.bounds.width as usize * 4;
        let first_row = (overlap.y - self.bounds.y) as usize;
        let dst_x = (overlap.x - self.bounds.x) as usize;
        let src_x = (overlap.x - source.bounds.x) as usize;
        let src_y = (overlap.y - source.bounds.y) as usize;
        let span = overlap.width as usize;

        let src_raw: &[u8] = &source.pixels;
        let dst_raw: &mut [u8] = &mut self.pixels;
        dst_raw
            .par_chunks_mut(dst_stride)
            .skip(first_row)
            .take(overlap.height as usize)
            .enumerate()
            .for_each(|(row, dst_row)| {
                let src_row = &src_raw[(src_y + row) * src_stride..(src_y + row + 1) * src_stride];
                for i in 0..span {
                    let d = (dst_x + i) * 4;
                    let s = (src_x + i) * 4;
                    let out = composite_pixel(
                        Rgba([dst_row[d], dst_row[d + 1], dst_row[d + 2], dst_row[d + 3]]),
                        Rgba([src_row[s], src_row[s + 1], src_row[s + 2], src_row[s + 3]]),
                        mode,
                    );
                    dst_row[d..d + 4].copy_from_slice(&out.0);
                }
            });
        self.modified = true;
    }

    /// Composite a solid premultiplied rectangle.
    pub fn fill_rect(&mut self, rect: IntRect, color: Rgba<u8>, mode: CompositeMode) {
        let solid = BoundedImage::new_filled(rect, color);
        self.paste(&solid, mode);
    }

    /// Make every pixel inside `rect` transparent without shrinking the bounds.
    pub fn clear_rect(&mut self, rect: IntRect) {
        self.fill_rect(rect, TRANSPARENT, CompositeMode::Clear);
    }

    /// Drop all content and bounds.
    pub fn clear(&mut self) {
        self.bounds = IntRect::default();
        self.pixels = RgbaImage::new(0, 0);
        self.minimally_bounded = true;
        self.modified = true;
    }

    // ---- export ---------------------------------------------------------------

    /// Straight-alpha copy of the canvas area `rect` (transparent outside the bounds).
    pub fn to_straight_rgba(&self, rect: IntRect) -> RgbaImage {
        let rect = Self::canonical(rect);
        let mut out = Self::blank(rect);
        if rect.is_empty() {
            return out;
        }
        let stride = rect.width as usize * 4;
        let raw: &mut [u8] = &mut out;
        raw.par_chunks_mut(stride).enumerate().for_each(|(row, dst_row)| {
            let y = rect.y + row as i32;
            for (col, px) in dst_row.chunks_exact_mut(4).enumerate() {
                let p = unpremultiply(self.pixel(rect.x + col as i32, y));
                px.copy_from_slice(&p.0);
            }
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    #[test]
    fn rect_union_ignores_empty_operands() {
        let a = IntRect::new(2, 3, 4, 5);
        assert_eq!(a.union(&IntRect::default()), a);
        assert_eq!(IntRect::default().union(&a), a);
        let b = IntRect::new(-1, 0, 2, 2);
        assert_eq!(a.union(&b), IntRect::new(-1, 0, 7, 8));
    }

    #[test]
    fn rect_intersect_and_contains() {
        let a = IntRect::new(0, 0, 10, 10);
        let b = IntRect::new(5, 5, 10, 10);
        assert_eq!(a.intersect(&b), IntRect::new(5, 5, 5, 5));
        assert!(a.intersect(&IntRect::new(20, 20, 1, 1)).is_empty());
        assert!(a.contains_rect(&IntRect::new(0, 0, 10, 10)));
        assert!(!a.contains_rect(&b));
        assert!(!a.contains_rect(&IntRect::default()));
        assert!(a.contains_point(9, 9));
        assert!(!a.contains_point(10, 9));
    }

    #[test]
    fn rect_normalized_flips_negative_extents() {
        let r = IntRect::new(5, 5, -3, -2).normalized();
        assert_eq!(r, IntRect::new(2, 3, 3, 2));
    }

    #[test]
    fn premultiply_roundtrips_opaque_and_half_alpha() {
        assert_eq!(premultiply(RED), RED);
        let half = premultiply(Rgba([200, 100, 0, 128]));
        assert_eq!(half, Rgba([100, 50, 0, 128]));
        let back = unpremultiply(half);
        assert!((back[0] as i32 - 200).abs() <= 2);
        assert!((back[1] as i32 - 100).abs() <= 2);
        assert_eq!(unpremultiply(Rgba([10, 10, 10, 0])), TRANSPARENT);
    }

    #[test]
    fn composite_rules_on_opaque_pixels() {
        assert_eq!(composite_pixel(WHITE, RED, CompositeMode::SourceOver), RED);
        assert_eq!(composite_pixel(WHITE, RED, CompositeMode::DestinationOver), WHITE);
        assert_eq!(composite_pixel(TRANSPARENT, RED, CompositeMode::DestinationOver), RED);
        assert_eq!(composite_pixel(WHITE, RED, CompositeMode::DestinationOut), TRANSPARENT);
        assert_eq!(composite_pixel(WHITE, TRANSPARENT, CompositeMode::DestinationOut), WHITE);
        assert_eq!(composite_pixel(RED, WHITE, CompositeMode::DestinationIn), RED);
        assert_eq!(composite_pixel(RED, TRANSPARENT, CompositeMode::DestinationIn), TRANSPARENT);
        assert_eq!(composite_pixel(WHITE, RED, CompositeMode::Xor), TRANSPARENT);
        assert_eq!(composite_pixel(WHITE, RED, CompositeMode::Clear), TRANSPARENT);
    }

    #[test]
    fn half_transparent_source_over_opaque_stays_opaque() {
        let half_red = premultiply(Rgba([255, 0, 0, 128]));
        let out = composite_pixel(WHITE, half_red, CompositeMode::SourceOver);
        assert_eq!(out[3], 255);
        assert!(out[1] > 100 && out[1] < 140);
    }

    #[test]
    fn extend_keeps_pixels_at_their_canvas_position() {
        let mut img = BoundedImage::new_filled(IntRect::new(0, 0, 2, 2), RED);
        assert!(img.extend(IntRect::new(-2, -1, 1, 1)));
        assert_eq!(img.bounds(), IntRect::new(-2, -1, 4, 3));
        assert_eq!(img.pixel(0, 0), RED);
        assert_eq!(img.pixel(1, 1), RED);
        assert_eq!(img.pixel(-2, -1), TRANSPARENT);
        assert!(!img.is_minimally_bounded());
        assert!(!img.extend(IntRect::new(0, 0, 1, 1)));
    }

    #[test]
    fn extend_treats_zero_size_as_one_pixel() {
        let mut img = BoundedImage::new();
        assert!(img.extend(IntRect::new(3, 4, 0, 0)));
        assert_eq!(img.bounds(), IntRect::new(3, 4, 1, 1));
    }

    #[test]
    fn update_bounds_clears_outside_overlap() {
        let mut img = BoundedImage::new_filled(IntRect::new(0, 0, 4, 4), RED);
        img.update_bounds(IntRect::new(2, 2, 4, 4));
        assert_eq!(img.pixel(2, 2), RED);
        assert_eq!(img.pixel(3, 3), RED);
        assert_eq!(img.pixel(4, 4), TRANSPARENT);
        assert_eq!(img.pixel(1, 1), TRANSPARENT);
        assert!(!img.is_minimally_bounded());
        assert_eq!(img.as_rgba_image().dimensions(), (4, 4));
    }

    #[test]
    fn expanding_near_i32_limits_saturates() {
        let r = IntRect::new(0, 0, 10, 10).expanded(i32::MAX);
        assert_eq!(r.left(), -i32::MAX);
        assert_eq!(r.width, i32::MAX);
        let far = IntRect::new(i32::MAX - 4, 0, 2, 2).expanded(8);
        assert_eq!(far.right(), i32::MAX);
        assert!(!far.is_empty());
    }

    #[test]
    fn composition_bounds_follow_mode_family() {
        let base = BoundedImage::new_filled(IntRect::new(0, 0, 4, 4), RED);
        let source = IntRect::new(2, 2, 4, 4);

        for mode in [CompositeMode::Destination, CompositeMode::SourceAtop] {
            let mut img = base.clone();
            img.set_composition_mode_bounds(source, true, mode);
            assert_eq!(img.bounds(), base.bounds(), "{}", mode.name());
            assert!(img.is_minimally_bounded(), "{}", mode.name());
        }

        let mut loose = base.clone();
        loose.clear_rect(IntRect::new(0, 0, 4, 1));
        loose.set_composition_mode_bounds(source, true, CompositeMode::Destination);
        assert!(!loose.is_minimally_bounded());

        for mode in [
            CompositeMode::SourceIn,
            CompositeMode::DestinationIn,
            CompositeMode::Clear,
            CompositeMode::DestinationOut,
        ] {
            let mut img = base.clone();
            img.set_composition_mode_bounds(source, true, mode);
            assert_eq!(img.bounds(), base.bounds(), "{}", mode.name());
            assert!(!img.is_minimally_bounded(), "{}", mode.name());
        }

        let mut over = base.clone();
        over.set_composition_mode_bounds(source, true, CompositeMode::SourceOver);
        assert_eq!(over.bounds(), IntRect::new(0, 0, 6, 6));
        assert!(over.is_minimally_bounded());

        let mut not_minimal = base.clone();
        not_minimal.set_composition_mode_bounds(source, false, CompositeMode::SourceOver);
        assert!(!not_minimal.is_minimally_bounded());
    }

    #[test]
    fn auto_crop_shrinks_to_content() {
        let mut img = BoundedImage::new_transparent(IntRect::new(0, 0, 10, 10));
        img.fill_rect(IntRect::new(2, 2, 6, 6), WHITE, CompositeMode::SourceOver);
        assert!(!img.is_minimally_bounded());
        img.auto_crop();
        assert_eq!(img.bounds(), IntRect::new(2, 2, 6, 6));
        assert!(img.is_minimally_bounded());
        assert_eq!(img.pixel(2, 2), WHITE);
    }

    #[test]
    fn auto_crop_finds_single_corner_pixels() {
        let mut img = BoundedImage::new_transparent(IntRect::new(-5, -5, 10, 10));
        img.set_pixel(-3, 2, RED);
        img.set_pixel(1, -4, RED);
        img.auto_crop();
        assert_eq!(img.bounds(), IntRect::from_corners(-3, -4, 1, 2));
    }

    #[test]
    fn auto_crop_of_transparent_image_collapses_to_empty() {
        let mut img = BoundedImage::new_transparent(IntRect::new(0, 0, 5, 5));
        img.auto_crop();
        assert!(img.is_empty());
        assert!(img.is_minimally_bounded());
    }

    #[test]
    fn paste_blends_at_translated_offset() {
        let mut dst = BoundedImage::new_filled(IntRect::new(0, 0, 3, 3), WHITE);
        let src = BoundedImage::new_filled(IntRect::new(2, 2, 2, 2), RED);
        dst.paste(&src, CompositeMode::SourceOver);
        assert_eq!(dst.bounds(), IntRect::new(0, 0, 4, 4));
        assert_eq!(dst.pixel(0, 0), WHITE);
        assert_eq!(dst.pixel(2, 2), RED);
        assert_eq!(dst.pixel(3, 3), RED);
        assert_eq!(dst.pixel(3, 0), TRANSPARENT);
        assert!(dst.is_modified());
    }

    #[test]
    fn destination_paste_leaves_pixels_and_bounds() {
        let mut dst = BoundedImage::new_filled(IntRect::new(0, 0, 3, 3), WHITE);
        let src = BoundedImage::new_filled(IntRect::new(1, 1, 4, 4), RED);
        dst.paste(&src, CompositeMode::Destination);
        assert_eq!(dst.bounds(), IntRect::new(0, 0, 3, 3));
        assert!(dst.is_minimally_bounded());
        assert_eq!(dst.pixel(2, 2), WHITE);
        assert_eq!(dst.pixel(3, 3), TRANSPARENT);
    }

    #[test]
    fn destination_out_only_touches_source_rect() {
        let mut dst = BoundedImage::new_filled(IntRect::new(0, 0, 4, 1), WHITE);
        let hole = BoundedImage::new_filled(IntRect::new(1, 0, 2, 1), RED);
        dst.paste(&hole, CompositeMode::DestinationOut);
        assert_eq!(dst.bounds(), IntRect::new(0, 0, 4, 1));
        assert_eq!(dst.pixel(0, 0), WHITE);
        assert_eq!(dst.pixel(1, 0), TRANSPARENT);
        assert_eq!(dst.pixel(2, 0), TRANSPARENT);
        assert_eq!(dst.pixel(3, 0), WHITE);
    }

    #[test]
    fn draw_pixel_grows_bounds() {
        let mut img = BoundedImage::new();
        img.draw_pixel(5, -2, RED);
        img.draw_pixel(7, 0, RED);
        assert_eq!(img.bounds(), IntRect::new(5, -2, 3, 3));
        assert_eq!(img.pixel(7, 0), RED);
        assert_eq!(img.pixel(6, -1), TRANSPARENT);
    }

    #[test]
    fn clear_rect_keeps_bounds_but_drops_minimal_flag() {
        let mut img = BoundedImage::new_filled(IntRect::new(0, 0, 4, 4), RED);
        img.clear_rect(IntRect::new(0, 0, 4, 1));
        assert_eq!(img.bounds(), IntRect::new(0, 0, 4, 4));
        assert!(!img.is_minimally_bounded());
        img.auto_crop();
        assert_eq!(img.bounds(), IntRect::new(0, 1, 4, 3));
    }

    #[test]
    fn straight_export_unpremultiplies_and_pads() {
        let src = RgbaImage::from_pixel(1, 1, Rgba([200, 0, 0, 128]));
        let img = BoundedImage::from_straight_rgba(1, 1, &src);
        let out = img.to_straight_rgba(IntRect::new(0, 0, 3, 3));
        assert_eq!(out.dimensions(), (3, 3));
        assert_eq!(*out.get_pixel(0, 0), TRANSPARENT);
        let p = out.get_pixel(1, 1);
        assert_eq!(p[3], 128);
        assert!((p[0] as i32 - 200).abs() <= 2);
    }
}
