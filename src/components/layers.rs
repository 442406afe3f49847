use std::collections::BTreeMap;

use crate::canvas::{BoundedImage, CompositeMode, IntRect};

// ============================================================================
// LAYER KINDS
// ============================================================================

/// What a layer holds. Only bitmap layers carry pixels this crate can paint
/// into or sample from; the other kinds are owned by collaborators elsewhere
/// and are skipped when flattening.
#[derive(Clone, Debug)]
pub enum LayerKind {
    /// Keyframe number → image shown from that frame on.
    Bitmap(BTreeMap<i32, BoundedImage>),
    Vector,
    Camera,
    Sound,
}

impl LayerKind {
    /// Can a bucket fill read from and write into this layer?
    pub fn is_paintable_bitmap(&self) -> bool {
        matches!(self, LayerKind::Bitmap(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            LayerKind::Bitmap(_) => "bitmap",
            LayerKind::Vector => "vector",
            LayerKind::Camera => "camera",
            LayerKind::Sound => "sound",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Layer {
    pub name: String,
    pub visible: bool,
    pub kind: LayerKind,
}

impl Layer {
    pub fn new(name: String, kind: LayerKind) -> Self {
        Self {
            name,
            visible: true,
            kind,
        }
    }

    /// A bitmap layer with no keyframes yet.
    pub fn new_bitmap(name: String) -> Self {
        Self::new(name, LayerKind::Bitmap(BTreeMap::new()))
    }

    pub fn is_paintable_bitmap(&self) -> bool {
        self.kind.is_paintable_bitmap()
    }

    /// Place `image` as the keyframe at `frame`. Returns `false` (and drops
    /// the image) for non-bitmap layers.
    pub fn set_keyframe(&mut self, frame: i32, image: BoundedImage) -> bool {
        match &mut self.kind {
            LayerKind::Bitmap(frames) => {
                frames.insert(frame, image);
                true
            }
            _ => false,
        }
    }

    pub fn keyframe_count(&self) -> usize {
        match &self.kind {
            LayerKind::Bitmap(frames) => frames.len(),
            _ => 0,
        }
    }

    /// The image on screen at `frame`: the last keyframe at or before it.
    pub fn last_bitmap_at(&self, frame: i32) -> Option<&BoundedImage> {
        match &self.kind {
            LayerKind::Bitmap(frames) => frames.range(..=frame).next_back().map(|(_, img)| img),
            _ => None,
        }
    }

    pub fn last_bitmap_at_mut(&mut self, frame: i32) -> Option<&mut BoundedImage> {
        match &mut self.kind {
            LayerKind::Bitmap(frames) => frames.range_mut(..=frame).next_back().map(|(_, img)| img),
            _ => None,
        }
    }
}

// ============================================================================
// LAYER STACK
// ============================================================================

/// Ordered layers (index 0 is the bottom) sharing one canvas rectangle.
/// The canvas rectangle is the largest region a fill is expected to cover.
#[derive(Clone, Debug)]
pub struct LayerStack {
    canvas: IntRect,
    pub layers: Vec<Layer>,
}

impl LayerStack {
    pub fn new(canvas: IntRect) -> Self {
        Self {
            canvas,
            layers: Vec::new(),
        }
    }

    pub fn canvas(&self) -> IntRect {
        self.canvas
    }

    /// Append a layer on top and return its index.
    pub fn push(&mut self, layer: Layer) -> usize {
        self.layers.push(layer);
        self.layers.len() - 1
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn layer_mut(&mut self, index: usize) -> Option<&mut Layer> {
        self.layers.get_mut(index)
    }

    pub fn bitmap_at(&self, layer_index: usize, frame: i32) -> Option<&BoundedImage> {
        self.layers.get(layer_index)?.last_bitmap_at(frame)
    }

    pub fn bitmap_at_mut(&mut self, layer_index: usize, frame: i32) -> Option<&mut BoundedImage> {
        self.layers.get_mut(layer_index)?.last_bitmap_at_mut(frame)
    }

    /// Source-over every visible bitmap layer's image at `frame`, bottom to
    /// top, onto a blank canvas-sized buffer.
    pub fn flatten_visible_bitmaps(&self, frame: i32) -> BoundedImage {
        let mut flat = BoundedImage::new_transparent(self.canvas);
        for layer in self.layers.iter().filter(|l| l.visible) {
            if let Some(img) = layer.last_bitmap_at(frame) {
                flat.paste(img, CompositeMode::SourceOver);
            }
        }
        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    #[test]
    fn only_bitmap_layers_are_paintable() {
        assert!(Layer::new_bitmap("ink".to_string()).is_paintable_bitmap());
        for kind in [LayerKind::Vector, LayerKind::Camera, LayerKind::Sound] {
            let mut layer = Layer::new(kind.name().to_string(), kind);
            assert!(!layer.is_paintable_bitmap());
            assert!(!layer.set_keyframe(1, BoundedImage::new()));
            assert!(layer.last_bitmap_at(1).is_none());
        }
    }

    #[test]
    fn keyframe_lookup_holds_until_next_key() {
        let mut layer = Layer::new_bitmap("ink".to_string());
        layer.set_keyframe(1, BoundedImage::new_filled(IntRect::new(0, 0, 1, 1), RED));
        layer.set_keyframe(5, BoundedImage::new_filled(IntRect::new(0, 0, 1, 1), BLUE));
        assert!(layer.last_bitmap_at(0).is_none());
        assert_eq!(layer.last_bitmap_at(1).map(|i| i.pixel(0, 0)), Some(RED));
        assert_eq!(layer.last_bitmap_at(4).map(|i| i.pixel(0, 0)), Some(RED));
        assert_eq!(layer.last_bitmap_at(9).map(|i| i.pixel(0, 0)), Some(BLUE));
        assert_eq!(layer.keyframe_count(), 2);
    }

    #[test]
    fn flatten_composites_visible_layers_in_order() {
        let mut stack = LayerStack::new(IntRect::new(0, 0, 4, 4));
        let mut bottom = Layer::new_bitmap("bottom".to_string());
        bottom.set_keyframe(1, BoundedImage::new_filled(IntRect::new(0, 0, 2, 2), RED));
        let mut top = Layer::new_bitmap("top".to_string());
        top.set_keyframe(1, BoundedImage::new_filled(IntRect::new(1, 1, 2, 2), BLUE));
        let mut hidden = Layer::new_bitmap("hidden".to_string());
        hidden.set_keyframe(1, BoundedImage::new_filled(IntRect::new(0, 0, 4, 4), RED));
        hidden.visible = false;
        stack.push(bottom);
        stack.push(top);
        stack.push(hidden);
        stack.push(Layer::new("camera".to_string(), LayerKind::Camera));

        let flat = stack.flatten_visible_bitmaps(1);
        assert_eq!(flat.bounds(), IntRect::new(0, 0, 4, 4));
        assert_eq!(flat.pixel(0, 0), RED);
        assert_eq!(flat.pixel(1, 1), BLUE);
        assert_eq!(flat.pixel(3, 3), Rgba([0, 0, 0, 0]));
    }
}
