use crate::ops::grid::{FillMask, Grid};

/// Largest dilation radius a fill will apply. Larger requests are clamped.
pub const MAX_EXPAND: u32 = 1024;

/// Grow every set cell of `mask` outward by `expand` pixels (Manhattan
/// distance), staying inside the mask's own bounds.
///
/// Grassfire transform in two raster sweeps: forward relaxes each cell from
/// its upper and left neighbours, backward from its lower and right ones.
/// A cell is marked as soon as its distance drops to `expand` or below.
pub fn expand_mask(mask: &mut FillMask, expand: u32) {
    if expand == 0 {
        return;
    }
    let b = mask.bounds();
    if b.is_empty() {
        return;
    }

    let far = (b.width + b.height) as u32;
    let mut dist: Grid<u32> = Grid::new(b, far);
    for y in b.top()..b.bottom() {
        for x in b.left()..b.right() {
            if mask.is_set(x, y) {
                dist.set(x, y, 0);
            }
        }
    }

    // Forward sweep
    for y in b.top()..b.bottom() {
        for x in b.left()..b.right() {
            let mut d = dist.get(x, y).unwrap_or(far);
            if let Some(up) = dist.get(x, y - 1) {
                d = d.min(up + 1);
            }
            if let Some(left) = dist.get(x - 1, y) {
                d = d.min(left + 1);
            }
            dist.set(x, y, d);
            if d <= expand {
                mask.set(x, y, true);
            }
        }
    }

    // Backward sweep
    for y in (b.top()..b.bottom()).rev() {
        for x in (b.left()..b.right()).rev() {
            let mut d = dist.get(x, y).unwrap_or(far);
            if let Some(down) = dist.get(x, y + 1) {
                d = d.min(down + 1);
            }
            if let Some(right) = dist.get(x + 1, y) {
                d = d.min(right + 1);
            }
            dist.set(x, y, d);
            if d <= expand {
                mask.set(x, y, true);
            }
        }
    }
}
