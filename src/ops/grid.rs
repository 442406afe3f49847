use crate::canvas::IntRect;

/// Owned 2D buffer laid over a canvas rectangle. All access goes through
/// canvas coordinates and is bounds-checked; reads outside return `None`.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid<T> {
    bounds: IntRect,
    cells: Vec<T>,
}

impl<T: Copy> Grid<T> {
    pub fn new(bounds: IntRect, fill: T) -> Self {
        let bounds = if bounds.is_empty() { IntRect::default() } else { bounds };
        Self {
            bounds,
            cells: vec![fill; bounds.area()],
        }
    }

    pub fn bounds(&self) -> IntRect {
        self.bounds
    }

    #[inline(always)]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if !self.bounds.contains_point(x, y) {
            return None;
        }
        let col = (x - self.bounds.x) as usize;
        let row = (y - self.bounds.y) as usize;
        Some(row * self.bounds.width as usize + col)
    }

    #[inline]
    pub fn get(&self, x: i32, y: i32) -> Option<T> {
        self.index(x, y).map(|i| self.cells[i])
    }

    /// Write a cell. Returns `false` when `(x, y)` lies outside the grid.
    #[inline]
    pub fn set(&mut self, x: i32, y: i32, value: T) -> bool {
        match self.index(x, y) {
            Some(i) => {
                self.cells[i] = value;
                true
            }
            None => false,
        }
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> &[T] {
        &self.cells
    }
}

/// Per-pixel "filled" flags over a fill's search rectangle.
pub type FillMask = Grid<bool>;

impl Grid<bool> {
    #[inline]
    pub fn is_set(&self, x: i32, y: i32) -> bool {
        self.get(x, y).unwrap_or(false)
    }

    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Smallest rectangle holding every set cell (empty when none are set).
    pub fn tight_bounds(&self) -> IntRect {
        let w = self.bounds.width.max(0) as usize;
        let mut corners: Option<(i32, i32, i32, i32)> = None;
        for (i, _) in self.cells.iter().enumerate().filter(|(_, c)| **c) {
            let x = self.bounds.x + (i % w) as i32;
            let y = self.bounds.y + (i / w) as i32;
            corners = Some(match corners {
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                None => (x, y, x, y),
            });
        }
        corners
            .map(|(x0, y0, x1, y1)| IntRect::from_corners(x0, y0, x1, y1))
            .unwrap_or_default()
    }

    /// `true` when every cell set in `other` is also set here.
    pub fn covers(&self, other: &FillMask) -> bool {
        let b = other.bounds;
        (b.top()..b.bottom())
            .all(|y| (b.left()..b.right()).all(|x| !other.is_set(x, y) || self.is_set(x, y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_is_in_canvas_coordinates() {
        let mut grid = Grid::new(IntRect::new(-2, 3, 4, 2), 0u32);
        assert!(grid.set(-2, 3, 7));
        assert!(grid.set(1, 4, 9));
        assert!(!grid.set(2, 4, 1));
        assert_eq!(grid.get(-2, 3), Some(7));
        assert_eq!(grid.get(1, 4), Some(9));
        assert_eq!(grid.get(-3, 3), None);
        assert_eq!(grid.cells().len(), 8);
    }

    #[test]
    fn mask_tight_bounds_and_cover() {
        let mut mask = FillMask::new(IntRect::new(0, 0, 6, 6), false);
        assert!(mask.tight_bounds().is_empty());
        mask.set(1, 4, true);
        mask.set(3, 2, true);
        assert_eq!(mask.tight_bounds(), IntRect::new(1, 2, 3, 3));
        assert_eq!(mask.count(), 2);

        let mut bigger = mask.clone();
        bigger.set(5, 5, true);
        assert!(bigger.covers(&mask));
        assert!(!mask.covers(&bigger));
    }
}
