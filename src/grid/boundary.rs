//! Interior-pixel arena with Neumann-reflected neighbor links.
//!
//! Every pixel of the mask gets a position in a row-major enumeration. For
//! each one the positions of its four axis neighbors are stored; a neighbor
//! that falls outside the grid or outside the mask is replaced by the pixel
//! itself, which gives a zero-flux (null Neumann) boundary to any stencil
//! evaluated over the arena.

use nalgebra::Vector3;

use crate::types::{Grid, Mask, NormalField};

/// One of the four axis directions. `Up`/`Down` move along rows (axis 0),
/// `Left`/`Right` along columns (axis 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    #[inline]
    fn offset(self) -> (isize, isize) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }
}

/// Arena positions of the four neighbors of an interior pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbors {
    pub up: usize,
    pub down: usize,
    pub left: usize,
    pub right: usize,
}

impl Neighbors {
    #[inline]
    pub fn get(&self, dir: Direction) -> usize {
        match dir {
            Direction::Up => self.up,
            Direction::Down => self.down,
            Direction::Left => self.left,
            Direction::Right => self.right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteriorPixel {
    pub row: usize,
    pub col: usize,
    /// Row-major linear index `row * ncols + col` in the full grid.
    pub linear: usize,
    pub neighbors: Neighbors,
}

impl InteriorPixel {
    /// Neighbors that really lie inside the mask, i.e. were not clipped to
    /// `self_position`.
    pub fn true_neighbors(
        &self,
        self_position: usize,
    ) -> impl Iterator<Item = (Direction, usize)> + '_ {
        Direction::ALL
            .into_iter()
            .map(move |d| (d, self.neighbors.get(d)))
            .filter(move |&(_, k)| k != self_position)
    }
}

/// Arena of mask pixels in row-major order plus the reverse map.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryIndex {
    shape: (usize, usize),
    pixels: Vec<InteriorPixel>,
    /// `position[row * ncols + col]`, `None` outside the mask.
    position: Vec<Option<usize>>,
}

impl BoundaryIndex {
    /// Build the arena for `mask`. An empty mask gives an empty arena.
    pub fn from_mask(mask: &Mask) -> Self {
        let (nrows, ncols) = mask.shape();

        let mut position = vec![None; nrows * ncols];
        let mut coords = Vec::new();
        for row in 0..nrows {
            for col in 0..ncols {
                if mask[(row, col)] {
                    position[row * ncols + col] = Some(coords.len());
                    coords.push((row, col));
                }
            }
        }

        let lookup = |row: usize, col: usize, dir: Direction| -> Option<usize> {
            let (dr, dc) = dir.offset();
            let r = row as isize + dr;
            let c = col as isize + dc;
            if r >= 0 && c >= 0 && (r as usize) < nrows && (c as usize) < ncols {
                position[r as usize * ncols + c as usize]
            } else {
                None
            }
        };

        let pixels = coords
            .iter()
            .enumerate()
            .map(|(k, &(row, col))| {
                let nb = |dir| lookup(row, col, dir).unwrap_or(k);
                InteriorPixel {
                    row,
                    col,
                    linear: row * ncols + col,
                    neighbors: Neighbors {
                        up: nb(Direction::Up),
                        down: nb(Direction::Down),
                        left: nb(Direction::Left),
                        right: nb(Direction::Right),
                    },
                }
            })
            .collect();

        Self {
            shape: (nrows, ncols),
            pixels,
            position,
        }
    }

    /// Shape of the mask the arena was built from.
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn pixels(&self) -> &[InteriorPixel] {
        &self.pixels
    }

    #[inline]
    pub fn pixel(&self, k: usize) -> &InteriorPixel {
        &self.pixels[k]
    }

    /// Arena position of `(row, col)`, `None` outside the mask or the grid.
    pub fn position(&self, row: usize, col: usize) -> Option<usize> {
        let (nrows, ncols) = self.shape;
        if row >= nrows || col >= ncols {
            return None;
        }
        self.position[row * ncols + col]
    }

    /// `(first, last)` corners of the domain bounding box.
    pub fn bounding_box(&self) -> Option<((usize, usize), (usize, usize))> {
        let first = self.pixels.first()?;
        let mut min = (first.row, first.col);
        let mut max = min;
        for px in &self.pixels {
            min = (min.0.min(px.row), min.1.min(px.col));
            max = (max.0.max(px.row), max.1.max(px.col));
        }
        Some((min, max))
    }

    /// Values of `grid` at the arena pixels.
    pub fn gather(&self, grid: &Grid) -> Vec<f64> {
        self.pixels.iter().map(|px| grid[(px.row, px.col)]).collect()
    }

    pub fn gather_field(&self, field: &NormalField) -> Vec<Vector3<f64>> {
        self.pixels
            .iter()
            .map(|px| field.get(px.row, px.col))
            .collect()
    }

    /// Full-size grid holding `values` at arena pixels and `fill` elsewhere.
    pub fn scatter(&self, values: &[f64], fill: f64) -> Grid {
        let (nrows, ncols) = self.shape;
        let mut grid = Grid::from_element(nrows, ncols, fill);
        for (px, &v) in self.pixels.iter().zip(values) {
            grid[(px.row, px.col)] = v;
        }
        grid
    }

    /// Overwrite the arena pixels of `field` with `values`.
    pub fn scatter_field(&self, values: &[Vector3<f64>], field: &mut NormalField) {
        for (px, v) in self.pixels.iter().zip(values) {
            field.set(px.row, px.col, *v);
        }
    }
}
