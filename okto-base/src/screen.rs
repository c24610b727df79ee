use std::fmt::{Debug, Write};

/// The 64x32 monochrome framebuffer.
///
/// One byte per pixel (0 or 1), row major. The dirty flag is raised whenever
/// a draw touches at least one pixel and stays up until the rendering side
/// clears it after consuming a frame.
#[derive(PartialEq, Eq, Clone)]
pub struct Screen {
    pixels: [u8; Self::WIDTH as usize * Self::HEIGHT as usize],
    dirty: bool,
}

impl Screen {
    /// Screen width in pixels.
    pub const WIDTH: u8 = 64;
    /// Screen height in pixels.
    pub const HEIGHT: u8 = 32;

    /// The pixel grid, row major, `0` or `1` per cell.
    pub const fn pixels(&self) -> &[u8; Self::WIDTH as usize * Self::HEIGHT as usize] {
        &self.pixels
    }

    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Lower the dirty flag. Called by whoever consumed the current frame.
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Raise the dirty flag without drawing.
    /// Only used for the clear-screen quirk.
    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Zero every pixel. Does not touch the dirty flag by itself:
    /// only sprite draws follow the dirty convention.
    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// XOR-draw a sprite whose rows are the given bytes, MSB-first.
    ///
    /// The starting coordinates are wrapped into the screen; rows and columns
    /// that then run past the right or bottom edge are clipped, not wrapped.
    ///
    /// Returns `true` if any set pixel was turned off (a collision).
    pub fn draw_sprite(&mut self, x: u8, y: u8, rows: &[u8]) -> bool {
        let x = (x % Self::WIDTH) as usize;
        let y = (y % Self::HEIGHT) as usize;
        let mut collision = false;

        for (i, row) in rows.iter().copied().enumerate() {
            if y + i >= Self::HEIGHT as usize {
                break;
            }
            for j in 0..8 {
                if x + j >= Self::WIDTH as usize {
                    break;
                }
                if row & (0x80 >> j) == 0 {
                    continue;
                }
                let pixel = &mut self.pixels[(x + j) + (y + i) * Self::WIDTH as usize];
                if *pixel == 1 {
                    collision = true;
                }
                *pixel ^= 1;
                self.dirty = true;
            }
        }

        collision
    }
}

impl Default for Screen {
    fn default() -> Self {
        Self {
            pixels: [0; Self::WIDTH as usize * Self::HEIGHT as usize],
            dirty: false,
        }
    }
}

impl Debug for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if f.alternate() {
            writeln!(f, "Screen(dirty: {},", self.dirty)?;
            for c in self.pixels.chunks_exact(Self::WIDTH as usize).flat_map(|row| {
                row.iter()
                    .copied()
                    .map(|pixel| if pixel > 0 { '#' } else { '_' })
                    .chain(['\n'])
            }) {
                f.write_char(c)?;
            }
            write!(f, ")")
        } else {
            f.debug_struct("Screen")
                .field("pixels", &&self.pixels[..])
                .field("dirty", &self.dirty)
                .finish()
        }
    }
}
