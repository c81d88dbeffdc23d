/// A pixel coordinate in the (resampled) frame grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PixelCoord {
    pub row: u32,
    pub col: u32,
}

/// Uniformly random permutation of every coordinate of a `width x height` grid.
///
/// Each coordinate appears exactly once.
pub fn visit_order(width: u32, height: u32, rng: &mut fastrand::Rng) -> Vec<PixelCoord> {
    let mut order = Vec::with_capacity(width as usize * height as usize);
    for row in 0..height {
        for col in 0..width {
            order.push(PixelCoord { row, col });
        }
    }
    rng.shuffle(&mut order);
    order
}
