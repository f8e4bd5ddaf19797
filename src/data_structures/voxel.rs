//! Voxel volumes and their precomputed mip chains.
//!
//! A [`VoxelTexture`] is a cubic RGBA8 grid (level 0) plus an ordered sequence
//! of coarser levels. Each level halves every dimension of the previous one
//! (rounded down, never below 1) and stores the alpha-weighted average of the
//! 2x2x2 block it covers.

/// Number of mip levels for a cubic grid of side `grid_length`.
///
/// The count is `log2(grid_length) + 1.5`, truncated. For power-of-two sizes
/// this equals `log2(grid_length) + 1` (64 -> 7); for other sizes the extra
/// half rounds the fractional logarithm to the nearest level count. Every
/// bound on the active mip level derives from this value, so it is kept
/// exactly as is.
pub fn mip_level_count(grid_length: u32) -> u32 {
    ((grid_length.max(1) as f32).log2() + 1.5) as u32
}

/// Longest mip chain a GPU texture of size `dims` can hold, `floor(log2(max)) + 1`.
///
/// Can be smaller than [`mip_level_count`] for sizes that are not a power of
/// two (48 -> 6 against 7). The extra CPU levels are all 1x1x1.
pub fn max_gpu_mip_levels(dims: [u32; 3]) -> u32 {
    let longest = dims.iter().copied().max().unwrap_or(1).max(1);
    32 - longest.leading_zeros()
}

/// One RGBA8 sample. Alpha zero means empty.
pub type Voxel = [u8; 4];

/// A dense 3D grid of voxels, x fastest, then y, then z.
#[derive(Clone, Debug, PartialEq)]
pub struct VoxelGrid {
    dims: [u32; 3],
    voxels: Vec<Voxel>,
}

impl VoxelGrid {
    pub fn new(dims: [u32; 3]) -> Self {
        let dims = dims.map(|d| d.max(1));
        let len = dims.iter().map(|&d| d as usize).product();
        Self {
            dims,
            voxels: vec![[0; 4]; len],
        }
    }

    /// Fill a cubic grid by evaluating `sample` at every voxel centre in `[0, 1]^3`.
    pub fn from_fn(grid_length: u32, mut sample: impl FnMut([f32; 3]) -> Voxel) -> Self {
        let mut grid = Self::new([grid_length; 3]);
        let n = grid.dims;
        for z in 0..n[2] {
            for y in 0..n[1] {
                for x in 0..n[0] {
                    let p = [
                        (x as f32 + 0.5) / n[0] as f32,
                        (y as f32 + 0.5) / n[1] as f32,
                        (z as f32 + 0.5) / n[2] as f32,
                    ];
                    let index = grid.index(x, y, z);
                    grid.voxels[index] = sample(p);
                }
            }
        }
        grid
    }

    pub fn dims(&self) -> [u32; 3] {
        self.dims
    }

    pub fn voxels(&self) -> &[Voxel] {
        &self.voxels
    }

    fn index(&self, x: u32, y: u32, z: u32) -> usize {
        (x + self.dims[0] * (y + self.dims[1] * z)) as usize
    }

    pub fn get(&self, x: u32, y: u32, z: u32) -> Voxel {
        self.voxels[self.index(x, y, z)]
    }

    pub fn set(&mut self, x: u32, y: u32, z: u32, voxel: Voxel) {
        let index = self.index(x, y, z);
        self.voxels[index] = voxel;
    }

    pub fn occupied(&self) -> usize {
        self.voxels.iter().filter(|v| v[3] > 0).count()
    }

    /// Iterate over non-empty voxels as `(x, y, z, voxel)`.
    pub fn iter_occupied(&self) -> impl Iterator<Item = (u32, u32, u32, Voxel)> + '_ {
        let [w, h, _] = self.dims;
        self.voxels
            .iter()
            .enumerate()
            .filter(|(_, v)| v[3] > 0)
            .map(move |(i, v)| {
                let i = i as u32;
                (i % w, (i / w) % h, i / (w * h), *v)
            })
    }

    /// Box-filter this grid into the next coarser level.
    pub fn downsample(&self) -> Self {
        let mut next = Self::new(self.dims.map(|d| (d / 2).max(1)));
        let clamp = |v: u32, d: u32| v.min(d - 1);
        let [nx, ny, nz] = next.dims;
        for z in 0..nz {
            for y in 0..ny {
                for x in 0..nx {
                    let mut rgb = [0u32; 3];
                    let mut alpha = 0u32;
                    for (dx, dy, dz) in CORNERS {
                        let v = self.get(
                            clamp(2 * x + dx, self.dims[0]),
                            clamp(2 * y + dy, self.dims[1]),
                            clamp(2 * z + dz, self.dims[2]),
                        );
                        let a = v[3] as u32;
                        for c in 0..3 {
                            rgb[c] += v[c] as u32 * a;
                        }
                        alpha += a;
                    }
                    let voxel = if alpha == 0 {
                        [0; 4]
                    } else {
                        [
                            (rgb[0] / alpha) as u8,
                            (rgb[1] / alpha) as u8,
                            (rgb[2] / alpha) as u8,
                            // Round up so a single occupied child keeps the parent visible.
                            alpha.div_ceil(8) as u8,
                        ]
                    };
                    next.set(x, y, z, voxel);
                }
            }
        }
        next
    }
}

const CORNERS: [(u32, u32, u32); 8] = [
    (0, 0, 0),
    (1, 0, 0),
    (0, 1, 0),
    (1, 1, 0),
    (0, 0, 1),
    (1, 0, 1),
    (0, 1, 1),
    (1, 1, 1),
];

/// A voxel volume with its full mip chain.
#[derive(Clone, Debug)]
pub struct VoxelTexture {
    id: u64,
    name: String,
    levels: Vec<VoxelGrid>,
}

impl VoxelTexture {
    /// Build `mip_levels` levels (at least one) starting from `base`.
    pub fn new(id: u64, name: &str, base: VoxelGrid, mip_levels: u32) -> Self {
        let mut levels = Vec::with_capacity(mip_levels.max(1) as usize);
        levels.push(base);
        while levels.len() < mip_levels.max(1) as usize {
            let next = levels[levels.len() - 1].downsample();
            levels.push(next);
        }
        Self {
            id,
            name: name.to_string(),
            levels,
        }
    }

    /// Unique per generated volume. Regenerating a preset yields a new id.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mip_level_count(&self) -> u32 {
        self.levels.len() as u32
    }

    /// The grid at `level`, clamped to the coarsest level.
    pub fn level(&self, level: u32) -> &VoxelGrid {
        let last = self.levels.len() - 1;
        &self.levels[(level as usize).min(last)]
    }

    pub fn levels(&self) -> &[VoxelGrid] {
        &self.levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_level_count_uses_the_half_offset() {
        assert_eq!(mip_level_count(64), 7);
        assert_eq!(mip_level_count(1), 1);
        assert_eq!(mip_level_count(2), 2);
        assert_eq!(mip_level_count(32), 6);
        // log2(48) = 5.58, + 1.5 = 7.08
        assert_eq!(mip_level_count(48), 7);
        // log2(40) = 5.32, + 1.5 = 6.82
        assert_eq!(mip_level_count(40), 6);
        assert_eq!(mip_level_count(0), 1);
    }

    #[test]
    fn gpu_chain_stops_at_one_voxel() {
        assert_eq!(max_gpu_mip_levels([64; 3]), 7);
        assert_eq!(max_gpu_mip_levels([48; 3]), 6);
        assert_eq!(max_gpu_mip_levels([1; 3]), 1);
        assert_eq!(max_gpu_mip_levels([0; 3]), 1);

        let base = VoxelGrid::from_fn(48, |_| [255; 4]);
        let texture = VoxelTexture::new(0, "48", base, mip_level_count(48));
        let sides: Vec<u32> = texture.levels().iter().map(|l| l.dims()[0]).collect();
        assert_eq!(sides, vec![48, 24, 12, 6, 3, 1, 1]);
        assert!(max_gpu_mip_levels(texture.level(0).dims()) < texture.mip_level_count());
    }

    #[test]
    fn every_level_halves_down_to_one() {
        let base = VoxelGrid::from_fn(64, |_| [255; 4]);
        let texture = VoxelTexture::new(0, "full", base, mip_level_count(64));
        let sides: Vec<u32> = texture.levels().iter().map(|l| l.dims()[0]).collect();
        assert_eq!(sides, vec![64, 32, 16, 8, 4, 2, 1]);
        assert_eq!(texture.level(100).dims(), [1, 1, 1]);
    }

    #[test]
    fn odd_sizes_round_down() {
        let base = VoxelGrid::from_fn(5, |_| [10, 20, 30, 255]);
        let texture = VoxelTexture::new(0, "odd", base, 4);
        let sides: Vec<u32> = texture.levels().iter().map(|l| l.dims()[0]).collect();
        assert_eq!(sides, vec![5, 2, 1, 1]);
        assert_eq!(texture.level(3).get(0, 0, 0), [10, 20, 30, 255]);
    }

    #[test]
    fn downsampling_weights_colour_by_alpha() {
        let mut grid = VoxelGrid::new([2; 3]);
        grid.set(0, 0, 0, [200, 0, 0, 255]);
        grid.set(1, 1, 1, [0, 0, 100, 255]);
        let coarse = grid.downsample();
        assert_eq!(coarse.dims(), [1; 3]);
        let v = coarse.get(0, 0, 0);
        assert_eq!(v, [100, 0, 50, 64]);
    }

    #[test]
    fn empty_blocks_stay_empty() {
        let grid = VoxelGrid::new([4; 3]);
        assert_eq!(grid.downsample().occupied(), 0);
    }

    #[test]
    fn occupied_iteration_reports_coordinates() {
        let mut grid = VoxelGrid::new([3, 3, 3]);
        grid.set(2, 1, 0, [1, 2, 3, 4]);
        let all: Vec<_> = grid.iter_occupied().collect();
        assert_eq!(all, vec![(2, 1, 0, [1, 2, 3, 4])]);
    }
}
