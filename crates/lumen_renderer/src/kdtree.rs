//! Axis-aligned k-d tree over stored photons.
//!
//! Leaves hold up to [`MAX_PHOTONS_PER_LEAF`] photons. An overfull leaf
//! splits at the midpoint of its longest axis. Queries collect every photon
//! inside an axis-aligned box.

use lumen_math::Aabb;

use crate::photon::Photon;

/// Photons a leaf may hold before it splits.
const MAX_PHOTONS_PER_LEAF: usize = 10;

/// Leaves at this depth never split (guards against coincident photons).
const MAX_DEPTH: usize = 32;

/// k-d tree node.
#[derive(Debug, Clone)]
pub enum KdTree {
    /// Bucket of photons.
    Leaf { bounds: Aabb, photons: Vec<Photon> },
    /// Split on `axis` at `split`; children[0] holds coordinates below it.
    Branch {
        bounds: Aabb,
        axis: usize,
        split: f32,
        children: Box<[KdTree; 2]>,
    },
}

impl KdTree {
    /// Create an empty tree covering `bounds`.
    pub fn new(bounds: Aabb) -> Self {
        KdTree::Leaf {
            bounds,
            photons: Vec::new(),
        }
    }

    pub fn bounds(&self) -> &Aabb {
        match self {
            KdTree::Leaf { bounds, .. } | KdTree::Branch { bounds, .. } => bounds,
        }
    }

    /// Insert a photon. Returns false if it lies outside the tree bounds.
    pub fn add_photon(&mut self, photon: Photon) -> bool {
        if !self.bounds().contains(photon.position) {
            return false;
        }
        self.insert(photon, 0);
        true
    }

    fn insert(&mut self, photon: Photon, depth: usize) {
        let needs_split = match self {
            KdTree::Branch {
                axis,
                split,
                children,
                ..
            } => {
                let side = usize::from(photon.position[*axis] >= *split);
                children[side].insert(photon, depth + 1);
                return;
            }
            KdTree::Leaf { photons, .. } => {
                photons.push(photon);
                photons.len() > MAX_PHOTONS_PER_LEAF && depth < MAX_DEPTH
            }
        };

        if needs_split {
            self.split_leaf();
        }
    }

    fn split_leaf(&mut self) {
        let KdTree::Leaf { bounds, photons } = self else {
            return;
        };
        let bounds = *bounds;
        let photons = std::mem::take(photons);

        let axis = bounds.longest_axis();
        let split = bounds.centroid()[axis];
        let (lower, upper) = bounds.split(axis, split);

        let (below, above): (Vec<Photon>, Vec<Photon>) =
            photons.into_iter().partition(|p| p.position[axis] < split);

        *self = KdTree::Branch {
            bounds,
            axis,
            split,
            children: Box::new([
                KdTree::Leaf {
                    bounds: lower,
                    photons: below,
                },
                KdTree::Leaf {
                    bounds: upper,
                    photons: above,
                },
            ]),
        };
    }

    /// Append every photon inside `query` to `out`.
    pub fn collect_photons_in_box(&self, query: &Aabb, out: &mut Vec<Photon>) {
        if !self.bounds().overlaps(query) {
            return;
        }
        match self {
            KdTree::Leaf { photons, .. } => {
                out.extend(photons.iter().filter(|p| query.contains(p.position)));
            }
            KdTree::Branch { children, .. } => {
                children[0].collect_photons_in_box(query, out);
                children[1].collect_photons_in_box(query, out);
            }
        }
    }

    /// Total number of stored photons.
    pub fn len(&self) -> usize {
        match self {
            KdTree::Leaf { photons, .. } => photons.len(),
            KdTree::Branch { children, .. } => children[0].len() + children[1].len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_leaves(&self) -> usize {
        match self {
            KdTree::Leaf { .. } => 1,
            KdTree::Branch { children, .. } => children[0].num_leaves() + children[1].num_leaves(),
        }
    }

    /// Depth of the deepest leaf (a lone leaf has depth 0).
    pub fn depth(&self) -> usize {
        match self {
            KdTree::Leaf { .. } => 0,
            KdTree::Branch { children, .. } => 1 + children[0].depth().max(children[1].depth()),
        }
    }
}
