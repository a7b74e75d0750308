pub mod bounds;
pub mod quadtree;
