pub mod tree;

pub use tree::{FileTree, TreeError, TreeNode};
