use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// 檔案樹操作錯誤。 / File-tree errors.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),
    #[error("cannot read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// 檔案樹中的一個節點：名稱、絕對路徑、目錄旗標與子節點。 / One node of the file tree:
/// name, absolute path, directory flag, and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    name: String,
    path: PathBuf,
    is_dir: bool,
    children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    pub fn children(&self) -> &[TreeNode] {
        &self.children
    }
}

/// 以某個根目錄為基礎的即時快照樹。 / A point-in-time snapshot tree rooted at one
/// directory.
///
/// 整棵樹在設定根目錄時一次建立完成；沒有檔案系統監看，直到下次重建前都可能過時。 /
/// The whole tree is built eagerly when the root is set; there is no filesystem
/// watching, so the snapshot is stale until the next rebuild.
#[derive(Debug, Clone)]
pub struct FileTree {
    root: TreeNode,
}

impl FileTree {
    /// 建立以 `root` 為根的完整樹。 / Builds the full tree rooted at `root`.
    pub fn build(root: impl AsRef<Path>) -> Result<Self, TreeError> {
        Ok(Self {
            root: read_node(root.as_ref())?,
        })
    }

    /// 更換根目錄並重建整棵樹；失敗時保留原有的樹。 / Replaces the root and rebuilds the
    /// whole tree; the previous tree is kept when the rebuild fails.
    pub fn set_root(&mut self, root: impl AsRef<Path>) -> Result<(), TreeError> {
        self.root = read_node(root.as_ref())?;
        Ok(())
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    /// 根目錄的絕對路徑。 / Absolute path of the current root.
    pub fn root_path(&self) -> &Path {
        &self.root.path
    }
}

fn read_node(root: &Path) -> Result<TreeNode, TreeError> {
    let metadata = fs::metadata(root).map_err(|source| TreeError::ReadDir {
        path: root.to_path_buf(),
        source,
    })?;
    if !metadata.is_dir() {
        return Err(TreeError::NotADirectory(root.to_path_buf()));
    }

    let name = root
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string());

    Ok(TreeNode {
        name,
        path: root.to_path_buf(),
        is_dir: true,
        children: read_children(root)?,
    })
}

fn read_children(dir: &Path) -> Result<Vec<TreeNode>, TreeError> {
    let entries = fs::read_dir(dir).map_err(|source| TreeError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut children = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        // 符號連結一律當作葉節點，避免循環遞迴。 / Symlinks are always treated as
        // leaves so that link cycles cannot recurse forever.
        let is_dir = file_type.is_dir() && !file_type.is_symlink();
        let grandchildren = if is_dir {
            // 無法讀取的子目錄顯示為空目錄。 / Unreadable subdirectories show as empty.
            read_children(&path).unwrap_or_default()
        } else {
            Vec::new()
        };
        children.push(TreeNode {
            name,
            path,
            is_dir,
            children: grandchildren,
        });
    }

    children.sort_by(|a, b| {
        b.is_dir
            .cmp(&a.is_dir)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    Ok(children)
}
