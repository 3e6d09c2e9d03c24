use std::path::{Path, PathBuf};

use quillpad_core::Document;

/// 新分頁的預設標題。 / Default title for a fresh tab.
pub const UNTITLED_TITLE: &str = "未命名";

const DIRTY_MARKER: char = '*';

/// 一個文件與其 UI 分頁的配對。 / One Document paired with its UI tab.
#[derive(Debug, Clone)]
pub struct Tab {
    document: Document,
    title: String,
    language_id: Option<String>,
    // 供去重比對使用的正規化路徑。 / Canonicalised path used for duplicate detection.
    resolved_path: Option<PathBuf>,
}

impl Tab {
    fn untitled() -> Self {
        Self {
            document: Document::new(),
            title: UNTITLED_TITLE.to_string(),
            language_id: None,
            resolved_path: None,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// 分頁的語言識別子；`None` 代表純文字。 / Language id of the tab; `None` means plain text.
    pub fn language_id(&self) -> Option<&str> {
        self.language_id.as_deref()
    }

    pub fn resolved_path(&self) -> Option<&Path> {
        self.resolved_path.as_deref()
    }
}

/// 依序排列的開啟文件集合。 / Ordered collection of the open documents.
///
/// 不變式：同一個解析後路徑最多註冊一次；集合內隨時至少有一個分頁；作用中索引永遠
/// 指向存在的分頁。 / Invariants: at most one tab per resolved path, at least one tab
/// at all times, and the active index always addresses a live tab.
#[derive(Debug)]
pub struct TabRegistry {
    tabs: Vec<Tab>,
    active: usize,
}

impl TabRegistry {
    /// 建立只含一個空白分頁的集合。 / Creates a registry holding one fresh empty tab.
    pub fn new() -> Self {
        Self {
            tabs: vec![Tab::untitled()],
            active: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tab> {
        self.tabs.iter()
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn activate(&mut self, index: usize) {
        debug_assert!(index < self.tabs.len(), "tab index out of bounds");
        if index < self.tabs.len() {
            self.active = index;
        }
    }

    pub fn tab(&self, index: usize) -> &Tab {
        &self.tabs[index]
    }

    pub fn tab_mut(&mut self, index: usize) -> &mut Tab {
        &mut self.tabs[index]
    }

    pub fn active_tab(&self) -> &Tab {
        &self.tabs[self.active]
    }

    pub fn active_tab_mut(&mut self) -> &mut Tab {
        &mut self.tabs[self.active]
    }

    /// 新增一個空白分頁並切換過去。 / Appends a fresh empty tab and activates it.
    pub fn push_untitled(&mut self) -> usize {
        self.tabs.push(Tab::untitled());
        self.active = self.tabs.len() - 1;
        self.active
    }

    /// 註冊一份載入完成的文件並切換過去。 / Registers a freshly loaded document and
    /// activates its tab.
    pub fn push_document(
        &mut self,
        document: Document,
        resolved_path: PathBuf,
        title: impl Into<String>,
        language_id: Option<String>,
    ) -> usize {
        debug_assert!(
            self.find_by_path(&resolved_path).is_none(),
            "path already registered"
        );
        self.tabs.push(Tab {
            document,
            title: title.into(),
            language_id,
            resolved_path: Some(resolved_path),
        });
        self.active = self.tabs.len() - 1;
        self.active
    }

    pub fn find_by_path(&self, resolved: &Path) -> Option<usize> {
        self.tabs
            .iter()
            .position(|tab| tab.resolved_path.as_deref() == Some(resolved))
    }

    /// 鏡像最新的緩衝區文字；首次變更時在標題前加上一次修改記號。 / Mirrors the latest
    /// widget text; the first change while clean prepends the dirty marker once.
    pub fn handle_text_changed(&mut self, index: usize, text: impl Into<String>) {
        let tab = &mut self.tabs[index];
        let was_dirty = tab.document.is_dirty();
        tab.document.set_contents(text.into());
        if !was_dirty && !tab.title.starts_with(DIRTY_MARKER) {
            tab.title.insert(0, DIRTY_MARKER);
        }
    }

    /// 以乾淨標題重新命名分頁（移除任何修改記號）。 / Renames the tab with a clean title,
    /// dropping any dirty marker.
    pub fn retitle(&mut self, index: usize, title: impl Into<String>) {
        self.tabs[index].title = title.into();
    }

    pub fn set_language(&mut self, index: usize, language_id: Option<String>) {
        self.tabs[index].language_id = language_id;
    }

    pub fn set_resolved_path(&mut self, index: usize, resolved: PathBuf) {
        self.tabs[index].resolved_path = Some(resolved);
    }

    /// 移除標題開頭的修改記號（若存在）。 / Strips the leading dirty marker, if present.
    pub fn strip_dirty_marker(&mut self, index: usize) {
        let tab = &mut self.tabs[index];
        if let Some(stripped) = tab.title.strip_prefix(DIRTY_MARKER) {
            tab.title = stripped.to_string();
        }
    }

    /// 移除一個分頁；移除僅存的分頁前會先補上空白分頁。 / Removes a tab; removing the
    /// sole remaining tab first appends a fresh empty one.
    pub fn remove(&mut self, index: usize) {
        debug_assert!(index < self.tabs.len(), "tab index out of bounds");
        if index >= self.tabs.len() {
            return;
        }
        if self.tabs.len() == 1 {
            self.tabs.push(Tab::untitled());
        }
        self.tabs.remove(index);
        if index < self.active {
            self.active -= 1;
        } else {
            self.active = self.active.min(self.tabs.len() - 1);
        }
    }
}

impl Default for TabRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_one_untitled_tab() {
        let registry = TabRegistry::new();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.active_tab().title(), UNTITLED_TITLE);
        assert!(!registry.active_tab().document().is_dirty());
    }

    #[test]
    fn dirty_marker_is_added_exactly_once() {
        let mut registry = TabRegistry::new();
        registry.handle_text_changed(0, "a");
        assert_eq!(registry.tab(0).title(), "*未命名");
        registry.handle_text_changed(0, "ab");
        registry.handle_text_changed(0, "abc");
        assert_eq!(registry.tab(0).title(), "*未命名");
    }

    #[test]
    fn strip_dirty_marker_restores_the_title() {
        let mut registry = TabRegistry::new();
        registry.handle_text_changed(0, "draft");
        registry.strip_dirty_marker(0);
        assert_eq!(registry.tab(0).title(), UNTITLED_TITLE);
        // 再次呼叫不會誤刪標題字元。 / A second call must not eat title characters.
        registry.strip_dirty_marker(0);
        assert_eq!(registry.tab(0).title(), UNTITLED_TITLE);
    }

    #[test]
    fn removing_the_sole_tab_leaves_a_fresh_one() {
        let mut registry = TabRegistry::new();
        registry.handle_text_changed(0, "about to go away");
        registry.remove(0);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.active_index(), 0);
        assert_eq!(registry.active_tab().title(), UNTITLED_TITLE);
        assert!(registry.active_tab().document().contents().is_empty());
    }

    #[test]
    fn removing_before_the_active_tab_shifts_the_index() {
        let mut registry = TabRegistry::new();
        registry.push_untitled();
        registry.push_untitled();
        registry.activate(2);
        registry.remove(0);
        assert_eq!(registry.active_index(), 1);
        registry.remove(1);
        assert_eq!(registry.active_index(), 0);
    }

    #[test]
    fn find_by_path_matches_registered_documents() {
        let mut registry = TabRegistry::new();
        let path = PathBuf::from("/tmp/a.txt");
        registry.push_document(Document::new(), path.clone(), "a.txt", None);
        assert_eq!(registry.find_by_path(&path), Some(1));
        assert_eq!(registry.find_by_path(Path::new("/tmp/b.txt")), None);
    }
}
