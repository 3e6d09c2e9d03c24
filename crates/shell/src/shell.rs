use std::path::{Path, PathBuf};

use quillpad_core::{Document, DocumentError, Encoding};
use quillpad_highlight::{shared_registry, LanguageRegistry};
use thiserror::Error;

use crate::json;
use crate::tabs::TabRegistry;

/// 編輯器外殼層的錯誤。 / Errors surfaced at the editor-shell boundary.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("invalid JSON: {0}")]
    JsonParse(#[from] serde_json::Error),
}

/// 關閉已修改分頁時的三擇一回應。 / The three-way answer to the dirty-close prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavePrompt {
    Save,
    Discard,
    Cancel,
}

/// 儲存流程的結果；使用者取消路徑選擇不算錯誤。 / Result of the save workflow; the user
/// cancelling the path prompt is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Saved,
    Cancelled,
}

/// 關閉流程的結果。 / Result of the close workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// 使用者取消，分頁原封不動。 / The user cancelled; the tab is untouched.
    Cancelled,
    Closed,
    /// 儲存失敗或被放棄，但分頁仍然移除。 / The save failed or was abandoned, yet the
    /// tab was still removed.
    ClosedUnsaved,
}

/// 跳行操作要求主端套用的游標位置。 / Caret position the host should apply for go-to-line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaretTarget {
    /// 以 0 起算的行號。 / Zero-based line index.
    pub line: usize,
    pub column: usize,
}

/// 主 UI 需提供的互動式對話框。 / Modal dialogs the host UI must provide.
///
/// 外殼層透過這個縫隙觸發所有互動，讓工作流程能以腳本化替身測試。 / Every interactive
/// step goes through this seam so the workflows can be tested with scripted doubles.
pub trait DialogService {
    fn confirm_save(&mut self, title: &str) -> SavePrompt;
    fn pick_open_path(&mut self) -> Option<PathBuf>;
    fn pick_save_path(&mut self) -> Option<PathBuf>;
    fn pick_root_directory(&mut self) -> Option<PathBuf>;
    fn warn(&mut self, title: &str, message: &str);
}

/// 編輯器的單一擁有者：分頁集合、作用中索引與語言表。 / Single owner of the editor
/// state: the tab registry, the active index, and the language table.
pub struct EditorShell {
    tabs: TabRegistry,
    languages: &'static LanguageRegistry,
}

impl EditorShell {
    pub fn new() -> Self {
        Self {
            tabs: TabRegistry::new(),
            languages: shared_registry(),
        }
    }

    pub fn tabs(&self) -> &TabRegistry {
        &self.tabs
    }

    pub fn languages(&self) -> &'static LanguageRegistry {
        self.languages
    }

    pub fn activate(&mut self, index: usize) {
        self.tabs.activate(index);
    }

    pub fn new_tab(&mut self) -> usize {
        self.tabs.push_untitled()
    }

    /// 作用中文件的目前內容。 / Contents of the active document.
    pub fn active_text(&self) -> &str {
        self.tabs.active_tab().document().contents()
    }

    pub fn active_encoding(&self) -> Encoding {
        self.tabs.active_tab().document().encoding()
    }

    pub fn active_line_count(&self) -> usize {
        self.tabs.active_tab().document().line_count()
    }

    /// 經由開檔對話框開啟文件；錯誤以警告對話框回報。 / Opens a document through the
    /// open-file dialog; failures are reported through the warning dialog.
    pub fn open_via_dialog(&mut self, dialogs: &mut dyn DialogService) -> Option<usize> {
        let path = dialogs.pick_open_path()?;
        match self.open_or_focus(&path) {
            Ok(index) => Some(index),
            Err(err) => {
                dialogs.warn("无法打开文件", &err.to_string());
                None
            }
        }
    }

    /// 開啟路徑；若已開啟則只切換到該分頁。 / Opens a path, or just activates the
    /// existing tab when the path is already open.
    pub fn open_or_focus(&mut self, path: &Path) -> Result<usize, ShellError> {
        let resolved = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if let Some(index) = self.tabs.find_by_path(&resolved) {
            self.tabs.activate(index);
            return Ok(index);
        }

        let document = Document::open(&resolved)?;
        let title = base_name(&resolved);
        let language_id = self.language_id_for(&resolved);
        Ok(self.tabs.push_document(document, resolved, title, language_id))
    }

    /// 儲存指定分頁；無路徑的文件會先詢問存檔位置。 / Saves one tab; pathless documents
    /// prompt for a destination first.
    pub fn save_tab(
        &mut self,
        index: usize,
        dialogs: &mut dyn DialogService,
    ) -> Result<SaveStatus, ShellError> {
        if self.tabs.tab(index).document().path().is_some() {
            self.tabs.tab_mut(index).document_mut().save()?;
            self.tabs.strip_dirty_marker(index);
            return Ok(SaveStatus::Saved);
        }

        let Some(path) = dialogs.pick_save_path() else {
            return Ok(SaveStatus::Cancelled);
        };
        self.tabs.tab_mut(index).document_mut().save_as(&path)?;

        // 另存新檔後更新標題，並依新副檔名重新選擇語言。 / After save-as, refresh the
        // title and re-resolve the language for the new extension.
        let resolved = path.canonicalize().unwrap_or(path);
        self.tabs.retitle(index, base_name(&resolved));
        let language_id = self.language_id_for(&resolved);
        self.tabs.set_language(index, language_id);
        self.tabs.set_resolved_path(index, resolved);
        Ok(SaveStatus::Saved)
    }

    pub fn save_active(
        &mut self,
        dialogs: &mut dyn DialogService,
    ) -> Result<SaveStatus, ShellError> {
        self.save_tab(self.tabs.active_index(), dialogs)
    }

    /// 關閉分頁：已修改的內容先詢問儲存/放棄/取消。 / Closes a tab, asking
    /// save/discard/cancel for dirty contents first.
    ///
    /// 儲存失敗或被放棄時分頁仍會移除，但結果會標示為未儲存。 / A failed or abandoned
    /// save still removes the tab, flagged through the returned outcome.
    pub fn close_tab(&mut self, index: usize, dialogs: &mut dyn DialogService) -> CloseOutcome {
        let mut outcome = CloseOutcome::Closed;
        if self.tabs.tab(index).document().is_dirty() {
            match dialogs.confirm_save(self.tabs.tab(index).title()) {
                SavePrompt::Cancel => return CloseOutcome::Cancelled,
                SavePrompt::Discard => {}
                SavePrompt::Save => match self.save_tab(index, dialogs) {
                    Ok(SaveStatus::Saved) => {}
                    Ok(SaveStatus::Cancelled) => outcome = CloseOutcome::ClosedUnsaved,
                    Err(err) => {
                        dialogs.warn("无法保存文件", &err.to_string());
                        outcome = CloseOutcome::ClosedUnsaved;
                    }
                },
            }
        }
        self.tabs.remove(index);
        outcome
    }

    /// 鏡像元件的文字變更通知。 / Mirrors a text-change notification from the widget.
    pub fn handle_text_changed(&mut self, index: usize, text: impl Into<String>) {
        self.tabs.handle_text_changed(index, text);
    }

    /// 變更指定分頁的編碼。 / Changes the encoding of one tab.
    ///
    /// 有後備檔案時會以新編碼重新讀取磁碟內容並捨棄未儲存編輯。 / With a backing file
    /// the buffer is re-read from disk under the new encoding, discarding edits.
    pub fn change_encoding(&mut self, index: usize, encoding: Encoding) -> Result<(), ShellError> {
        self.tabs.tab_mut(index).document_mut().reinterpret(encoding)?;
        if !self.tabs.tab(index).document().is_dirty() {
            self.tabs.strip_dirty_marker(index);
        }
        Ok(())
    }

    /// 計算跳行的游標目標；行號已由輸入介面限制在 `[1, 總行數]`。 / Maps a go-to-line
    /// request to a caret target; the line is already clamped to `[1, total]` by the
    /// input surface.
    pub fn goto_line(&self, line: usize) -> CaretTarget {
        debug_assert!(line >= 1, "line numbers are 1-based");
        CaretTarget {
            line: line.saturating_sub(1),
            column: 0,
        }
    }

    /// 將作用中緩衝區重排為四空格縮排的 JSON。 / Reformats the active buffer as
    /// four-space-indented JSON.
    ///
    /// 解析失敗時緩衝區保持原狀。 / The buffer is left untouched when parsing fails.
    pub fn format_json_active(&mut self) -> Result<(), ShellError> {
        let index = self.tabs.active_index();
        let formatted = json::format_json(self.tabs.tab(index).document().contents())?;
        self.tabs.handle_text_changed(index, formatted);
        Ok(())
    }

    fn language_id_for(&self, path: &Path) -> Option<String> {
        self.languages
            .language_for_path(path)
            .map(|language| language.id().as_ref().to_string())
    }
}

impl Default for EditorShell {
    fn default() -> Self {
        Self::new()
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
