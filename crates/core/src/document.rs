use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::encoding::{self, Encoding};

/// 文件載入或儲存時可能發生的錯誤。 / Errors that can occur while loading or saving a document.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("no candidate encoding can decode the file")]
    Undecodable,
    #[error("text cannot be represented in target encoding {0}")]
    Unrepresentable(&'static str),
}

/// 一個已開啟檔案的記憶體模型：路徑、內容、編碼與修改旗標。 / In-memory model of one
/// open file: path, contents, encoding, and the dirty flag.
///
/// 執行期間由 UI 元件持有權威文字；Document 只在存取磁碟時鏡像它。 / At runtime the UI
/// widget owns the authoritative text; the Document mirrors it for disk access.
#[derive(Debug, Clone)]
pub struct Document {
    path: Option<PathBuf>,
    contents: String,
    encoding: Encoding,
    is_dirty: bool,
}

impl Document {
    /// 建立一個空內容且尚未儲存的文件。 / Creates an unsaved document with empty contents.
    pub fn new() -> Self {
        Self {
            path: None,
            contents: String::new(),
            encoding: Encoding::Utf8,
            is_dirty: false,
        }
    }

    /// 從磁碟載入文件，依候選順序偵測編碼。 / Loads a document from disk, detecting the
    /// encoding through the ordered candidate list.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path_ref = path.as_ref();
        let (contents, encoding) = encoding::read_text(path_ref)?;
        Ok(Self {
            path: Some(path_ref.to_path_buf()),
            contents,
            encoding,
            is_dirty: false,
        })
    }

    /// 取得目前文件內容。 / Returns the current document contents.
    pub fn contents(&self) -> &str {
        &self.contents
    }

    /// 以新文字取代記憶體內容並標記文件為已修改。 / Replaces the in-memory contents,
    /// marking the document as dirty.
    pub fn set_contents(&mut self, text: impl Into<String>) {
        self.contents = text.into();
        self.is_dirty = true;
    }

    /// 目前的行數，空文件視為一行。 / Total line count; an empty document counts as one line.
    pub fn line_count(&self) -> usize {
        self.contents.lines().count().max(1)
    }

    /// 取得目前文件編碼。 / Returns the current document encoding.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// 僅更新記錄的編碼，不碰磁碟；下次儲存時生效（轉碼）。 / Updates only the recorded
    /// encoding without touching disk; it takes effect on the next save (transcoding).
    pub fn set_encoding(&mut self, encoding: Encoding) {
        if self.encoding != encoding {
            self.encoding = encoding;
            self.is_dirty = true;
        }
    }

    /// 判斷文件是否仍有未儲存變更。 / Returns whether the document has unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    /// 取得文件所屬的檔案路徑（若存在）。 / Retrieves the associated path if the document
    /// is linked to one.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// 將文件儲存至現有路徑；若尚未指定路徑則失敗。 / Saves the document to its current
    /// path; fails if no path is set.
    pub fn save(&mut self) -> Result<(), DocumentError> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "document has no associated path"))?
            .to_path_buf();
        self.save_as(path)
    }

    /// 將文件另存為新路徑並清除修改旗標。 / Saves the document to a new path and clears
    /// the dirty flag.
    pub fn save_as(&mut self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        let path_ref = path.as_ref();
        let encoded = encoding::encode(&self.contents, self.encoding)?;

        // 先寫入暫存檔再重新命名，避免出現部分寫入的情況。 / Use a temporary file plus
        // rename to guard against partial writes.
        let tmp_path = path_ref.with_extension("tmp_quillpad");
        {
            let mut tmp_file = File::create(&tmp_path)?;
            tmp_file.write_all(&encoded)?;
            tmp_file.sync_all()?;
        }
        fs::rename(&tmp_path, path_ref)?;

        self.path = Some(path_ref.to_path_buf());
        self.is_dirty = false;
        Ok(())
    }

    /// 以新編碼重新詮釋文件。 / Reinterprets the document under a new encoding.
    ///
    /// 有後備路徑時從磁碟以新編碼重新讀取，捨棄未儲存的編輯並清除修改旗標；無路徑時
    /// 僅更新記錄的編碼供下次儲存使用。 / With a backing path the file is re-read from
    /// disk strictly under the new encoding, discarding unsaved edits and clearing the
    /// dirty flag; without one only the recorded encoding changes, for the next save.
    pub fn reinterpret(&mut self, encoding: Encoding) -> Result<(), DocumentError> {
        match self.path.as_ref().filter(|path| path.exists()) {
            Some(path) => {
                let bytes = fs::read(path)?;
                self.contents = encoding::decode_with(&bytes, encoding)?;
                self.encoding = encoding;
                self.is_dirty = false;
            }
            None => {
                self.encoding = encoding;
            }
        }
        Ok(())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::GBK;

    #[test]
    fn open_detects_utf8_and_starts_clean() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("sample.txt");
        fs::write(&file_path, "line1\nline2\n").unwrap();

        let doc = Document::open(&file_path).unwrap();
        assert_eq!(doc.contents(), "line1\nline2\n");
        assert_eq!(doc.encoding(), Encoding::Utf8);
        assert!(!doc.is_dirty());
        assert_eq!(doc.path(), Some(file_path.as_path()));
    }

    #[test]
    fn open_detects_gbk() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("gbk.txt");
        let (encoded, _, _) = GBK.encode("中文测试");
        fs::write(&file_path, encoded.as_ref()).unwrap();

        let doc = Document::open(&file_path).unwrap();
        assert_eq!(doc.contents(), "中文测试");
        assert_eq!(doc.encoding(), Encoding::Gbk);
    }

    #[test]
    fn set_contents_marks_dirty_and_save_clears_it() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("notes.txt");

        let mut doc = Document::new();
        doc.set_contents("first draft");
        assert!(doc.is_dirty());

        doc.save_as(&file_path).unwrap();
        assert!(!doc.is_dirty());
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "first draft");
    }

    #[test]
    fn save_without_path_is_an_io_error() {
        let mut doc = Document::new();
        doc.set_contents("unsaved");
        let err = doc.save().unwrap_err();
        assert!(matches!(err, DocumentError::Io(_)));
    }

    #[test]
    fn save_round_trips_every_encodable_candidate() {
        let dir = tempfile::tempdir().unwrap();
        for (encoding, text) in [
            (Encoding::Utf8, "汉字 mixed ascii\n"),
            (Encoding::Gbk, "简体中文\n"),
            (Encoding::Gb2312, "中文文本\n"),
            (Encoding::Latin1, "café au lait\n"),
        ] {
            let file_path = dir.path().join(format!("{}.txt", encoding.name()));
            let mut doc = Document::new();
            doc.set_contents(text);
            doc.reinterpret(encoding).unwrap();
            doc.save_as(&file_path).unwrap();

            let reloaded = Document::open(&file_path).unwrap();
            assert_eq!(reloaded.contents(), text, "{encoding} round trip");
        }
    }

    #[test]
    fn save_rejects_unrepresentable_characters() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("latin1.txt");

        let mut doc = Document::new();
        doc.set_contents("漢");
        doc.reinterpret(Encoding::Latin1).unwrap();
        let err = doc.save_as(&file_path).unwrap_err();
        assert!(matches!(err, DocumentError::Unrepresentable("iso-8859-1")));
        // 失敗的儲存不可留下暫存檔。 / A failed save must not leave a temp file behind.
        assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn atomic_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("atomic.txt");

        let mut doc = Document::new();
        doc.set_contents("payload");
        doc.save_as(&file_path).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["atomic.txt".to_string()]);
    }

    #[test]
    fn reinterpret_rereads_disk_and_discards_edits() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("reinterpret.txt");
        let (encoded, _, _) = GBK.encode("磁盘内容");
        fs::write(&file_path, encoded.as_ref()).unwrap();

        // GBK 位元組被當成 Latin1 讀入後，重新詮釋應還原中文。 / Read as Latin1 first,
        // the GBK bytes come back once reinterpreted.
        let mut doc = Document::open(&file_path).unwrap();
        assert_eq!(doc.encoding(), Encoding::Gbk);
        doc.reinterpret(Encoding::Latin1).unwrap();
        assert_ne!(doc.contents(), "磁盘内容");

        doc.set_contents("这些编辑将被丢弃");
        doc.reinterpret(Encoding::Gbk).unwrap();
        assert_eq!(doc.contents(), "磁盘内容");
        assert!(!doc.is_dirty());
    }

    #[test]
    fn reinterpret_without_path_only_records_encoding() {
        let mut doc = Document::new();
        doc.set_contents("缓冲区文字");
        doc.reinterpret(Encoding::Gbk).unwrap();
        assert_eq!(doc.encoding(), Encoding::Gbk);
        assert_eq!(doc.contents(), "缓冲区文字");
        assert!(doc.is_dirty());
    }

    #[test]
    fn reinterpret_with_undecodable_encoding_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("utf8.txt");
        fs::write(&file_path, "中文".as_bytes()).unwrap();

        let mut doc = Document::open(&file_path).unwrap();
        // 單一 0xFF 不是合法的 GBK 序列。 / A lone 0xFF is not a valid GBK sequence.
        fs::write(&file_path, [0xFFu8]).unwrap();
        let err = doc.reinterpret(Encoding::Gbk).unwrap_err();
        assert!(matches!(err, DocumentError::Undecodable));
    }

    #[test]
    fn line_count_treats_empty_as_one_line() {
        let mut doc = Document::new();
        assert_eq!(doc.line_count(), 1);
        doc.set_contents("a\nb\nc");
        assert_eq!(doc.line_count(), 3);
    }
}
