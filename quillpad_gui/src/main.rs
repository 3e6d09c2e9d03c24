use std::fs;
use std::path::PathBuf;

use eframe::{egui, App, Frame, NativeOptions};
use egui::text::LayoutJob;
use egui::{Color32, FontData, FontDefinitions, FontFamily, TextFormat};
use quillpad_core::{Encoding, CANDIDATES};
use quillpad_highlight::{HighlightKind, LanguageDefinition};
use quillpad_project::{FileTree, TreeNode};
use quillpad_shell::{DialogService, EditorShell, SavePrompt, ShellError};

const APP_TITLE: &str = "高级文本编辑器";

/// 以 rfd 原生對話框實作外殼層的對話縫隙。 / Native implementation of the shell's
/// dialog seam, backed by rfd.
struct NativeDialogs;

impl DialogService for NativeDialogs {
    fn confirm_save(&mut self, title: &str) -> SavePrompt {
        let answer = rfd::MessageDialog::new()
            .set_title("保存修改")
            .set_description(format!("文件 {title} 已被修改，是否保存？"))
            .set_level(rfd::MessageLevel::Warning)
            .set_buttons(rfd::MessageButtons::YesNoCancel)
            .show();
        match answer {
            rfd::MessageDialogResult::Yes => SavePrompt::Save,
            rfd::MessageDialogResult::No => SavePrompt::Discard,
            _ => SavePrompt::Cancel,
        }
    }

    fn pick_open_path(&mut self) -> Option<PathBuf> {
        rfd::FileDialog::new().set_title("打开文件").pick_file()
    }

    fn pick_save_path(&mut self) -> Option<PathBuf> {
        rfd::FileDialog::new().set_title("保存文件").save_file()
    }

    fn pick_root_directory(&mut self) -> Option<PathBuf> {
        rfd::FileDialog::new().set_title("选择根目录").pick_folder()
    }

    fn warn(&mut self, title: &str, message: &str) {
        rfd::MessageDialog::new()
            .set_title(title)
            .set_description(message)
            .set_level(rfd::MessageLevel::Warning)
            .set_buttons(rfd::MessageButtons::Ok)
            .show();
    }
}

#[derive(Debug)]
enum TreeAction {
    Open(PathBuf),
    SetRoot(PathBuf),
    ChangeRoot,
}

#[derive(Debug, Clone, Copy)]
enum TabAction {
    Activate(usize),
    Close(usize),
}

struct StatusState {
    line: usize,
    column: usize,
    line_chars: usize,
}

impl Default for StatusState {
    fn default() -> Self {
        Self {
            line: 1,
            column: 1,
            line_chars: 0,
        }
    }
}

struct QuillPadApp {
    shell: EditorShell,
    tree: Option<FileTree>,
    dialogs: NativeDialogs,
    status: StatusState,
    pending_scroll_line: Option<usize>,
    show_goto_window: bool,
    goto_value: usize,
    fonts_installed: bool,
}

impl Default for QuillPadApp {
    fn default() -> Self {
        // 與原始程式相同：啟動時以目前工作目錄作為檔案樹的根。 / Like the original, the
        // tree starts rooted at the current working directory.
        let tree = std::env::current_dir()
            .ok()
            .and_then(|cwd| FileTree::build(&cwd).ok());
        Self {
            shell: EditorShell::new(),
            tree,
            dialogs: NativeDialogs,
            status: StatusState::default(),
            pending_scroll_line: None,
            show_goto_window: false,
            goto_value: 1,
            fonts_installed: false,
        }
    }
}

impl App for QuillPadApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.ensure_fonts(ctx);
        self.handle_shortcuts(ctx);

        self.show_menu_bar(ctx);
        self.show_toolbar(ctx);
        self.show_status_bar(ctx);
        self.show_tree_panel(ctx);
        self.show_editor_area(ctx);
        self.render_goto_window(ctx);
    }
}

impl QuillPadApp {
    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        let new_file = egui::KeyboardShortcut::new(egui::Modifiers::CTRL, egui::Key::N);
        let open_file = egui::KeyboardShortcut::new(egui::Modifiers::CTRL, egui::Key::O);
        let save_file = egui::KeyboardShortcut::new(egui::Modifiers::CTRL, egui::Key::S);
        let goto_line = egui::KeyboardShortcut::new(egui::Modifiers::CTRL, egui::Key::G);
        let format_json =
            egui::KeyboardShortcut::new(egui::Modifiers::CTRL.plus(egui::Modifiers::SHIFT), egui::Key::J);

        if ctx.input_mut(|input| input.consume_shortcut(&new_file)) {
            self.action_new();
        }
        if ctx.input_mut(|input| input.consume_shortcut(&open_file)) {
            self.action_open();
        }
        if ctx.input_mut(|input| input.consume_shortcut(&save_file)) {
            self.action_save();
        }
        if ctx.input_mut(|input| input.consume_shortcut(&goto_line)) {
            self.action_goto();
        }
        if ctx.input_mut(|input| input.consume_shortcut(&format_json)) {
            self.action_format_json();
        }
    }

    fn action_new(&mut self) {
        self.shell.new_tab();
    }

    fn action_open(&mut self) {
        self.shell.open_via_dialog(&mut self.dialogs);
    }

    fn action_save(&mut self) {
        let index = self.shell.tabs().active_index();
        if let Err(err) = self.shell.save_tab(index, &mut self.dialogs) {
            self.dialogs.warn("错误", &format!("无法保存文件：{err}"));
        }
    }

    fn action_goto(&mut self) {
        self.goto_value = self.status.line.max(1);
        self.show_goto_window = true;
    }

    fn action_format_json(&mut self) {
        match self.shell.format_json_active() {
            Ok(()) => {}
            Err(err @ ShellError::JsonParse(_)) => {
                self.dialogs
                    .warn("JSON格式错误", &format!("无法格式化JSON：{err}"));
            }
            Err(err) => {
                self.dialogs
                    .warn("错误", &format!("格式化过程中发生错误：{err}"));
            }
        }
    }

    fn show_menu_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu_bar")
            .resizable(false)
            .show(ctx, |ui| {
                egui::menu::bar(ui, |ui| {
                    ui.menu_button("文件", |ui| {
                        if ui.button("新建").clicked() {
                            self.action_new();
                            ui.close_menu();
                        }
                        if ui.button("打开").clicked() {
                            self.action_open();
                            ui.close_menu();
                        }
                        if ui.button("保存").clicked() {
                            self.action_save();
                            ui.close_menu();
                        }
                    });
                    ui.menu_button("编辑", |ui| {
                        if ui.button("跳转到行").clicked() {
                            self.action_goto();
                            ui.close_menu();
                        }
                    });
                    ui.menu_button("格式化", |ui| {
                        if ui.button("格式化JSON").clicked() {
                            self.action_format_json();
                            ui.close_menu();
                        }
                    });
                });
            });
    }

    fn show_toolbar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("toolbar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    if ui.button("新建").clicked() {
                        self.action_new();
                    }
                    if ui.button("打开").clicked() {
                        self.action_open();
                    }
                    if ui.button("保存").clicked() {
                        self.action_save();
                    }
                });
            });
    }

    fn show_status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(format!("行: {}, 列: {}", self.status.line, self.status.column));
                    ui.separator();
                    ui.label(format!("字符数: {}", self.status.line_chars));
                    ui.separator();
                    let language = self
                        .shell
                        .tabs()
                        .active_tab()
                        .language_id()
                        .and_then(|id| self.shell.languages().get(id))
                        .map(|definition| definition.display_name().to_string())
                        .unwrap_or_else(|| "Plain Text".to_string());
                    ui.label(language);
                    ui.separator();

                    let current = self.shell.active_encoding();
                    ui.menu_button(format!("编码: {}", current.name().to_uppercase()), |ui| {
                        for candidate in CANDIDATES {
                            let selected = candidate == current;
                            let label = candidate.name().to_uppercase();
                            if ui.selectable_label(selected, label).clicked() {
                                self.change_active_encoding(candidate);
                                ui.close_menu();
                            }
                        }
                    });
                });
            });
    }

    fn change_active_encoding(&mut self, encoding: Encoding) {
        let index = self.shell.tabs().active_index();
        if let Err(err) = self.shell.change_encoding(index, encoding) {
            self.dialogs.warn(
                "错误",
                &format!("无法使用 {} 编码读取文件：{err}", encoding.name()),
            );
        }
    }

    fn show_tree_panel(&mut self, ctx: &egui::Context) {
        let mut actions: Vec<TreeAction> = Vec::new();
        egui::SidePanel::left("file_tree")
            .default_width(220.0)
            .resizable(true)
            .show(ctx, |ui| {
                ui.heading("文件");
                ui.separator();
                egui::ScrollArea::vertical().show(ui, |ui| match &self.tree {
                    Some(tree) => render_tree_node(ui, tree.root(), true, &mut actions),
                    None => {
                        if ui.button("更改根目录...").clicked() {
                            actions.push(TreeAction::ChangeRoot);
                        }
                    }
                });
            });
        self.apply_tree_actions(actions);
    }

    fn apply_tree_actions(&mut self, actions: Vec<TreeAction>) {
        for action in actions {
            match action {
                TreeAction::Open(path) => {
                    if let Err(err) = self.shell.open_or_focus(&path) {
                        self.dialogs.warn("错误", &format!("无法打开文件：{err}"));
                    }
                }
                TreeAction::SetRoot(path) => self.set_tree_root(path),
                TreeAction::ChangeRoot => {
                    if let Some(path) = self.dialogs.pick_root_directory() {
                        self.set_tree_root(path);
                    }
                }
            }
        }
    }

    fn set_tree_root(&mut self, path: PathBuf) {
        // 重建失敗時保留原有的樹。 / The previous tree stays in place when the rebuild fails.
        match FileTree::build(&path) {
            Ok(tree) => self.tree = Some(tree),
            Err(err) => self.dialogs.warn("错误", &format!("无法读取目录：{err}")),
        }
    }

    fn show_editor_area(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            self.render_tab_strip(ui);
            ui.separator();
            self.render_editor(ui);
        });
    }

    fn render_tab_strip(&mut self, ui: &mut egui::Ui) {
        let active = self.shell.tabs().active_index();
        let titles: Vec<String> = self
            .shell
            .tabs()
            .iter()
            .map(|tab| tab.title().to_string())
            .collect();

        let mut action: Option<TabAction> = None;
        egui::ScrollArea::horizontal().show(ui, |ui| {
            ui.horizontal(|ui| {
                for (index, title) in titles.iter().enumerate() {
                    if ui.selectable_label(index == active, title).clicked() {
                        action = Some(TabAction::Activate(index));
                    }
                    let close = egui::Button::new(egui::RichText::new("✕").small()).frame(false);
                    if ui.add(close).on_hover_text("关闭标签页").clicked() {
                        action = Some(TabAction::Close(index));
                    }
                    ui.add_space(6.0);
                }
            });
        });

        match action {
            Some(TabAction::Activate(index)) => self.shell.activate(index),
            Some(TabAction::Close(index)) => {
                self.shell.close_tab(index, &mut self.dialogs);
            }
            None => {}
        }
    }

    fn render_editor(&mut self, ui: &mut egui::Ui) {
        let active = self.shell.tabs().active_index();
        let mut buffer = self.shell.active_text().to_owned();
        let language = self
            .shell
            .tabs()
            .active_tab()
            .language_id()
            .and_then(|id| self.shell.languages().get(id));

        let mut scroll = egui::ScrollArea::vertical().auto_shrink([false, false]);
        if let Some(line) = self.pending_scroll_line.take() {
            let row_height = ui.text_style_height(&egui::TextStyle::Monospace);
            scroll = scroll.vertical_scroll_offset(line as f32 * row_height);
        }

        scroll.show(ui, |ui| {
            let mut layouter = |ui: &egui::Ui, text: &str, wrap_width: f32| {
                let mut job = highlight_layout_job(ui, language, text);
                job.wrap.max_width = wrap_width;
                ui.fonts(|fonts| fonts.layout_job(job))
            };

            let output = egui::TextEdit::multiline(&mut buffer)
                .id(egui::Id::new(("editor", active)))
                .font(egui::TextStyle::Monospace)
                .desired_rows(24)
                .desired_width(f32::INFINITY)
                .layouter(&mut layouter)
                .show(ui);

            if let Some(range) = output.cursor_range {
                let cursor = range.primary.pcursor;
                self.status.line = cursor.paragraph + 1;
                self.status.column = cursor.offset + 1;
            }
            if output.response.changed() {
                self.shell.handle_text_changed(active, buffer.clone());
            }
        });

        self.status.line_chars = self
            .shell
            .active_text()
            .lines()
            .nth(self.status.line.saturating_sub(1))
            .map(|line| line.chars().count())
            .unwrap_or(0);
    }

    fn render_goto_window(&mut self, ctx: &egui::Context) {
        if !self.show_goto_window {
            return;
        }
        let total = self.shell.active_line_count();
        self.goto_value = self.goto_value.clamp(1, total);

        egui::Window::new("跳转到行")
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(format!("输入行号 (1-{total}):"));
                    ui.add(egui::DragValue::new(&mut self.goto_value).clamp_range(1..=total));
                });
                ui.horizontal(|ui| {
                    if ui.button("确定").clicked() {
                        let target = self.shell.goto_line(self.goto_value);
                        self.pending_scroll_line = Some(target.line);
                        self.show_goto_window = false;
                    }
                    if ui.button("取消").clicked() {
                        self.show_goto_window = false;
                    }
                });
            });
    }

    // 載入一個中日韓字型作為後備，否則中文檔名與內容會變成方框。 / Install a CJK font
    // fallback; without one Chinese titles and contents render as tofu.
    fn ensure_fonts(&mut self, ctx: &egui::Context) {
        if self.fonts_installed {
            return;
        }

        let mut definitions = FontDefinitions::default();
        if let Some((name, data)) = load_cjk_font() {
            definitions
                .font_data
                .insert(name.clone(), FontData::from_owned(data));
            if let Some(family) = definitions.families.get_mut(&FontFamily::Proportional) {
                family.push(name.clone());
            }
            if let Some(family) = definitions.families.get_mut(&FontFamily::Monospace) {
                family.push(name);
            }
        }

        ctx.set_fonts(definitions);
        self.fonts_installed = true;
    }
}

fn render_tree_node(ui: &mut egui::Ui, node: &TreeNode, is_root: bool, actions: &mut Vec<TreeAction>) {
    if node.is_dir() {
        let response = egui::CollapsingHeader::new(node.name())
            .default_open(is_root)
            .show(ui, |ui| {
                for child in node.children() {
                    render_tree_node(ui, child, false, actions);
                }
            })
            .header_response;
        response.context_menu(|ui| {
            if ui.button("设为根目录").clicked() {
                actions.push(TreeAction::SetRoot(node.path().to_path_buf()));
                ui.close_menu();
            }
            if ui.button("更改根目录...").clicked() {
                actions.push(TreeAction::ChangeRoot);
                ui.close_menu();
            }
        });
    } else {
        let response = ui.selectable_label(false, node.name());
        if response.double_clicked() {
            actions.push(TreeAction::Open(node.path().to_path_buf()));
        }
        response.context_menu(|ui| {
            if ui.button("打开").clicked() {
                actions.push(TreeAction::Open(node.path().to_path_buf()));
                ui.close_menu();
            }
            if ui.button("更改根目录...").clicked() {
                actions.push(TreeAction::ChangeRoot);
                ui.close_menu();
            }
        });
    }
}

/// 依分頁語言為編輯區文字上色。 / Colours the editor text according to the tab's language.
fn highlight_layout_job(
    ui: &egui::Ui,
    language: Option<&LanguageDefinition>,
    text: &str,
) -> LayoutJob {
    let font_id = egui::TextStyle::Monospace.resolve(ui.style());
    let base_color = ui.visuals().text_color();
    let plain = TextFormat {
        font_id: font_id.clone(),
        color: base_color,
        ..Default::default()
    };

    let mut job = LayoutJob::default();
    let Some(language) = language else {
        job.append(text, 0.0, plain);
        return job;
    };

    let mut cursor = 0;
    for token in language.highlight(text) {
        if token.range.start > cursor {
            job.append(&text[cursor..token.range.start], 0.0, plain.clone());
        }
        let format = TextFormat {
            font_id: font_id.clone(),
            color: token_color(&token.kind),
            ..Default::default()
        };
        job.append(&text[token.range.clone()], 0.0, format);
        cursor = token.range.end;
    }
    if cursor < text.len() {
        job.append(&text[cursor..], 0.0, plain);
    }
    job
}

fn token_color(kind: &HighlightKind) -> Color32 {
    match kind {
        HighlightKind::Keyword => Color32::from_rgb(86, 156, 214),
        HighlightKind::Comment => Color32::from_rgb(106, 153, 85),
        HighlightKind::String => Color32::from_rgb(206, 145, 120),
        HighlightKind::Number => Color32::from_rgb(181, 206, 168),
        HighlightKind::Operator => Color32::from_rgb(212, 212, 212),
    }
}

fn load_cjk_font() -> Option<(String, Vec<u8>)> {
    let mut candidates: Vec<PathBuf> = Vec::new();

    #[cfg(target_os = "windows")]
    {
        candidates.push(PathBuf::from(r"C:\Windows\Fonts\msyh.ttc"));
        candidates.push(PathBuf::from(r"C:\Windows\Fonts\simsun.ttc"));
    }

    #[cfg(target_os = "macos")]
    {
        candidates.push(PathBuf::from("/System/Library/Fonts/PingFang.ttc"));
        candidates.push(PathBuf::from(
            "/System/Library/Fonts/Supplemental/Songti.ttc",
        ));
    }

    #[cfg(target_os = "linux")]
    {
        candidates.push(PathBuf::from(
            "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
        ));
        candidates.push(PathBuf::from(
            "/usr/share/fonts/truetype/wqy/wqy-zenhei.ttc",
        ));
    }

    for path in candidates.into_iter().filter(|path| path.exists()) {
        if let Ok(bytes) = fs::read(&path) {
            return Some(("cjk_fallback".into(), bytes));
        }
    }
    None
}

fn main() -> eframe::Result<()> {
    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1200.0, 600.0]),
        ..Default::default()
    };
    eframe::run_native(
        APP_TITLE,
        options,
        Box::new(|_cc| Box::<QuillPadApp>::default()),
    )
}
