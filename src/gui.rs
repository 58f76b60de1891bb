//! Desktop and console front ends
//!
//! [`DesktopUi`] opens a native selection window per manual choice and shows
//! notices as message boxes. [`ConsoleUi`] is used with `--headless`.
//! [`edit_settings`] opens the settings window on its own.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use eframe::egui;
use rfd::{FileDialog, MessageButtons, MessageDialog, MessageLevel};

use crate::config::{
    MIN_SELECTION_WINDOW_SIZE, SELECTION_WINDOW_SIZE, SETTINGS_WINDOW_SIZE, SUBTITLE_LANGUAGES, VIDEO_EXTENSIONS,
};
use crate::data_structures::SubtitleCandidate;
use crate::helper_functions::Utils;
use crate::selection::{ColumnVisibility, NoticeLevel, Selection, SelectionRequest, UserInterface};
use crate::settings::{ColumnToggle, SelectionMode, Settings, SuffixPolicy};

const SUFFIX_CHOICES: [(SuffixPolicy, &str); 3] = [
    (SuffixPolicy::Off, "Never"),
    (SuffixPolicy::On, "Always"),
    (SuffixPolicy::Auto, "With several languages"),
];

const SELECTION_CHOICES: [(SelectionMode, &str); 2] =
    [(SelectionMode::Manual, "Ask me"), (SelectionMode::Auto, "Pick the best match")];

const COLUMN_CHOICES: [(ColumnToggle, &str); 3] =
    [(ColumnToggle::Off, "Hidden"), (ColumnToggle::On, "Shown"), (ColumnToggle::Auto, "When useful")];

/// Native windows and message boxes
///
/// Holds the settings as stored on disk so the selection window can edit them.
#[derive(Debug, Default)]
pub struct DesktopUi {
    settings: Settings,
}

impl DesktopUi {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }
}

impl UserInterface for DesktopUi {
    fn select(&mut self, request: &SelectionRequest<'_>) -> Selection {
        let outcome = Arc::new(Mutex::new(Selection::Cancelled));
        let saved = Arc::new(Mutex::new(None));
        let window = SelectionWindow::new(request, Arc::clone(&outcome), self.settings.clone(), Arc::clone(&saved));

        let viewport = egui::ViewportBuilder::default()
            .with_title(format!("subfetch - {}", request.video_title))
            .with_inner_size(SELECTION_WINDOW_SIZE)
            .with_min_inner_size(MIN_SELECTION_WINDOW_SIZE)
            .with_resizable(true);
        let native_options = eframe::NativeOptions { viewport, ..Default::default() };

        log::info!("Opening the selection window for {}", request.video_file_name);
        let result = eframe::run_native(
            "subfetch",
            native_options,
            Box::new(move |cc| {
                configure_visuals(&cc.egui_ctx);
                Box::new(window)
            }),
        );
        if let Err(e) = result {
            log::error!("Failed to open the selection window: {}", e);
            return Selection::Cancelled;
        }

        if let Some(settings) = saved.lock().ok().and_then(|mut slot| slot.take()) {
            self.settings = settings;
        }
        outcome.lock().map(|chosen| chosen.clone()).unwrap_or(Selection::Cancelled)
    }

    fn notify(&mut self, level: NoticeLevel, title: &str, message: &str) {
        show_notice(level, title, message);
    }
}

fn show_notice(level: NoticeLevel, title: &str, message: &str) {
    log_notice(level, title, message);
    let level = match level {
        NoticeLevel::Info => MessageLevel::Info,
        NoticeLevel::Warning => MessageLevel::Warning,
        NoticeLevel::Error => MessageLevel::Error,
    };
    MessageDialog::new()
        .set_level(level)
        .set_title(title)
        .set_description(message)
        .set_buttons(MessageButtons::Ok)
        .show();
}

/// Terminal only: notices go to the log, manual selection is not possible
#[derive(Debug, Default)]
pub struct ConsoleUi;

impl UserInterface for ConsoleUi {
    fn select(&mut self, request: &SelectionRequest<'_>) -> Selection {
        log::warn!(
            "{} candidates for {} need a manual choice; run with --auto to select without a window",
            request.candidates.len(),
            request.video_file_name
        );
        Selection::Cancelled
    }

    fn notify(&mut self, level: NoticeLevel, title: &str, message: &str) {
        log_notice(level, title, message);
    }
}

fn log_notice(level: NoticeLevel, title: &str, message: &str) {
    match level {
        NoticeLevel::Info => log::info!("{}: {}", title, message),
        NoticeLevel::Warning => log::warn!("{}: {}", title, message),
        NoticeLevel::Error => log::error!("{}: {}", title, message),
    }
}

/// Native multi-file picker restricted to video extensions
pub fn pick_video_files() -> Vec<PathBuf> {
    FileDialog::new()
        .set_title("Select videos to search subtitles for")
        .add_filter("Videos", VIDEO_EXTENSIONS)
        .pick_files()
        .unwrap_or_default()
}

/// Apply Dracula theme
fn configure_visuals(ctx: &egui::Context) {
    let mut visuals = egui::Visuals::dark();

    visuals.override_text_color = Some(egui::Color32::from_rgb(248, 248, 242)); // #f8f8f2
    visuals.widgets.active.bg_fill = egui::Color32::from_rgb(189, 147, 249); // #bd93f9
    visuals.widgets.hovered.bg_fill = egui::Color32::from_rgb(139, 233, 253); // #8be9fd
    visuals.widgets.inactive.bg_fill = egui::Color32::from_rgb(68, 71, 90); // #44475a
    visuals.selection.bg_fill = egui::Color32::from_rgb(189, 147, 249);
    visuals.widgets.hovered.fg_stroke.color = egui::Color32::from_rgb(40, 42, 54); // #282a36

    ctx.set_visuals(visuals);
}

/// One selection window; the result is written to `outcome` before closing
struct SelectionWindow {
    title: String,
    video_file_name: String,
    rows: Vec<SubtitleCandidate>,
    columns: ColumnVisibility,
    selected: usize,
    outcome: Arc<Mutex<Selection>>,
    settings: Settings,
    editor: Option<SettingsEditor>,
    saved: Arc<Mutex<Option<Settings>>>,
}

impl SelectionWindow {
    fn new(
        request: &SelectionRequest<'_>,
        outcome: Arc<Mutex<Selection>>,
        settings: Settings,
        saved: Arc<Mutex<Option<Settings>>>,
    ) -> Self {
        Self {
            title: request.video_title.to_string(),
            video_file_name: request.video_file_name.to_string(),
            rows: request.candidates.to_vec(),
            columns: request.columns,
            selected: 0,
            outcome,
            settings,
            editor: None,
            saved,
        }
    }

    fn show_settings(&mut self, ctx: &egui::Context) {
        let Some(editor) = &mut self.editor else {
            return;
        };
        let mut action = EditorAction::Editing;
        egui::Window::new("Settings")
            .collapsible(false)
            .resizable(true)
            .default_size(SETTINGS_WINDOW_SIZE)
            .show(ctx, |ui| {
                ui.label("Changes apply from the next run.");
                ui.separator();
                action = editor.show(ui);
            });

        match action {
            EditorAction::Save => {
                if let Some(settings) = editor.save() {
                    if let Ok(mut slot) = self.saved.lock() {
                        *slot = Some(settings.clone());
                    }
                    self.settings = settings;
                    self.editor = None;
                }
            }
            EditorAction::Cancel => self.editor = None,
            EditorAction::Editing => {}
        }
    }

    fn column_count(&self) -> usize {
        1 + [self.columns.language, self.columns.hearing_impaired, self.columns.rating, self.columns.downloads]
            .iter()
            .filter(|shown| **shown)
            .count()
    }

    fn accept(&self, ctx: &egui::Context) {
        if let Some(row) = self.rows.get(self.selected) {
            log::info!("User selected {}", row.file_name);
            if let Ok(mut outcome) = self.outcome.lock() {
                *outcome = Selection::Chosen(row.file_name.clone());
            }
        }
        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
    }

    fn render_table(&self, ui: &mut egui::Ui) -> (Option<usize>, bool) {
        let mut clicked = None;
        let mut double_clicked = false;

        egui::Grid::new("candidates")
            .striped(true)
            .num_columns(self.column_count())
            .spacing([16.0, 4.0])
            .show(ui, |ui| {
                ui.strong("Available subtitles");
                if self.columns.language {
                    ui.strong("Language");
                }
                if self.columns.hearing_impaired {
                    ui.strong("HI");
                }
                if self.columns.rating {
                    ui.strong("Rating");
                }
                if self.columns.downloads {
                    ui.strong("Downloads");
                }
                ui.end_row();

                for (index, row) in self.rows.iter().enumerate() {
                    let response = ui.selectable_label(index == self.selected, Utils::truncate_string(&row.file_name, 80));
                    if response.clicked() {
                        clicked = Some(index);
                    }
                    if response.double_clicked() {
                        clicked = Some(index);
                        double_clicked = true;
                    }
                    if self.columns.language {
                        ui.label(row.language_name.as_str());
                    }
                    if self.columns.hearing_impaired {
                        ui.label(if row.hearing_impaired { "✔" } else { "" });
                    }
                    if self.columns.rating {
                        ui.label(row.rating.as_str());
                    }
                    if self.columns.downloads {
                        ui.label(row.download_count.as_str());
                    }
                    ui.end_row();
                }
            });

        (clicked, double_clicked)
    }
}

impl eframe::App for SelectionWindow {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let editing = self.editor.is_some();
        let (enter, escape, up, down) = ctx.input(|i| {
            if editing {
                return (false, false, false, false);
            }
            (
                i.key_pressed(egui::Key::Enter),
                i.key_pressed(egui::Key::Escape),
                i.key_pressed(egui::Key::ArrowUp),
                i.key_pressed(egui::Key::ArrowDown),
            )
        });
        if up {
            self.selected = self.selected.saturating_sub(1);
        }
        if down && self.selected + 1 < self.rows.len() {
            self.selected += 1;
        }

        let mut accept = enter;
        let mut cancel = escape;
        let mut open_settings = false;

        egui::TopBottomPanel::bottom("actions").show(ctx, |ui| {
            ui.add_space(5.0);
            ui.horizontal(|ui| {
                if ui.add_enabled(!editing, egui::Button::new("Settings")).clicked() {
                    open_settings = true;
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.add_enabled(!editing, egui::Button::new("Download")).clicked() {
                        accept = true;
                    }
                    if ui.add_enabled(!editing, egui::Button::new("Cancel")).clicked() {
                        cancel = true;
                    }
                });
            });
            ui.add_space(5.0);
        });

        let mut picked = (None, false);
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading(
                egui::RichText::new(&self.title).color(egui::Color32::from_rgb(189, 147, 249)),
            );
            ui.label(format!("Video file: {}", self.video_file_name));
            ui.add_space(5.0);
            egui::ScrollArea::both().auto_shrink([false, false]).show(ui, |ui| {
                picked = self.render_table(ui);
            });
        });

        if open_settings {
            self.editor = Some(SettingsEditor::new(&self.settings));
        }
        self.show_settings(ctx);

        if let (Some(index), double_clicked, false) = (picked.0, picked.1, editing) {
            self.selected = index;
            accept |= double_clicked;
        }

        if accept {
            self.accept(ctx);
        } else if cancel {
            log::info!("Selection window cancelled");
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }
}

/// What the user did in the settings form this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditorAction {
    Editing,
    Save,
    Cancel,
}

/// Form over a draft copy of the settings
struct SettingsEditor {
    draft: Settings,
}

impl SettingsEditor {
    fn new(settings: &Settings) -> Self {
        Self { draft: settings.clone() }
    }

    /// Write the draft through [`Settings::save`]; errors are shown to the user
    fn save(&self) -> Option<Settings> {
        match self.draft.save() {
            Ok(()) => {
                log::info!("Settings saved");
                Some(self.draft.clone())
            }
            Err(e) => {
                show_notice(NoticeLevel::Error, "Settings error!", &format!("Unable to save the settings:\n{}", e));
                None
            }
        }
    }

    fn show(&mut self, ui: &mut egui::Ui) -> EditorAction {
        let mut action = EditorAction::Editing;

        ui.strong("Subtitle languages");
        egui::ScrollArea::vertical().id_source("languages").max_height(180.0).show(ui, |ui| {
            egui::Grid::new("language_grid").num_columns(3).spacing([16.0, 4.0]).show(ui, |ui| {
                for (index, (name, code)) in SUBTITLE_LANGUAGES.iter().enumerate() {
                    let mut enabled = self.draft.uses_language(code);
                    if ui.checkbox(&mut enabled, *name).changed() {
                        self.draft.set_language(code, enabled);
                    }
                    if index % 3 == 2 {
                        ui.end_row();
                    }
                }
            });
        });
        if self.draft.languages.is_empty() {
            ui.colored_label(egui::Color32::from_rgb(255, 85, 85), "Pick at least one language."); // #ff5555
        } else {
            ui.label(format!("Search order: {}", self.draft.languages.join(", ")));
        }
        ui.separator();

        egui::Grid::new("options_grid").num_columns(2).spacing([16.0, 6.0]).show(ui, |ui| {
            ui.label("Language code in file name");
            choice(ui, "suffix_choice", &mut self.draft.language_suffix, &SUFFIX_CHOICES);
            ui.end_row();

            ui.label("Separator before the code");
            ui.add(egui::TextEdit::singleline(&mut self.draft.language_separator).desired_width(60.0));
            ui.end_row();

            ui.label("Subtitle selection");
            choice(ui, "selection_choice", &mut self.draft.selection_mode, &SELECTION_CHOICES);
            ui.end_row();
        });
        ui.checkbox(&mut self.draft.search_by_name, "Search by file name when the hash finds nothing");
        ui.checkbox(&mut self.draft.overwrite_existing, "Search again when a subtitle already exists");
        ui.separator();

        ui.strong("Selection window columns");
        egui::Grid::new("columns_grid").num_columns(2).spacing([16.0, 6.0]).show(ui, |ui| {
            let columns = &mut self.draft.columns;
            for (label, toggle) in [
                ("Language", &mut columns.language),
                ("Hearing impaired", &mut columns.hearing_impaired),
                ("Rating", &mut columns.rating),
                ("Downloads", &mut columns.downloads),
            ] {
                ui.label(label);
                choice(ui, label, toggle, &COLUMN_CHOICES);
                ui.end_row();
            }
        });
        ui.separator();

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.add_enabled(!self.draft.languages.is_empty(), egui::Button::new("Save")).clicked() {
                action = EditorAction::Save;
            }
            if ui.button("Cancel").clicked() {
                action = EditorAction::Cancel;
            }
        });

        action
    }
}

/// Drop-down over a fixed set of labelled values
fn choice<T: Copy + PartialEq>(ui: &mut egui::Ui, id: &str, value: &mut T, choices: &[(T, &str)]) {
    let current = choices.iter().find(|(option, _)| *option == *value).map_or("", |(_, name)| *name);
    egui::ComboBox::from_id_source(id).selected_text(current).show_ui(ui, |ui| {
        for (option, name) in choices {
            ui.selectable_value(value, *option, *name);
        }
    });
}

/// The settings form as its own window, shown on first run
struct SettingsWindow {
    editor: SettingsEditor,
    outcome: Arc<Mutex<Option<Settings>>>,
}

impl eframe::App for SettingsWindow {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut action = EditorAction::Editing;
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading(egui::RichText::new("Welcome to subfetch").color(egui::Color32::from_rgb(189, 147, 249)));
            ui.label("Choose how subtitles are searched and saved.");
            ui.add_space(5.0);
            egui::ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
                action = self.editor.show(ui);
            });
        });

        match action {
            EditorAction::Save => {
                if let Some(settings) = self.editor.save() {
                    if let Ok(mut slot) = self.outcome.lock() {
                        *slot = Some(settings);
                    }
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            }
            EditorAction::Cancel => ctx.send_viewport_cmd(egui::ViewportCommand::Close),
            EditorAction::Editing => {}
        }
    }
}

/// Open the settings window and wait for it to close
///
/// Returns the saved settings, or `None` when the window was cancelled.
pub fn edit_settings(settings: &Settings) -> Option<Settings> {
    let outcome = Arc::new(Mutex::new(None));
    let window = SettingsWindow { editor: SettingsEditor::new(settings), outcome: Arc::clone(&outcome) };

    let viewport = egui::ViewportBuilder::default()
        .with_title("subfetch - Settings")
        .with_inner_size(SETTINGS_WINDOW_SIZE)
        .with_resizable(true);
    let native_options = eframe::NativeOptions { viewport, ..Default::default() };

    log::info!("Opening the settings window");
    let result = eframe::run_native(
        "subfetch",
        native_options,
        Box::new(move |cc| {
            configure_visuals(&cc.egui_ctx);
            Box::new(window)
        }),
    );
    if let Err(e) = result {
        log::error!("Failed to open the settings window: {}", e);
        return None;
    }

    outcome.lock().ok().and_then(|mut slot| slot.take())
}
