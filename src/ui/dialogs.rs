use chrono::Local;
use rfd::FileDialog;
use std::path::PathBuf;

/// File dialog helper for the demo console
pub struct FileDialogs;

impl FileDialogs {
    /// Open a file dialog for exporting the event journal
    pub fn export_journal_file() -> Option<PathBuf> {
        FileDialog::new()
            .add_filter("CSV Files", &["csv"])
            .add_filter("All Files", &["*"])
            .set_title("Export Event Journal")
            .set_file_name(default_journal_name())
            .save_file()
    }
}

/// Suggested file name, e.g. "roamen-journal-20241018-153000.csv"
pub fn default_journal_name() -> String {
    format!("roamen-journal-{}.csv", Local::now().format("%Y%m%d-%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_journal_name() {
        let name = default_journal_name();
        assert!(name.starts_with("roamen-journal-"));
        assert!(name.ends_with(".csv"));
        assert_eq!(name.len(), "roamen-journal-20241018-153000.csv".len());
    }

    // Opens a real dialog; run manually
    #[test]
    #[ignore]
    fn test_export_journal_dialog() {
        if let Some(path) = FileDialogs::export_journal_file() {
            println!("Selected file: {:?}", path);
        }
    }
}
