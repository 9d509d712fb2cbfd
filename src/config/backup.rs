use super::ConfigParser;
use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

impl ConfigParser {
    /// Back up the compiled expressions under `$HOME/.easy-config-logic`.
    ///
    /// Writes `backup/<timestamp>-backup.txt` with one expression per line,
    /// refreshes `last-config.txt` and appends an entry to `config-log.txt`.
    /// Returns the backup file stem, so a caller can place the register view
    /// as `<stem>-register.txt` next to it.
    pub fn save_backup(&self) -> io::Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "home directory not found"))?;
        self.save_backup_in(&home)
    }

    /// Like [save_backup](ConfigParser::save_backup) with an explicit base
    /// directory instead of the home directory.
    pub fn save_backup_in(&self, base: &Path) -> io::Result<PathBuf> {
        let root = base.join(".easy-config-logic");
        let backup_dir = root.join("backup");
        fs::create_dir_all(&backup_dir)?;

        let now = Local::now();
        let time_text = now.format("%Y-%m-%d %H:%M:%S").to_string();
        let file_time = now.format("%Y-%m-%d-%H-%M-%S").to_string();
        let stem = backup_dir.join(format!("{}-backup", file_time));

        fs::write(
            root.join("last-config.txt"),
            format!("0\n{}\n{}\n", time_text, stem.display()),
        )?;

        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(root.join("config-log.txt"))?;
        writeln!(log, "0, {}, expression, {}", time_text, stem.display())?;

        let mut content = String::new();
        for expression in &self.expressions {
            content.push_str(expression);
            content.push('\n');
        }
        fs::write(stem.with_extension("txt"), content)?;

        Ok(stem)
    }
}
