use std::{
    ffi::{OsStr, OsString},
    path::PathBuf,
};

pub trait PathExt {
    /// Add suffix to file name without changing extension.
    ///
    /// Note this function does not handle multiple suffixes.
    /// For example, `test.tar.gz` with `_suffix` will be `test.tar_suffix.gz`.
    fn add_suffix<T: AsRef<OsStr>>(&mut self, suffix: T);
}

impl PathExt for PathBuf {
    fn add_suffix<T: AsRef<OsStr>>(&mut self, suffix: T) {
        let mut filename = OsString::new();

        // {file_stem}_{suffix}.{ext}
        if let Some(file_stem) = self.file_stem() {
            filename.push(file_stem);
        }
        filename.push("_");
        filename.push(suffix);

        if let Some(ext) = self.extension() {
            filename.push(".");
            filename.push(ext);
        }

        self.set_file_name(filename);
    }
}

/// Turn a stream name into a single directory component.
pub fn sanitize_dir_name(name: &str) -> String {
    let name = name.replace(['/', '\\'], "__");
    match name.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => name,
    }
}
