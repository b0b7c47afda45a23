use std::path::PathBuf;
use std::sync::OnceLock;

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the directory containing the executable.
pub fn get_exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Returns the logs directory: `<exe_dir>/logs/`
pub fn get_logs_dir() -> PathBuf {
    get_exe_dir().join("logs")
}

/// Returns the upload directory: `<exe_dir>/uploads/`
pub fn get_uploads_dir() -> PathBuf {
    get_exe_dir().join("uploads")
}

/// Returns the composite image directory: `<exe_dir>/ocr_ready/`
pub fn get_ocr_ready_dir() -> PathBuf {
    get_exe_dir().join("ocr_ready")
}

/// Returns the raw OCR response directory: `<exe_dir>/ocr_json/`
pub fn get_ocr_json_dir() -> PathBuf {
    get_exe_dir().join("ocr_json")
}

/// Resolves a configured path: absolute paths are kept, relative ones
/// are taken from the executable directory.
pub fn resolve(path: &str) -> PathBuf {
    let p = PathBuf::from(path);
    if p.is_absolute() { p } else { get_exe_dir().join(p) }
}

/// Ensures all output directories exist. Call at startup.
pub fn ensure_directories() -> std::io::Result<()> {
    std::fs::create_dir_all(get_logs_dir())?;
    std::fs::create_dir_all(get_uploads_dir())?;
    std::fs::create_dir_all(get_ocr_ready_dir())?;
    std::fs::create_dir_all(get_ocr_json_dir())?;
    Ok(())
}
