use std::path::PathBuf;

pub fn data_dir() -> PathBuf {
    // On macOS and Linux, use ~/.local/share/spotbox/ (XDG standard)
    // instead of macOS Application Support for consistency
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
            .join("spotbox")
    }
    #[cfg(windows)]
    {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("spotbox")
    }
}

pub fn config_dir() -> PathBuf {
    // On macOS and Linux, always use ~/.config/spotbox/
    // (avoid macOS Application Support folder for consistency)
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("spotbox")
    }

    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("spotbox")
    }
}

/// Where the ALSA per-user config lives.  The mono-downmix setup writes here.
pub fn asoundrc_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".asoundrc")
}

#[cfg(unix)]
fn amixer_binary_names() -> &'static [&'static str] {
    &["amixer"]
}

#[cfg(windows)]
fn amixer_binary_names() -> &'static [&'static str] {
    &["amixer.exe", "amixer"]
}

fn find_beside_exe(names: &[&str]) -> Option<PathBuf> {
    let current_exe = std::env::current_exe().ok()?;
    let dir = current_exe.parent()?;
    for name in names {
        let p = dir.join(name);
        if p.exists() {
            return Some(p);
        }
    }
    None
}

fn find_on_path(names: &[&str]) -> Option<PathBuf> {
    let path = std::env::var("PATH").ok()?;
    #[cfg(unix)]
    let sep = ":";
    #[cfg(windows)]
    let sep = ";";
    for dir in path.split(sep) {
        for name in names {
            let p = PathBuf::from(dir).join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }
    None
}

/// Find the amixer binary (ALSA mixer CLI).
/// Checks beside the current exe first, then PATH.
pub fn find_amixer_binary() -> Option<PathBuf> {
    if let Some(p) = find_beside_exe(amixer_binary_names()) {
        return Some(p);
    }
    find_on_path(amixer_binary_names())
}
