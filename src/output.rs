//! 译文输出
//!
//! 先写入目标目录下的临时文件再原子替换，失败时临时文件随 `NamedTempFile` 一起删除，
//! 不会留下写了一半的页面。

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::Result;
use crate::translation_error;

/// 写入译文文件，必要时创建父目录，已有文件会被覆盖
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    std::fs::create_dir_all(parent)
        .map_err(|e| translation_error!(file_op, parent.display(), "创建目录", e))?;

    let mut temp = NamedTempFile::new_in(parent)
        .map_err(|e| translation_error!(file_op, parent.display(), "创建临时文件", e))?;
    temp.write_all(content.as_bytes())
        .and_then(|_| temp.flush())
        .map_err(|e| translation_error!(file_op, path.display(), "写入", e))?;

    temp.persist(path)
        .map_err(|e| translation_error!(file_op, path.display(), "替换", e.error))?;

    debug!("💾 已写入 {} ({} 字节)", path.display(), content.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("fr/resources/index.html");
        write_atomic(&target, "<p>Bonjour</p>").unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "<p>Bonjour</p>");
    }

    #[test]
    fn test_overwrites_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("index.html");
        write_atomic(&target, "first").unwrap();
        write_atomic(&target, "second").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "second");
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
