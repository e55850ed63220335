use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::{DirEntry, WalkDir};

use crate::api_constants::{is_html_extension, site_config};
use crate::config::{OutputLayout, TargetLanguage};
use crate::error::Result;
use crate::translation_error;

/// 初始化日志系统
pub fn init_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        tracing::Level::ERROR
    } else if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// 将 `--file` 参数解析为实际路径，相对路径基于项目根目录
pub fn resolve_input_path(root: &Path, file: &Path) -> PathBuf {
    if file.is_absolute() {
        file.to_path_buf()
    } else {
        root.join(file)
    }
}

/// 验证输入文件
pub fn validate_input_file(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(translation_error!(file_not_found, path.display()));
    }

    if let Some(ext) = path.extension() {
        if !is_html_extension(&ext.to_string_lossy()) {
            warn!("⚠️  文件扩展名不是HTML: {}", ext.to_string_lossy());
        }
    }

    Ok(())
}

/// 递归扫描项目根目录下的HTML文件
///
/// 跳过隐藏目录、`_` 开头的Jekyll目录、依赖目录以及已有的翻译输出，结果按文件名排序。
pub fn discover_html_files(root: &Path, layout: OutputLayout) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(translation_error!(
            config,
            "root",
            format!("项目根目录不存在: {}", root.display())
        ));
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_skipped_dir(entry, layout));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("⚠️  跳过无法访问的路径: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let is_html = path
            .extension()
            .map(|ext| is_html_extension(&ext.to_string_lossy()))
            .unwrap_or(false);

        if is_html && !(layout == OutputLayout::Suffix && is_suffixed_output(path)) {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

fn is_skipped_dir(entry: &DirEntry, layout: OutputLayout) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }

    let name = entry.file_name().to_string_lossy();
    // 与Jekyll一致: `_layouts`、`_includes`、`_site` 等不是页面
    if name.starts_with(['.', '_']) || site_config::SKIPPED_DIRS.contains(&name.as_ref()) {
        return true;
    }

    // 目录模式下根目录的语言目录是输出位置
    layout == OutputLayout::Directory
        && entry.depth() == 1
        && TargetLanguage::ALL.iter().any(|lang| lang.code() == name)
}

fn is_suffixed_output(path: &Path) -> bool {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    TargetLanguage::ALL
        .iter()
        .any(|lang| stem.ends_with(&format!("_{}", lang.code())))
}

/// 生成输出文件路径
///
/// - 目录模式: `<root>/<lang>/<相对路径>`，根目录之外的文件只保留文件名
/// - 后缀模式: `<原目录>/<文件名>_<lang>.<扩展名>`
pub fn generate_output_path(
    source: &Path,
    root: &Path,
    lang: TargetLanguage,
    layout: OutputLayout,
) -> PathBuf {
    match layout {
        OutputLayout::Directory => {
            let relative = source
                .strip_prefix(root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| {
                    source
                        .file_name()
                        .map(PathBuf::from)
                        .unwrap_or_else(|| source.to_path_buf())
                });
            root.join(lang.code()).join(relative)
        }
        OutputLayout::Suffix => {
            let stem = source.file_stem().unwrap_or_default();
            let extension = source.extension().unwrap_or_default();

            let output_name = format!(
                "{}_{}.{}",
                stem.to_string_lossy(),
                lang.code(),
                extension.to_string_lossy()
            );

            match source.parent() {
                Some(parent) => parent.join(output_name),
                None => PathBuf::from(output_name),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TranslationError;
    use std::fs;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "<p>Hello</p>").unwrap();
    }

    #[test]
    fn test_directory_output_path() {
        let root = Path::new("/site");
        let out = generate_output_path(
            Path::new("/site/resources/index.html"),
            root,
            TargetLanguage::French,
            OutputLayout::Directory,
        );
        assert_eq!(out, PathBuf::from("/site/fr/resources/index.html"));

        let outside = generate_output_path(
            Path::new("/elsewhere/page.html"),
            root,
            TargetLanguage::Spanish,
            OutputLayout::Directory,
        );
        assert_eq!(outside, PathBuf::from("/site/es/page.html"));
    }

    #[test]
    fn test_suffix_output_path() {
        let out = generate_output_path(
            Path::new("/site/contact.html"),
            Path::new("/site"),
            TargetLanguage::Spanish,
            OutputLayout::Suffix,
        );
        assert_eq!(out, PathBuf::from("/site/contact_es.html"));
    }

    #[test]
    fn test_discovery_skips_outputs_and_hidden_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "index.html");
        touch(root, "resources/data-policy.html");
        touch(root, "fr/index.html");
        touch(root, "es/index.html");
        touch(root, ".git/hooks/sample.html");
        touch(root, "_site/index.html");
        touch(root, "_layouts/default.html");
        touch(root, "_includes/nav.html");
        touch(root, "_posts/2024-01-01-hello.html");
        touch(root, "node_modules/pkg/readme.html");
        touch(root, "assets/style.css");

        let files = discover_html_files(root, OutputLayout::Directory).unwrap();
        let relative: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            relative,
            vec![
                PathBuf::from("index.html"),
                PathBuf::from("resources/data-policy.html"),
            ]
        );
    }

    #[test]
    fn test_discovery_suffix_layout() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "index.html");
        touch(root, "index_fr.html");
        touch(root, "fr/about.html");

        let files = discover_html_files(root, OutputLayout::Suffix).unwrap();
        assert_eq!(files, vec![root.join("fr/about.html"), root.join("index.html")]);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = validate_input_file(&dir.path().join("missing.html")).unwrap_err();
        assert!(matches!(err, TranslationError::FileNotFound { .. }));

        // 目录不是文件
        let err = validate_input_file(dir.path()).unwrap_err();
        assert!(matches!(err, TranslationError::FileNotFound { .. }));
    }

    #[test]
    fn test_resolve_input_path() {
        assert_eq!(
            resolve_input_path(Path::new("/site"), Path::new("index.html")),
            PathBuf::from("/site/index.html")
        );
        assert_eq!(
            resolve_input_path(Path::new("/site"), Path::new("/tmp/a.html")),
            PathBuf::from("/tmp/a.html")
        );
    }
}
