//! 翻译流水线
//!
//! 将“文件 × 目标语言”展开为翻译任务并按顺序执行。单个任务失败只记录在汇总中，
//! 不影响后续任务。凭据、配置和文件集合的检查都在处理第一个文件之前完成。

// 标准库导入
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

// 第三方crate导入
use tracing::{debug, error, info, warn};

// 本地模块导入
use crate::api_constants::api_config;
use crate::config::{resolve_credential, Cli, RunConfig, TargetLanguage};
use crate::error::Result;
use crate::front_matter;
use crate::html_processor::{
    apply_translations, extract_segments, unique_texts, verify_structure, ExtractOptions,
};
use crate::output::write_atomic;
use crate::stats::{print_summary, JobOutcome, JobStats, RunSummary};
use crate::translation_error;
use crate::translator::{DeepLClient, Translate};
use crate::utils::{
    discover_html_files, generate_output_path, resolve_input_path, validate_input_file,
};

/// 执行一次完整运行，返回进程退出码
///
/// `env_key` 为 `DEEPL_API_KEY` 环境变量的值。返回的错误都发生在处理任何文件之前。
pub async fn run(cli: &Cli, env_key: Option<String>) -> Result<u8> {
    // 凭据检查必须在处理任何文件之前
    let credential = resolve_credential(cli.api_key.as_deref(), env_key, cli.dry_run)?;

    let client = match credential {
        Some(credential) if !cli.dry_run => {
            let client = DeepLClient::new(cli.translator_config(credential)?)?;
            info!("✅ DeepL客户端就绪: {}", client.config().api_url());
            Some(client)
        }
        _ => None,
    };

    let run_config = cli.run_config();
    let jobs = plan_jobs(&run_config)?;

    if !cli.quiet {
        info!(
            "🚀 开始翻译: {} 个任务 (目标语言: {})",
            jobs.len(),
            run_config
                .languages
                .iter()
                .map(|lang| lang.code())
                .collect::<Vec<_>>()
                .join(", ")
        );
        if cli.dry_run {
            info!("🔍 演练模式: 不调用API，不写入文件");
        }
    }

    let translator = client.as_ref().map(|c| c as &dyn Translate);
    let options = ExtractOptions {
        translate_attributes: run_config.translate_attributes,
    };
    let summary = run_jobs(&jobs, translator, options).await;

    if !cli.quiet {
        print_summary(&summary);
    }

    Ok(summary.exit_code())
}

/// 一个(源文件, 目标语言)翻译任务
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationJob {
    pub source: PathBuf,
    pub output: PathBuf,
    pub language: TargetLanguage,
    pub dry_run: bool,
}

/// 根据运行配置生成任务列表
///
/// 指定文件不存在、根目录无效等致命错误在这里返回，此时不会处理任何文件。
pub fn plan_jobs(config: &RunConfig) -> Result<Vec<TranslationJob>> {
    if config.languages.is_empty() {
        return Err(translation_error!(config, "lang", "至少需要一个目标语言"));
    }

    let files = match &config.file {
        Some(file) => {
            let path = resolve_input_path(&config.root, file);
            validate_input_file(&path)?;
            vec![path]
        }
        None => discover_html_files(&config.root, config.layout)?,
    };

    if files.is_empty() {
        warn!("⚠️  {} 下没有找到HTML文件", config.root.display());
    }

    let jobs = files
        .iter()
        .flat_map(|source| {
            config.languages.iter().map(move |&language| TranslationJob {
                source: source.clone(),
                output: generate_output_path(source, &config.root, language, config.layout),
                language,
                dry_run: config.dry_run,
            })
        })
        .collect();

    Ok(jobs)
}

/// 按顺序执行所有任务
///
/// `translator` 仅在非演练任务中使用；演练任务不会调用它。
pub async fn run_jobs(
    jobs: &[TranslationJob],
    translator: Option<&dyn Translate>,
    options: ExtractOptions,
) -> RunSummary {
    let started = Instant::now();
    let mut summary = RunSummary {
        dry_run: jobs.iter().any(|job| job.dry_run),
        ..Default::default()
    };

    for job in jobs {
        info!(
            "🌐 翻译: {} -> {} ({})",
            job.source.display(),
            job.output.display(),
            job.language.deepl_code()
        );

        let result = process_job(job, translator, options).await;
        match &result {
            Ok(stats) if job.dry_run => info!(
                "  [演练] 将翻译 {} 段文本 ({} 条去重, {} 字符)",
                stats.segments, stats.unique_texts, stats.characters
            ),
            Ok(stats) => info!(
                "  ✅ 翻译成功: {} 段文本, 耗时 {}",
                stats.segments,
                crate::stats::format_duration(stats.elapsed)
            ),
            Err(e) => error!("  ❌ {}", e),
        }

        summary.outcomes.push(JobOutcome {
            source: job.source.clone(),
            output: job.output.clone(),
            language: job.language,
            result,
        });
    }

    summary.elapsed = started.elapsed();
    summary
}

/// 处理单个任务
pub async fn process_job(
    job: &TranslationJob,
    translator: Option<&dyn Translate>,
    options: ExtractOptions,
) -> Result<JobStats> {
    let started = Instant::now();

    let content = std::fs::read_to_string(&job.source)
        .map_err(|e| translation_error!(file_op, job.source.display(), "读取", e))?;

    let page = front_matter::split(&content);
    if page.front_matter.is_none() {
        debug!("未找到front matter，翻译整个文件");
    }

    let segments = extract_segments(page.body, options)?;
    let texts = unique_texts(&segments);
    let mut stats = JobStats {
        segments: segments.len(),
        unique_texts: texts.len(),
        characters: texts.iter().map(|t| t.chars().count()).sum(),
        ..Default::default()
    };

    if job.dry_run {
        stats.elapsed = started.elapsed();
        return Ok(stats);
    }

    let body = if texts.is_empty() {
        debug!("没有可翻译的文本，原样输出");
        page.body.to_string()
    } else {
        let translator = translator
            .ok_or_else(|| translation_error!(missing_credential, api_config::API_KEY_ENV))?;
        let translations = translator.translate_batch(&texts, job.language).await?;
        if translations.len() != texts.len() {
            return Err(anyhow::anyhow!(
                "译文数量不匹配: 提交{}条，得到{}条",
                texts.len(),
                translations.len()
            )
            .into());
        }

        let translation_map: HashMap<String, String> =
            texts.into_iter().zip(translations).collect();
        let translated = apply_translations(page.body, &segments, &translation_map);
        verify_structure(page.body, &translated, options.translate_attributes)?;
        translated
    };

    let front_matter = page
        .front_matter
        .map(|yaml| front_matter::set_lang(yaml, job.language.code()));
    let output = front_matter::assemble(front_matter.as_deref(), &body);
    write_atomic(&job.output, &output)?;

    stats.elapsed = started.elapsed();
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputLayout;
    use crate::error::TranslationError;
    use clap::Parser;
    use futures::future::BoxFuture;
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 记录调用次数的假翻译器，遇到包含 `FAIL` 的文本时模拟API错误
    struct MockTranslator {
        dictionary: HashMap<String, String>,
        calls: AtomicUsize,
    }

    impl MockTranslator {
        fn new(pairs: &[(&str, &str)]) -> Self {
            Self {
                dictionary: pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Translate for MockTranslator {
        fn translate_batch<'a>(
            &'a self,
            texts: &'a [String],
            target: TargetLanguage,
        ) -> BoxFuture<'a, Result<Vec<String>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = if texts.iter().any(|t| t.contains("FAIL")) {
                Err(translation_error!(
                    translation_api,
                    500,
                    "Internal Server Error",
                    "mock://deepl"
                ))
            } else {
                Ok(texts
                    .iter()
                    .map(|t| {
                        self.dictionary
                            .get(t)
                            .cloned()
                            .unwrap_or_else(|| format!("{} [{}]", t, target.code()))
                    })
                    .collect())
            };
            Box::pin(async move { result })
        }
    }

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn all_files(root: &Path) -> Vec<PathBuf> {
        walkdir::WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().to_path_buf())
            .collect()
    }

    fn run_config(root: &Path) -> RunConfig {
        RunConfig {
            root: root.to_path_buf(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_dry_run_makes_no_writes_or_calls() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "index.html", "<p>Hello</p>");
        write(dir.path(), "resources/index.html", "<h1>Resources</h1>");
        let before = all_files(dir.path());

        let config = RunConfig {
            dry_run: true,
            ..run_config(dir.path())
        };
        let jobs = plan_jobs(&config).unwrap();
        assert_eq!(jobs.len(), 4);

        let mock = MockTranslator::new(&[]);
        let summary = run_jobs(&jobs, Some(&mock), ExtractOptions::default()).await;

        assert_eq!(mock.calls(), 0);
        assert_eq!(all_files(dir.path()), before);
        assert!(summary.dry_run);
        assert_eq!(summary.exit_code(), 0);
        assert_eq!(summary.characters(), "Hello".len() * 2 + "Resources".len() * 2);
    }

    #[tokio::test]
    async fn test_outputs_match_files_times_languages() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "index.html", "<p>Hello</p>");
        write(dir.path(), "resources/data-policy.html", "<p>Policy</p>");

        let jobs = plan_jobs(&run_config(dir.path())).unwrap();
        let mock = MockTranslator::new(&[]);
        let summary = run_jobs(&jobs, Some(&mock), ExtractOptions::default()).await;
        assert_eq!(summary.exit_code(), 0);
        assert_eq!(mock.calls(), 4);

        let relative: Vec<_> = all_files(dir.path())
            .into_iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            relative,
            vec![
                PathBuf::from("es/index.html"),
                PathBuf::from("es/resources/data-policy.html"),
                PathBuf::from("fr/index.html"),
                PathBuf::from("fr/resources/data-policy.html"),
                PathBuf::from("index.html"),
                PathBuf::from("resources/data-policy.html"),
            ]
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("es/index.html")).unwrap(),
            "<p>Hello [es]</p>"
        );
    }

    #[tokio::test]
    async fn test_hello_bonjour_with_front_matter() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "index.html",
            "---\nlayout: default\nlang: en\n---\n<p>Hello</p>\n",
        );

        let config = RunConfig {
            languages: vec![TargetLanguage::French],
            file: Some(PathBuf::from("index.html")),
            ..run_config(dir.path())
        };
        let jobs = plan_jobs(&config).unwrap();
        assert_eq!(jobs.len(), 1);

        let mock = MockTranslator::new(&[("Hello", "Bonjour")]);
        let summary = run_jobs(&jobs, Some(&mock), ExtractOptions::default()).await;
        assert_eq!(summary.exit_code(), 0);
        assert_eq!(
            fs::read_to_string(dir.path().join("fr/index.html")).unwrap(),
            "---\nlayout: default\nlang: fr\n---\n<p>Bonjour</p>\n"
        );
    }

    #[tokio::test]
    async fn test_markup_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let source = concat!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n",
            "  <meta charset=\"utf-8\">\n  <title>Contact us</title>\n",
            "  <script src=\"/js/app.js\"></script>\n",
            "  <script>window.msg = \"Hello\";</script>\n</head>\n",
            "<body class='page'>\n  <!-- Hello -->\n",
            "  <a href=\"mailto:team@example.org\" title=\"Hello\">Hello</a>\n",
            "  <p>\n    Hello\n  </p>\n</body>\n</html>\n"
        );
        write(dir.path(), "contact.html", source);

        let config = RunConfig {
            languages: vec![TargetLanguage::French],
            layout: OutputLayout::Suffix,
            ..run_config(dir.path())
        };
        let jobs = plan_jobs(&config).unwrap();
        let mock = MockTranslator::new(&[("Hello", "Bonjour"), ("Contact us", "Contactez-nous")]);
        let summary = run_jobs(&jobs, Some(&mock), ExtractOptions::default()).await;
        assert_eq!(summary.exit_code(), 0);

        // 一次请求提交去重后的全部文本
        assert_eq!(mock.calls(), 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("contact_fr.html")).unwrap(),
            source
                .replace("<title>Contact us", "<title>Contactez-nous")
                .replace(">Hello</a>", ">Bonjour</a>")
                .replace("    Hello\n", "    Bonjour\n")
        );
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_later_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.html", "<p>FAIL here</p>");
        write(dir.path(), "b.html", "<p>broken <div class=\"x\"</p>");
        write(dir.path(), "c.html", "<p>Hello</p>");

        let config = RunConfig {
            languages: vec![TargetLanguage::Spanish],
            ..run_config(dir.path())
        };
        let jobs = plan_jobs(&config).unwrap();
        let mock = MockTranslator::new(&[("Hello", "Hola")]);
        let summary = run_jobs(&jobs, Some(&mock), ExtractOptions::default()).await;

        assert_eq!(summary.total(), 3);
        assert_eq!(summary.succeeded(), 1);
        assert_eq!(summary.exit_code(), 1);

        let errors: Vec<_> = summary.failures().map(|o| &o.result).collect();
        assert!(matches!(
            errors[0],
            Err(TranslationError::TranslationApi { .. })
        ));
        assert!(matches!(errors[1], Err(TranslationError::HtmlParse { .. })));

        assert!(!dir.path().join("es/a.html").exists());
        assert!(!dir.path().join("es/b.html").exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("es/c.html")).unwrap(),
            "<p>Hola</p>"
        );
    }

    #[test]
    fn test_missing_file_fails_before_any_job() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            file: Some(PathBuf::from("missing.html")),
            ..run_config(dir.path())
        };
        let err = plan_jobs(&config).unwrap_err();
        assert!(matches!(err, TranslationError::FileNotFound { .. }));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_non_dry_run_without_translator_fails_job() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "index.html", "<p>Hello</p>");
        let jobs = plan_jobs(&run_config(dir.path())).unwrap();

        let summary = run_jobs(&jobs, None, ExtractOptions::default()).await;
        assert_eq!(summary.succeeded(), 0);
        assert!(!dir.path().join("fr").exists());
    }

    #[tokio::test]
    async fn test_run_without_key_processes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "index.html", "<p>Hello</p>");
        let root = dir.path().to_str().unwrap();

        let cli = Cli::parse_from(["page-translate", "--quiet", "--root", root]);
        let err = run(&cli, None).await.unwrap_err();
        assert!(matches!(err, TranslationError::MissingCredential { .. }));
        assert!(err.is_fatal());

        // 凭据错误优先于缺失文件
        let cli = Cli::parse_from([
            "page-translate",
            "--quiet",
            "--root",
            root,
            "--file",
            "missing.html",
        ]);
        let err = run(&cli, Some("  ".into())).await.unwrap_err();
        assert!(matches!(err, TranslationError::MissingCredential { .. }));

        assert!(!dir.path().join("fr").exists());
        assert!(!dir.path().join("es").exists());
    }

    #[tokio::test]
    async fn test_run_dry_run_without_key() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "index.html", "<p>Hello</p>");
        let root = dir.path().to_str().unwrap();

        let cli = Cli::parse_from(["page-translate", "--quiet", "--dry-run", "--root", root]);
        assert_eq!(run(&cli, None).await.unwrap(), 0);
        assert_eq!(all_files(dir.path()), vec![dir.path().join("index.html")]);

        let cli = Cli::parse_from([
            "page-translate",
            "--quiet",
            "--dry-run",
            "--root",
            root,
            "--file",
            "missing.html",
        ]);
        let err = run(&cli, None).await.unwrap_err();
        assert!(matches!(err, TranslationError::FileNotFound { .. }));
    }
}
