use std::path::PathBuf;
use std::time::Duration;

use crate::config::TargetLanguage;
use crate::error::TranslationError;

/// 单个任务的统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobStats {
    /// 文本片段数量
    pub segments: usize,
    /// 去重后提交翻译的文本数量
    pub unique_texts: usize,
    /// 提交翻译的字符数
    pub characters: usize,
    pub elapsed: Duration,
}

/// 单个任务的结果
#[derive(Debug)]
pub struct JobOutcome {
    pub source: PathBuf,
    pub output: PathBuf,
    pub language: TargetLanguage,
    pub result: Result<JobStats, TranslationError>,
}

impl JobOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// 一次运行的汇总
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<JobOutcome>,
    pub dry_run: bool,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &JobOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }

    /// 提交翻译的总字符数
    pub fn characters(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|s| s.characters)
            .sum()
    }

    /// 进程退出码: 全部成功为0，任一失败为1
    pub fn exit_code(&self) -> u8 {
        if self.failures().next().is_some() {
            1
        } else {
            0
        }
    }
}

/// 打印运行汇总
pub fn print_summary(summary: &RunSummary) {
    println!("\n{}", "=".repeat(50));
    println!("翻译完成: {}/{} 个文件", summary.succeeded(), summary.total());

    let failures: Vec<_> = summary.failures().collect();
    if !failures.is_empty() {
        println!("\n❌ 失败的任务:");
        for outcome in failures {
            if let Err(e) = &outcome.result {
                println!(
                    "   {} ({}): {}",
                    outcome.source.display(),
                    outcome.language,
                    e
                );
            }
        }
    }

    println!("\n🔤 字符数: {}", summary.characters());
    println!("⏱️  总耗时: {}", format_duration(summary.elapsed));
    if summary.dry_run {
        println!("(演练模式 - 未修改任何文件)");
    }
    println!("{}", "=".repeat(50));
}

/// 格式化持续时间
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.3}s", duration.as_secs_f64())
    }
}
