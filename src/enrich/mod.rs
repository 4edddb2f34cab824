//! 補完処理の実行
//!
//! 走査 → 解決 → 書き戻し → 集計 の順に進む。
//! 取得は最大 `concurrency` 件まで並行に行うが、台帳への書き込みと保存、
//! エラーログへの追記はこのループだけが行う。
//! 行単位の失敗は集計に積んで次の行へ進み、台帳の読み込み・保存の失敗と
//! 化学式列が無い場合だけ実行全体を止める。

use crate::config::Config;
use crate::error::Result;
use crate::errorlog::{ErrorLogEntry, ErrorLogSink};
use crate::resolver::{FormulaResolver, PageFetcher};
use crate::scanner::{scan_workbook, SheetScan};
use crate::store::TabularStore;
use indicatif::ProgressBar;
use reagent_enrich_common::{ColumnAliases, EnrichmentTask, FailureKind, RunStatistics};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;

/// 実行の段階
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Scanning,
    Resolving,
    WritingBack,
    Reporting,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// 同時取得数
    pub concurrency: usize,
    /// 何件書き込むごとに保存するか（1なら1件ごと）
    pub persist_every: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            persist_every: 1,
        }
    }
}

impl From<&Config> for RunOptions {
    fn from(config: &Config) -> Self {
        Self {
            concurrency: config.concurrency.max(1),
            persist_every: config.persist_every.max(1),
        }
    }
}

/// 実行結果
#[derive(Debug, Clone)]
pub struct RunReport {
    pub statistics: RunStatistics,
    pub sheets: Vec<SheetScan>,
    /// 通過した段階（順序どおり）
    pub phases: Vec<RunPhase>,
    pub cancelled: bool,
}

pub struct Enricher<F> {
    resolver: Arc<FormulaResolver<F>>,
    aliases: ColumnAliases,
    options: RunOptions,
    progress: ProgressBar,
}

impl<F: PageFetcher> Enricher<F> {
    pub fn new(resolver: FormulaResolver<F>, aliases: ColumnAliases, options: RunOptions) -> Self {
        Self {
            resolver: Arc::new(resolver),
            aliases,
            options,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// キャンセルなしで最後まで実行
    pub async fn run_to_completion<S, L>(&self, store: &mut S, error_log: &mut L) -> Result<RunReport>
    where
        S: TabularStore + ?Sized,
        L: ErrorLogSink + ?Sized,
    {
        let (_keep, cancel) = watch::channel(false);
        self.run(store, error_log, &cancel).await
    }

    /// `cancel` が true になると新しい取得を始めず、処理中の行を書き戻して終了する
    pub async fn run<S, L>(
        &self,
        store: &mut S,
        error_log: &mut L,
        cancel: &watch::Receiver<bool>,
    ) -> Result<RunReport>
    where
        S: TabularStore + ?Sized,
        L: ErrorLogSink + ?Sized,
    {
        let mut phases = Vec::with_capacity(5);
        let mut enter = |phase: RunPhase| {
            tracing::info!(?phase, "段階移行");
            phases.push(phase);
        };

        enter(RunPhase::Scanning);
        let sheets = scan_workbook(&*store, &self.aliases)?;

        let mut statistics = RunStatistics::default();
        let mut pending: VecDeque<EnrichmentTask> = VecDeque::new();
        for scan in &sheets {
            let mut sheet_stats = RunStatistics {
                rows_scanned: scan.rows_scanned,
                rows_flagged: scan.empty_rows.len(),
                ..Default::default()
            };
            for (row, reason) in scan.missing_cas() {
                tracing::warn!(sheet = %scan.sheet, row, %reason, "CAS番号を読めないため補完できません");
                sheet_stats.record_failure(FailureKind::NotFound);
            }
            statistics.merge(&sheet_stats);
            pending.extend(scan.tasks());
        }
        let formula_cols: HashMap<&str, usize> = sheets
            .iter()
            .map(|s| (s.sheet.as_str(), s.formula_col))
            .collect();

        enter(RunPhase::Resolving);
        self.progress.set_length(pending.len() as u64);

        let mut in_flight = JoinSet::new();
        let mut writes_since_persist = 0usize;
        let mut cancelled = false;

        loop {
            while !cancelled && in_flight.len() < self.options.concurrency {
                if *cancel.borrow() {
                    tracing::warn!(remaining = pending.len(), "キャンセルされました");
                    cancelled = true;
                    break;
                }
                let Some(task) = pending.pop_front() else {
                    break;
                };
                let resolver = Arc::clone(&self.resolver);
                in_flight.spawn(async move {
                    let resolution = resolver.resolve(&task.cas).await;
                    (task, resolution)
                });
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };
            self.progress.inc(1);

            let (task, resolution) = match joined {
                Ok(done) => done,
                Err(e) => {
                    tracing::error!(error = %e, "取得タスクが異常終了");
                    statistics.record_failure(FailureKind::TaskAborted);
                    continue;
                }
            };

            match resolution {
                Ok(info) => {
                    let col = formula_cols[task.sheet.as_str()];
                    match store.set_cell(&task.sheet, task.row, col, &info.formula) {
                        Ok(()) => {
                            tracing::debug!(
                                sheet = %task.sheet,
                                row = task.row,
                                cas = %task.cas,
                                formula = %info.formula,
                                name = %info.chinese_name,
                                "化学式を書き込み"
                            );
                            statistics.record_success();
                            writes_since_persist += 1;
                            if writes_since_persist >= self.options.persist_every {
                                store.persist()?;
                                writes_since_persist = 0;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(sheet = %task.sheet, row = task.row, error = %e, "書き込み失敗");
                            statistics.record_failure(FailureKind::WriteError);
                        }
                    }
                }
                Err(failure) => {
                    tracing::warn!(sheet = %task.sheet, row = task.row, cas = %task.cas, %failure, "解決失敗");
                    statistics.record_failure(failure.kind());
                    if let Some((status, url)) = failure.http_status() {
                        if let Err(e) = error_log.append(&ErrorLogEntry::now(status, url)) {
                            tracing::warn!(error = %e, "エラーログへの書き込みに失敗");
                        }
                    }
                }
            }
        }

        if cancelled {
            statistics.rows_skipped += pending.len();
        }

        enter(RunPhase::WritingBack);
        if store.has_pending_writes() {
            store.persist()?;
        }
        self.progress.finish_and_clear();

        enter(RunPhase::Reporting);
        tracing::info!(
            scanned = statistics.rows_scanned,
            flagged = statistics.rows_flagged,
            enriched = statistics.rows_enriched,
            failed = statistics.rows_failed,
            skipped = statistics.rows_skipped,
            "補完完了"
        );

        enter(RunPhase::Done);
        Ok(RunReport {
            statistics,
            sheets,
            phases,
            cancelled,
        })
    }
}
