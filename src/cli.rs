use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "reagent-enrich")]
#[command(about = "試薬台帳の空欄化学式をCAS番号から補完するツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 化学式が空の行を一覧表示（書き込みなし）
    Scan {
        /// 台帳ファイル（.xlsx）
        #[arg(required = true)]
        file: PathBuf,

        /// 空欄レポートの出力先
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// カスタムエイリアスファイル（JSON）
        #[arg(long)]
        alias: Option<PathBuf>,
    },

    /// 空欄の化学式を取得して台帳に書き戻す
    Enrich {
        /// 台帳ファイル（.xlsx）
        #[arg(required = true)]
        file: PathBuf,

        /// 同時取得数
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// 1件あたりのタイムアウト（秒）
        #[arg(short, long)]
        timeout: Option<u64>,

        /// 何件書き込むごとに保存するか
        #[arg(long)]
        persist_every: Option<usize>,

        /// エラーログの出力先
        #[arg(long)]
        error_log: Option<PathBuf>,

        /// 空欄レポートの出力先
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// カスタムエイリアスファイル（JSON）
        #[arg(long)]
        alias: Option<PathBuf>,

        /// 集計をJSONで出力
        #[arg(long)]
        json: bool,
    },

    /// CAS番号1件を照会して結果を表示
    Lookup {
        /// CAS番号
        #[arg(required = true)]
        cas: String,
    },

    /// 設定を表示/編集
    Config {
        /// 参照URLのテンプレートを設定（{cas} を含むこと）
        #[arg(long)]
        set_url_template: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}
