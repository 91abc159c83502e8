// ==========================================
// 取件账户分配系统 - 命令行入口
// ==========================================
// 用法:
//   pickup-planner [计划日 YYYY-MM-DD] [--today YYYY-MM-DD]
//                  [--blacklist 文件] [--seed 数字]
// 计划日缺省为明天, today 缺省为当天
// 任一服务器失败时以非零状态退出 (成功的服务器已落库)
// ==========================================

use anyhow::{bail, Context, Result};
use chrono::{Duration, Local, NaiveDate};
use pickup_planner::app::{get_default_artifact_dir, get_default_db_path, AppState};
use pickup_planner::config::RunOptions;
use pickup_planner::api::ServerRunSummary;
use std::process::ExitCode;

struct CliArgs {
    plan_date: Option<NaiveDate>,
    today: Option<NaiveDate>,
    blacklist_file: Option<String>,
    seed: Option<u64>,
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").with_context(|| format!("日期格式错误: {}", raw))
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<CliArgs> {
    let mut cli = CliArgs {
        plan_date: None,
        today: None,
        blacklist_file: None,
        seed: None,
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--today" => {
                let v = args.next().context("--today 缺少参数")?;
                cli.today = Some(parse_date(&v)?);
            }
            "--blacklist" => {
                cli.blacklist_file = Some(args.next().context("--blacklist 缺少参数")?);
            }
            "--seed" => {
                let v = args.next().context("--seed 缺少参数")?;
                cli.seed = Some(v.parse().with_context(|| format!("种子无效: {}", v))?);
            }
            other if other.starts_with("--") => bail!("未知参数: {}", other),
            other => {
                if cli.plan_date.is_some() {
                    bail!("重复的计划日参数: {}", other);
                }
                cli.plan_date = Some(parse_date(other)?);
            }
        }
    }
    Ok(cli)
}

async fn run() -> Result<bool> {
    let cli = parse_args(std::env::args().skip(1))?;

    let today = cli.today.unwrap_or_else(|| Local::now().date_naive());
    let plan_date = cli.plan_date.unwrap_or(today + Duration::days(1));

    let mut options = RunOptions::new(plan_date, today);
    if let Some(path) = &cli.blacklist_file {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("无法读取黑名单文件: {}", path))?;
        options = options.with_blacklist_text(&text);
    }
    if let Some(seed) = cli.seed {
        options = options.with_shuffle_seed(seed);
    }

    let state = AppState::new(get_default_db_path(), get_default_artifact_dir())
        .map_err(anyhow::Error::msg)?;

    let summary = state
        .plan_api
        .generate_plan(&options)
        .await
        .context("计划生成失败")?;

    for server in &summary.servers {
        match server {
            ServerRunSummary::Planned {
                server_id,
                server_name,
                committed,
                organizations,
                result_artifact,
                ..
            } => {
                let shortfall: usize = organizations.iter().map(|o| o.shortfall).sum();
                tracing::info!(
                    server_id,
                    server_name = %server_name,
                    committed,
                    shortfall,
                    result_artifact = %result_artifact,
                    "服务器完成"
                );
            }
            ServerRunSummary::Failed {
                server_id,
                server_name,
                reason,
                ..
            } => {
                tracing::error!(server_id, server_name = %server_name, reason = %reason, "服务器失败");
            }
        }
    }
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(summary.is_success())
}

#[tokio::main]
async fn main() -> ExitCode {
    pickup_planner::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", pickup_planner::APP_NAME, pickup_planner::VERSION);
    tracing::info!("==================================================");

    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
